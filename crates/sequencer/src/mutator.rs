//! Mutation validation: the fold step that turns a prior entry plus a signed
//! update into the next entry, or rejects the update.

use std::collections::BTreeSet;

use thiserror::Error;
use types::{digest::key_id, Entry, EntryError, SignedKv};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("entry does not decode: {0}")]
    Malformed(#[from] EntryError),
    #[error("update carries no signatures")]
    Unsigned,
    #[error("previous-entry hash does not match the current leaf")]
    PreviousMismatch,
    #[error("no signature from a key authorized by the previous entry")]
    Unauthorized,
    #[error("no signature from a key authorized by the new entry")]
    UnauthorizedNewEntry,
}

/// Pure validation function applied per mutation. A rejected mutation is
/// skipped; it never aborts the batch.
pub trait Mutator: Send + Sync {
    fn mutate(&self, prior: Option<&Entry>, update: &SignedKv) -> Result<Entry, MutationError>;
}

/// Structural entry mutator: checks the per-index hash chain and that the
/// signature set names keys from both the previous and the new authorized
/// sets. Cryptographic signature verification lives with the out-of-process
/// verifier; by the time a mutation is queued its signatures were checked.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntryMutator;

impl Mutator for EntryMutator {
    fn mutate(&self, prior: Option<&Entry>, update: &SignedKv) -> Result<Entry, MutationError> {
        let next = Entry::from_canonical_bytes(&update.key_value.value)?;
        if update.signatures.is_empty() {
            return Err(MutationError::Unsigned);
        }

        // Hash chain: the update must name exactly the entry it replaces.
        match prior {
            Some(prior) => {
                if next.previous != prior.object_hash() {
                    return Err(MutationError::PreviousMismatch);
                }
            }
            None => {
                if !next.previous.is_empty() {
                    return Err(MutationError::PreviousMismatch);
                }
            }
        }

        let signer_ids: BTreeSet<&str> =
            update.signatures.keys().map(String::as_str).collect();

        // Ownership transfer: a previously authorized key must have signed.
        if let Some(prior) = prior {
            let authorized = prior
                .authorized_keys
                .iter()
                .any(|key| signer_ids.contains(key_id(key).as_str()));
            if !authorized {
                return Err(MutationError::Unauthorized);
            }
        }

        // Acceptance: a newly authorized key must have signed too.
        let accepted = next
            .authorized_keys
            .iter()
            .any(|key| signer_ids.contains(key_id(key).as_str()));
        if !accepted {
            return Err(MutationError::UnauthorizedNewEntry);
        }

        Ok(next)
    }
}
