//! Core directory types for the epoch sequencer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const INDEX_LEN: usize = 32;
pub const ED25519_KEY_LEN: usize = 32;

/// 32-byte VRF-derived map index. Keys shorter than 32 bytes are padded with
/// trailing zeros; longer keys are rejected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug, Default)]
pub struct Index(pub [u8; INDEX_LEN]);

impl Index {
    pub fn from_key(key: &[u8]) -> Result<Self, EntryError> {
        if key.len() > INDEX_LEN {
            return Err(EntryError::KeyTooLong(key.len()));
        }
        let mut out = [0u8; INDEX_LEN];
        out[..key.len()].copy_from_slice(key);
        Ok(Index(out))
    }

    pub fn as_bytes(&self) -> &[u8; INDEX_LEN] {
        &self.0
    }
}

/// A public key authorized to update one directory entry. Exactly one
/// variant per key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum PublicKey {
    /// 32-byte Ed25519 verifying key.
    Ed25519([u8; ED25519_KEY_LEN]),
    /// DER-encoded RSA-3072 key, signatures over SHA-256.
    Rsa3072Sha256(#[serde(with = "serde_bytes")] Vec<u8>),
    /// SEC1-encoded ECDSA P-256 point.
    EcdsaP256(#[serde(with = "serde_bytes")] Vec<u8>),
}

/// One leaf value of the verifiable map. `previous` is the object hash of
/// the prior entry at the same index (empty for the first entry), forming a
/// per-index hash chain.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct Entry {
    #[serde(with = "serde_bytes")]
    pub commitment: Vec<u8>,
    pub authorized_keys: Vec<PublicKey>,
    #[serde(with = "serde_bytes")]
    pub previous: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct KeyValue {
    #[serde(with = "serde_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct DigitallySigned {
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
}

/// A signed request to change the value bound to one key. Must carry a
/// signature from at least one key in the previous entry's authorized set
/// and one from the new entry's.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct SignedKv {
    pub key_value: KeyValue,
    /// Keyed by key id (see [`crate::digest::key_id`]).
    pub signatures: BTreeMap<String, DigitallySigned>,
}

impl SignedKv {
    pub fn index(&self) -> Result<Index, EntryError> {
        Index::from_key(&self.key_value.key)
    }
}

/// A map leaf as written to and read from the map server. An empty
/// `leaf_value` marks an absent leaf.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct MapLeaf {
    pub index: Index,
    #[serde(with = "serde_bytes")]
    pub leaf_value: Vec<u8>,
}

/// A map leaf together with its inclusion proof under a given root.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct MapLeafInclusion {
    pub leaf: MapLeaf,
    pub inclusion: Vec<Vec<u8>>,
}

/// Mapper metadata persisted inside each signed map root.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct MapRootMetadata {
    /// Largest mutation sequence number absorbed into this revision.
    /// Non-decreasing across revisions.
    pub highest_fully_completed_seq: i64,
}

/// Signed commitment to the map contents at one revision. Field order is
/// load-bearing: the canonical JSON encoding follows declaration order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct SignedMapRoot {
    pub map_revision: i64,
    #[serde(with = "serde_bytes")]
    pub root_hash: Vec<u8>,
    pub timestamp_nanos: i64,
    pub metadata: MapRootMetadata,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct SignedLogRoot {
    pub tree_size: i64,
    #[serde(with = "serde_bytes")]
    pub root_hash: Vec<u8>,
    pub timestamp_nanos: i64,
}

/// A leaf queued into the append-only log. The log deduplicates by
/// `leaf_identity_hash`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct LogLeaf {
    #[serde(with = "serde_bytes")]
    pub leaf_value: Vec<u8>,
    pub leaf_identity_hash: [u8; 32],
}

/// One processed mutation in an epoch summary: the signed update plus the
/// inclusion proof of the pre-mutation leaf at the prior revision.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Mutation {
    pub update: SignedKv,
    pub proof: MapLeafInclusion,
}

/// Per-epoch summary delivered to subscribers. `log_consistency` stays empty
/// in the sequencer's own summaries; consistency is a per-observer concern.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct EpochSummary {
    pub epoch: i64,
    pub smr: SignedMapRoot,
    pub log_root: SignedLogRoot,
    pub log_consistency: Vec<Vec<u8>>,
    pub log_inclusion: Vec<Vec<u8>>,
    pub mutations: Vec<Mutation>,
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum EntryError {
    #[error("unexpected end of entry encoding")]
    Eof,
    #[error("unsupported entry encoding version: {0}")]
    Version(u8),
    #[error("unknown public key tag: {0}")]
    KeyTag(u8),
    #[error("trailing bytes after entry")]
    Trailing,
    #[error("mutation key is {0} bytes, longer than a map index")]
    KeyTooLong(usize),
}
