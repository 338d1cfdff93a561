//! Transactional intake from the pending-mutation queue.

use async_trait::async_trait;
use thiserror::Error;
use types::SignedKv;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("mutation source unavailable: {0}")]
    Unavailable(String),
    #[error("mutation read failed: {0}")]
    Read(String),
    #[error("mutation read commit failed: {0}")]
    Commit(String),
}

/// Source of pending mutations. Reads are transactional: the mutations stay
/// claimable until the transaction commits, and a commit of a pure read is
/// what releases the epoch to proceed.
#[async_trait]
pub trait MutationSource: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn MutationTxn>, SourceError>;
}

#[async_trait]
pub trait MutationTxn: Send {
    /// Read every mutation with sequence number greater than `start_seq`,
    /// bounded by the source's own page limit, in ascending sequence order.
    /// Returns the highest sequence read; equals `start_seq` when nothing
    /// was pending.
    async fn read_all(&mut self, start_seq: u64) -> Result<(u64, Vec<SignedKv>), SourceError>;

    async fn commit(self: Box<Self>) -> Result<(), SourceError>;

    async fn rollback(self: Box<Self>) -> Result<(), SourceError>;
}
