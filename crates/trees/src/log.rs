//! Append-only verifiable log client interface.

use async_trait::async_trait;
use types::{LogLeaf, SignedLogRoot};

use crate::RpcError;

/// Client for the append-only log holding canonical map roots. One client is
/// bound to one log id.
#[async_trait]
pub trait LogClient: Send + Sync {
    async fn get_latest_signed_log_root(&self) -> Result<SignedLogRoot, RpcError>;

    /// Append a leaf. The log deduplicates by `leaf_identity_hash`, so
    /// re-queueing the same leaf after a crash is safe.
    async fn queue_leaf(&self, leaf: LogLeaf) -> Result<(), RpcError>;

    async fn get_consistency_proof(
        &self,
        first_tree_size: i64,
        second_tree_size: i64,
    ) -> Result<Vec<Vec<u8>>, RpcError>;

    async fn get_inclusion_proof(
        &self,
        leaf_index: i64,
        tree_size: i64,
    ) -> Result<Vec<Vec<u8>>, RpcError>;
}
