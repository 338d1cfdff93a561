//! Verifiable sparse Merkle map client interface.

use async_trait::async_trait;
use types::{Index, MapLeaf, MapLeafInclusion, MapRootMetadata, SignedMapRoot};

use crate::RpcError;

/// Revision argument meaning "the latest revision".
pub const LATEST_REVISION: i64 = -1;

/// Client for the verifiable map service. One client is bound to one map id.
/// The sequencer is the sole writer; reads may come from anywhere.
#[async_trait]
pub trait MapClient: Send + Sync {
    /// Latest signed map root.
    async fn get_signed_map_root(&self) -> Result<SignedMapRoot, RpcError>;

    /// Signed map root at an explicit revision. Used by the restart path to
    /// re-anchor revisions the log is missing.
    async fn get_signed_map_root_at(&self, revision: i64) -> Result<SignedMapRoot, RpcError>;

    /// Leaves for `indexes` at `revision` (or [`LATEST_REVISION`]), each with
    /// its inclusion proof under that revision's root. Absent leaves come
    /// back with an empty `leaf_value`.
    async fn get_leaves(
        &self,
        indexes: &[Index],
        revision: i64,
    ) -> Result<Vec<MapLeafInclusion>, RpcError>;

    /// Write one revision's leaf set and receive the new signed root.
    /// Not idempotent: the caller must attempt this at most once per epoch.
    async fn set_leaves(
        &self,
        leaves: Vec<MapLeaf>,
        metadata: MapRootMetadata,
    ) -> Result<SignedMapRoot, RpcError>;
}
