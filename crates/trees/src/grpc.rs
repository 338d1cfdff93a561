//! Map and log clients over the generated service stubs.

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};

use types::{Index, LogLeaf, MapLeaf, MapLeafInclusion, MapRootMetadata, SignedLogRoot, SignedMapRoot};

use crate::pb;
use crate::pb::verifiable_log_client::VerifiableLogClient;
use crate::pb::verifiable_map_client::VerifiableMapClient;
use crate::{LogClient, MapClient, RpcError};

#[derive(Clone)]
pub struct GrpcMapClient {
    inner: VerifiableMapClient<Channel>,
    map_id: i64,
}

impl GrpcMapClient {
    pub fn new(channel: Channel, map_id: i64) -> Self {
        Self { inner: VerifiableMapClient::new(channel), map_id }
    }

    pub async fn connect(addr: String, map_id: i64) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(addr)?.connect().await?;
        Ok(Self::new(channel, map_id))
    }
}

#[async_trait]
impl MapClient for GrpcMapClient {
    async fn get_signed_map_root(&self) -> Result<SignedMapRoot, RpcError> {
        let mut client = self.inner.clone();
        let response = client
            .get_signed_map_root(pb::GetMapRootRequest { map_id: self.map_id })
            .await?;
        Ok(response.into_inner().into())
    }

    async fn get_signed_map_root_at(&self, revision: i64) -> Result<SignedMapRoot, RpcError> {
        let mut client = self.inner.clone();
        let response = client
            .get_signed_map_root_by_revision(pb::GetMapRootByRevisionRequest {
                map_id: self.map_id,
                revision,
            })
            .await?;
        Ok(response.into_inner().into())
    }

    async fn get_leaves(
        &self,
        indexes: &[Index],
        revision: i64,
    ) -> Result<Vec<MapLeafInclusion>, RpcError> {
        let request = pb::GetMapLeavesRequest {
            map_id: self.map_id,
            indexes: indexes.iter().map(|idx| idx.as_bytes().to_vec()).collect(),
            revision,
        };
        let mut client = self.inner.clone();
        let response = client.get_leaves(request).await?;
        response
            .into_inner()
            .inclusions
            .into_iter()
            .map(MapLeafInclusion::try_from)
            .collect()
    }

    async fn set_leaves(
        &self,
        leaves: Vec<MapLeaf>,
        metadata: MapRootMetadata,
    ) -> Result<SignedMapRoot, RpcError> {
        let request = pb::SetMapLeavesRequest {
            map_id: self.map_id,
            leaves: leaves.iter().map(pb::MapLeaf::from).collect(),
            highest_fully_completed_seq: metadata.highest_fully_completed_seq,
        };
        let mut client = self.inner.clone();
        let response = client.set_leaves(request).await?;
        Ok(response.into_inner().into())
    }
}

#[derive(Clone)]
pub struct GrpcLogClient {
    inner: VerifiableLogClient<Channel>,
    log_id: i64,
}

impl GrpcLogClient {
    pub fn new(channel: Channel, log_id: i64) -> Self {
        Self { inner: VerifiableLogClient::new(channel), log_id }
    }

    pub async fn connect(addr: String, log_id: i64) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(addr)?.connect().await?;
        Ok(Self::new(channel, log_id))
    }
}

#[async_trait]
impl LogClient for GrpcLogClient {
    async fn get_latest_signed_log_root(&self) -> Result<SignedLogRoot, RpcError> {
        let mut client = self.inner.clone();
        let response = client
            .get_latest_signed_log_root(pb::GetLogRootRequest { log_id: self.log_id })
            .await?;
        Ok(response.into_inner().into())
    }

    async fn queue_leaf(&self, leaf: LogLeaf) -> Result<(), RpcError> {
        let request = pb::QueueLeafRequest {
            log_id: self.log_id,
            leaf_value: leaf.leaf_value,
            leaf_identity_hash: leaf.leaf_identity_hash.to_vec(),
        };
        let mut client = self.inner.clone();
        client.queue_leaf(request).await?;
        Ok(())
    }

    async fn get_consistency_proof(
        &self,
        first_tree_size: i64,
        second_tree_size: i64,
    ) -> Result<Vec<Vec<u8>>, RpcError> {
        let request = pb::GetConsistencyProofRequest {
            log_id: self.log_id,
            first_tree_size,
            second_tree_size,
        };
        let mut client = self.inner.clone();
        let response = client.get_consistency_proof(request).await?;
        Ok(response.into_inner().hashes)
    }

    async fn get_inclusion_proof(
        &self,
        leaf_index: i64,
        tree_size: i64,
    ) -> Result<Vec<Vec<u8>>, RpcError> {
        let request = pb::GetInclusionProofRequest { log_id: self.log_id, leaf_index, tree_size };
        let mut client = self.inner.clone();
        let response = client.get_inclusion_proof(request).await?;
        Ok(response.into_inner().hashes)
    }
}
