//! gRPC-backed mutation source.

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};

use sequencer::{MutationSource, MutationTxn, SourceError};
use trees::pb;
use trees::pb::mutation_queue_client::MutationQueueClient;
use types::SignedKv;

/// Mutation source served by the directory storage layer. The storage side
/// scopes each pull as a read transaction and commits it inside the unary
/// reply, so the local commit step has nothing left to do.
#[derive(Clone)]
pub struct GrpcQueue {
    client: MutationQueueClient<Channel>,
    map_id: i64,
    page_size: i32,
}

impl GrpcQueue {
    pub async fn connect(
        addr: String,
        map_id: i64,
        page_size: i32,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(addr)?.connect().await?;
        Ok(Self { client: MutationQueueClient::new(channel), map_id, page_size })
    }
}

struct GrpcTxn {
    client: MutationQueueClient<Channel>,
    map_id: i64,
    page_size: i32,
}

#[async_trait]
impl MutationSource for GrpcQueue {
    async fn begin(&self) -> Result<Box<dyn MutationTxn>, SourceError> {
        Ok(Box::new(GrpcTxn {
            client: self.client.clone(),
            map_id: self.map_id,
            page_size: self.page_size,
        }))
    }
}

#[async_trait]
impl MutationTxn for GrpcTxn {
    async fn read_all(&mut self, start_seq: u64) -> Result<(u64, Vec<SignedKv>), SourceError> {
        let request = pb::PullMutationsRequest {
            map_id: self.map_id,
            start_seq,
            page_size: self.page_size,
        };
        let response = self
            .client
            .pull_mutations(request)
            .await
            .map_err(|status| SourceError::Read(status.to_string()))?
            .into_inner();
        let max_seq = response.max_seq.max(start_seq);
        Ok((max_seq, response.mutations.into_iter().map(SignedKv::from).collect()))
    }

    async fn commit(self: Box<Self>) -> Result<(), SourceError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SourceError> {
        Ok(())
    }
}
