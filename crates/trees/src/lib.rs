//! Clients for the external verifiable trees: the sparse Merkle map holding
//! directory entries and the append-only log anchoring its roots.

pub mod map;
pub mod log;
pub mod pb;
pub mod grpc;

// Re-export the client traits and error type for convenience
pub use map::*;
pub use log::*;

use thiserror::Error;

/// Failure modes of a map or log RPC. Everything here is transient from the
/// sequencer's point of view: the epoch aborts and the next tick retries.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<tonic::Status> for RpcError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Unavailable => RpcError::Unavailable(status.message().to_string()),
            tonic::Code::DeadlineExceeded | tonic::Code::Cancelled => RpcError::DeadlineExceeded,
            _ => RpcError::Rejected(status.to_string()),
        }
    }
}
