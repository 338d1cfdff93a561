//! Epoch sequencer: drains the mutation queue into the verifiable map and
//! anchors every new map root into the append-only log.

pub mod dispatch;
pub mod metrics;
pub mod mutator;
pub mod queue;
pub mod signer;
pub mod ticker;

// Re-export the main surface for convenience
pub use dispatch::*;
pub use mutator::*;
pub use queue::*;
pub use signer::*;
pub use ticker::*;
