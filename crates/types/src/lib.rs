//! Directory types: entries, signed mutations, map and log roots, epoch summaries.

pub mod types;
pub mod encode;
pub mod digest;

// Re-export all public items from modules for convenience
pub use types::*;
pub use encode::*;
pub use digest::*;
