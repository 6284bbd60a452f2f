//! Out-of-core one-vs-one linear SVM over a flat on-disk vector store
//!
//! Pairwise weight vectors too large to hold in memory live in a single
//! binary file and are updated in place, one streamed chunk at a time,
//! with the Pegasos sub-gradient rule. Classification streams the same
//! file once and tallies pairwise votes.

pub mod classify;
pub mod core;
pub mod data;
pub mod store;
pub mod train;

// Re-export main types for convenience
pub use crate::classify::classify;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, StoreError};
pub use crate::data::{BmpFile, ClassPopulation, DirectoryPicker, MemoryPixels};
pub use crate::store::VectorStore;
pub use crate::train::Trainer;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
