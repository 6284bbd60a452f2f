//! Core types, errors, and collaborator traits

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, StoreError};
pub use traits::{PixelSource, SamplePicker};
pub use types::{ImageShape, LearningRate, NormPolicy, TrainConfig, Verdict};
