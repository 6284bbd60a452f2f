//! Core type definitions for the out-of-core pairwise classifier

use crate::core::{Result, StoreError};

/// Image shape shared by every sample in a store.
///
/// `height` is signed: its magnitude is the row count, its sign records the
/// source container's row-storage orientation at training time (negative =
/// top-down). The canonical pixel order exposed to the engines is always
/// top-row-first regardless of the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: u32,
    pub height: i32,
    pub bits_per_pixel: u16,
}

impl ImageShape {
    pub fn new(width: u32, height: i32, bits_per_pixel: u16) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
        }
    }

    /// Reject shapes the store format cannot represent.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StoreError::InvalidParameter(format!(
                "image dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.bits_per_pixel == 0 || self.bits_per_pixel % 8 != 0 {
            return Err(StoreError::UnalignedBitsPerPixel(self.bits_per_pixel));
        }
        Ok(())
    }

    /// Row count, ignoring the orientation sign.
    pub fn rows(&self) -> u32 {
        self.height.unsigned_abs()
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        u32::from(self.bits_per_pixel) / 8
    }

    /// Number of pixels in one image.
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.rows())
    }

    /// Number of weight components in one pairwise vector (one per channel
    /// byte). Checked: a shape whose component count overflows is rejected.
    pub fn component_count(&self) -> Result<u64> {
        self.num_pixels()
            .checked_mul(u64::from(self.bytes_per_pixel()))
            .ok_or(StoreError::OffsetOverflow)
    }

    /// True if two shapes describe the same pixel grid. Orientation signs may
    /// differ: a bottom-up and a top-down image of the same size are
    /// compatible once both are read in canonical order.
    pub fn compatible_with(&self, other: &ImageShape) -> bool {
        self.width == other.width
            && self.rows() == other.rows()
            && self.bits_per_pixel == other.bits_per_pixel
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{}bpp",
            self.width,
            self.rows(),
            self.bits_per_pixel
        )
    }
}

/// Learning-rate schedule for the sub-gradient step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningRate {
    /// `1 / sqrt(t + 1)` (canonical)
    InverseSqrt,
    /// `1 / (1 + t)`
    Inverse,
}

impl LearningRate {
    /// Step size for 0-based step index `t`.
    pub fn eta(&self, t: usize) -> f64 {
        match self {
            LearningRate::InverseSqrt => 1.0 / ((t + 1) as f64).sqrt(),
            LearningRate::Inverse => 1.0 / (1 + t) as f64,
        }
    }
}

/// Normalization divisor computed from a sample's raw channel bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormPolicy {
    /// Euclidean norm `sqrt(sum(byte^2))` (canonical)
    Euclidean,
    /// Plain sum of byte values
    ByteSum,
}

/// Configuration for the training engine.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Regularization constant lambda
    pub lambda: f64,
    /// Number of training steps; each step draws one sample per class
    pub steps: usize,
    /// Learning-rate schedule
    pub learning_rate: LearningRate,
    /// Normalization divisor policy
    pub norm: NormPolicy,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lambda: 1e-4,
            steps: 100,
            learning_rate: LearningRate::InverseSqrt,
            norm: NormPolicy::Euclidean,
        }
    }
}

/// Result of classifying one query against a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Votes won by each class, indexed by class id
    pub votes: Vec<u32>,
    /// Classes achieving the maximum vote count, ascending; ties are all
    /// reported, never broken arbitrarily
    pub winners: Vec<usize>,
    /// The maximum vote count itself
    pub max_votes: u32,
}

impl Verdict {
    /// Build a verdict from a completed vote tally.
    pub fn from_votes(votes: Vec<u32>) -> Self {
        let max_votes = votes.iter().copied().max().unwrap_or(0);
        let winners = votes
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == max_votes)
            .map(|(c, _)| c)
            .collect();
        Self {
            votes,
            winners,
            max_votes,
        }
    }

    /// Fraction of its `numClasses - 1` pairwise comparisons the winning
    /// class won, as a percentage.
    pub fn confidence(&self) -> f64 {
        let n = self.votes.len();
        if n < 2 {
            return 0.0;
        }
        f64::from(self.max_votes) / (n - 1) as f64 * 100.0
    }
}
