//! Collaborator seams for the training and classification engines

use crate::core::{ImageShape, Result};

/// Sequential access to one decoded image's channel bytes in canonical
/// order: top row first, left to right, channels interleaved, row padding
/// skipped. Implementations hide the source container's native row order.
pub trait PixelSource {
    /// Shape of the image, with the orientation sign of the source.
    fn shape(&self) -> ImageShape;

    /// Fill `buf` with the next canonical-order bytes. Returns the number of
    /// bytes produced; 0 means the sequence is exhausted. Short reads are
    /// allowed anywhere except that 0 is reserved for exhaustion.
    fn read_pixels(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Restart the cursor at the first canonical byte.
    fn rewind(&mut self) -> Result<()>;

    /// Sum of squared byte values over the whole canonical sequence.
    /// Leaves the cursor rewound.
    fn sum_of_squares(&mut self) -> Result<f64> {
        self.rewind()?;
        let mut buf = [0u8; 4096];
        let mut total = 0.0;
        loop {
            let n = self.read_pixels(&mut buf)?;
            if n == 0 {
                break;
            }
            for &b in &buf[..n] {
                let v = f64::from(b);
                total += v * v;
            }
        }
        self.rewind()?;
        Ok(total)
    }

    /// Plain sum of byte values over the whole canonical sequence.
    /// Leaves the cursor rewound.
    fn byte_sum(&mut self) -> Result<f64> {
        self.rewind()?;
        let mut buf = [0u8; 4096];
        let mut total = 0.0;
        loop {
            let n = self.read_pixels(&mut buf)?;
            if n == 0 {
                break;
            }
            for &b in &buf[..n] {
                total += f64::from(b);
            }
        }
        self.rewind()?;
        Ok(total)
    }
}

/// Supplies one training sample for a class, drawn uniformly from that
/// class's current population. The population is assumed stable for the
/// duration of one training step.
pub trait SamplePicker {
    type Source: PixelSource;

    /// Number of classes this picker serves.
    fn num_classes(&self) -> usize;

    /// Draw one sample of class `class` (0-based canonical index).
    fn pick(&mut self, class: usize) -> Result<Self::Source>;
}
