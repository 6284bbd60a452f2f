//! Sample sources: BMP decoding, class discovery, and in-memory pixels

pub mod bmp;
pub mod population;

pub use bmp::BmpFile;
pub use population::{ClassPopulation, DirectoryPicker};

use crate::core::{ImageShape, PixelSource, Result};

/// An in-memory pixel sequence already in canonical order. Used by tests
/// and anywhere a sample does not live in a container file.
#[derive(Debug, Clone)]
pub struct MemoryPixels {
    shape: ImageShape,
    bytes: Vec<u8>,
    pos: usize,
}

impl MemoryPixels {
    pub fn new(shape: ImageShape, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(
            bytes.len() as u64,
            shape.component_count().unwrap_or(u64::MAX),
            "byte count must match the shape"
        );
        Self {
            shape,
            bytes,
            pos: 0,
        }
    }
}

impl PixelSource for MemoryPixels {
    fn shape(&self) -> ImageShape {
        self.shape
    }

    fn read_pixels(&mut self, buf: &mut [u8]) -> Result<usize> {
        let take = buf.len().min(self.bytes.len() - self.pos);
        buf[..take].copy_from_slice(&self.bytes[self.pos..self.pos + take]);
        self.pos += take;
        Ok(take)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}
