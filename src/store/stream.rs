//! Fixed-chunk scalar streams over vector byte ranges
//!
//! The engines never materialize a whole weight vector or pixel array:
//! every pass works in chunks of [`CHUNK_COMPONENTS`] scalars, so resident
//! memory stays constant regardless of image size.

use crate::core::{PixelSource, Result, StoreError};
use std::io::{Read, Seek, SeekFrom, Write};

/// Components per streaming chunk (32 KiB of f64s).
pub const CHUNK_COMPONENTS: usize = 4096;

/// Sequential reader of little-endian f64 components from an
/// already-positioned byte stream.
pub struct ComponentReader<R: Read> {
    reader: R,
    remaining: u64,
    scratch: Vec<u8>,
}

impl<R: Read> ComponentReader<R> {
    /// Wrap `reader`, which must be positioned at the first component of a
    /// span of `components` f64 values.
    pub fn new(reader: R, components: u64) -> Self {
        Self {
            reader,
            remaining: components,
            scratch: Vec::new(),
        }
    }

    /// Components not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read up to `out.len()` components. Returns the number produced;
    /// 0 means the span is exhausted.
    pub fn read_chunk(&mut self, out: &mut [f64]) -> Result<usize> {
        let take = (out.len() as u64).min(self.remaining) as usize;
        if take == 0 {
            return Ok(0);
        }
        self.scratch.resize(take * 8, 0);
        self.reader.read_exact(&mut self.scratch)?;
        for (slot, bytes) in out[..take].iter_mut().zip(self.scratch.chunks_exact(8)) {
            *slot = f64::from_le_bytes(bytes.try_into().expect("chunks_exact yields 8 bytes"));
        }
        self.remaining -= take as u64;
        Ok(take)
    }
}

/// Rewrite a span of `components` f64 values in place, one chunk at a time.
///
/// For each chunk the current values are read, handed to `update`, and the
/// mutated chunk is written back over the same bytes before moving on. Only
/// the span itself is ever touched.
pub fn rewrite_span<RW, F>(file: &mut RW, offset: u64, components: u64, mut update: F) -> Result<()>
where
    RW: Read + Write + Seek,
    F: FnMut(&mut [f64]) -> Result<()>,
{
    file.seek(SeekFrom::Start(offset))?;
    let mut chunk = [0.0f64; CHUNK_COMPONENTS];
    let mut bytes = vec![0u8; CHUNK_COMPONENTS * 8];
    let mut remaining = components;
    while remaining > 0 {
        let take = (CHUNK_COMPONENTS as u64).min(remaining) as usize;
        let byte_len = take * 8;
        file.read_exact(&mut bytes[..byte_len])?;
        for (slot, raw) in chunk[..take].iter_mut().zip(bytes[..byte_len].chunks_exact(8)) {
            *slot = f64::from_le_bytes(raw.try_into().expect("chunks_exact yields 8 bytes"));
        }

        update(&mut chunk[..take])?;

        for (raw, &value) in bytes[..byte_len].chunks_exact_mut(8).zip(chunk[..take].iter()) {
            raw.copy_from_slice(&value.to_le_bytes());
        }
        file.seek(SeekFrom::Current(-(byte_len as i64)))?;
        file.write_all(&bytes[..byte_len])?;
        remaining -= take as u64;
    }
    Ok(())
}

/// Fill `buf` completely from a pixel source, tolerating short reads.
/// A source that runs out early is malformed.
pub fn fill_pixels<S: PixelSource + ?Sized>(source: &mut S, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read_pixels(&mut buf[filled..])?;
        if n == 0 {
            return Err(StoreError::ParseError(format!(
                "pixel stream ended after {filled} bytes, expected {}",
                buf.len()
            )));
        }
        filled += n;
    }
    Ok(())
}
