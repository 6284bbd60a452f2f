//! BMP-backed pixel stream adapter
//!
//! Decodes just the container fields the engines need (data offset, width,
//! signed height, bits per pixel) and serves the pixel bytes in canonical
//! order: top row first, left to right, channels interleaved, with the
//! 4-byte row padding skipped. BMP files store rows bottom-up when the
//! header height is positive and top-down when it is negative; the adapter
//! hides that behind [`PixelSource`].
//!
//! Compressed files and channel widths that are not a whole number of
//! bytes are rejected.

use crate::core::{ImageShape, PixelSource, Result, StoreError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Byte length of the BITMAPFILEHEADER.
const FILE_HEADER_LEN: u64 = 14;
/// Minimum DIB header we accept (BITMAPINFOHEADER).
const MIN_DIB_HEADER_LEN: u32 = 40;

/// One opened BMP file, readable as a canonical-order pixel stream.
pub struct BmpFile {
    file: File,
    shape: ImageShape,
    data_offset: u64,
    stride: u64,
    row_payload: usize,
    next_row: u32,
    row_buf: Vec<u8>,
    row_pos: usize,
}

impl BmpFile {
    /// Open and validate a BMP file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| StoreError::io_at(path, e))?;

        let mut file_header = [0u8; FILE_HEADER_LEN as usize];
        file.read_exact(&mut file_header)
            .map_err(|e| StoreError::io_at(path, e))?;
        if &file_header[0..2] != b"BM" {
            return Err(StoreError::ParseError(format!(
                "{} is not a BMP file",
                path.display()
            )));
        }
        let data_offset = u64::from(u32::from_le_bytes(file_header[10..14].try_into().expect("fixed-width field")));

        let mut dib = [0u8; 20];
        file.read_exact(&mut dib)
            .map_err(|e| StoreError::io_at(path, e))?;
        let dib_len = u32::from_le_bytes(dib[0..4].try_into().expect("fixed-width field"));
        if dib_len < MIN_DIB_HEADER_LEN {
            return Err(StoreError::ParseError(format!(
                "unsupported BMP header ({dib_len} bytes) in {}",
                path.display()
            )));
        }
        let width = i32::from_le_bytes(dib[4..8].try_into().expect("fixed-width field"));
        let height = i32::from_le_bytes(dib[8..12].try_into().expect("fixed-width field"));
        let bits_per_pixel = u16::from_le_bytes(dib[14..16].try_into().expect("fixed-width field"));
        let compression = u32::from_le_bytes(dib[16..20].try_into().expect("fixed-width field"));

        if compression != 0 {
            return Err(StoreError::ParseError(format!(
                "compressed BMP (method {compression}) is not supported: {}",
                path.display()
            )));
        }
        if width <= 0 {
            return Err(StoreError::ParseError(format!(
                "non-positive BMP width {width} in {}",
                path.display()
            )));
        }

        let shape = ImageShape::new(width as u32, height, bits_per_pixel);
        shape.validate()?;

        let row_payload = u64::from(shape.width) * u64::from(shape.bytes_per_pixel());
        let row_payload: usize = row_payload
            .try_into()
            .map_err(|_| StoreError::OffsetOverflow)?;
        // Rows are padded to 4-byte boundaries on disk.
        let stride = ((row_payload as u64) + 3) & !3;

        let expected = stride
            .checked_mul(u64::from(shape.rows()))
            .and_then(|v| v.checked_add(data_offset))
            .ok_or(StoreError::OffsetOverflow)?;
        let actual = file
            .metadata()
            .map_err(|e| StoreError::io_at(path, e))?
            .len();
        if actual < expected {
            return Err(StoreError::ParseError(format!(
                "BMP pixel data truncated in {}: {actual} bytes, need {expected}",
                path.display()
            )));
        }

        Ok(Self {
            file,
            shape,
            data_offset,
            stride,
            row_payload,
            next_row: 0,
            row_buf: Vec::new(),
            row_pos: 0,
        })
    }

    /// Disk offset of the canonical row `row` (0 = top), honoring the
    /// container's storage orientation.
    fn row_offset(&self, row: u32) -> u64 {
        let stored_row = if self.shape.height > 0 {
            // Bottom-up storage: the top row is the last one on disk.
            self.shape.rows() - 1 - row
        } else {
            row
        };
        self.data_offset + u64::from(stored_row) * self.stride
    }

    fn load_next_row(&mut self) -> Result<()> {
        let offset = self.row_offset(self.next_row);
        self.file.seek(SeekFrom::Start(offset))?;
        self.row_buf.resize(self.row_payload, 0);
        self.file.read_exact(&mut self.row_buf)?;
        self.row_pos = 0;
        self.next_row += 1;
        Ok(())
    }
}

impl PixelSource for BmpFile {
    fn shape(&self) -> ImageShape {
        self.shape
    }

    fn read_pixels(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.row_pos == self.row_buf.len() {
            if self.next_row == self.shape.rows() {
                return Ok(0);
            }
            self.load_next_row()?;
        }
        let take = buf.len().min(self.row_buf.len() - self.row_pos);
        buf[..take].copy_from_slice(&self.row_buf[self.row_pos..self.row_pos + take]);
        self.row_pos += take;
        Ok(take)
    }

    fn rewind(&mut self) -> Result<()> {
        self.next_row = 0;
        self.row_buf.clear();
        self.row_pos = 0;
        Ok(())
    }
}
