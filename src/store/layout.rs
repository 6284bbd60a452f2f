//! On-disk layout of the vector store
//!
//! The file is a fixed header, a class-name table, and a flat array of
//! `C(n,2)` pairwise weight vectors:
//!
//! ```text
//! magic[4] = "NSVM"
//! double_size: u8          width of the float type (portability guard)
//! width: u32               image width in pixels
//! height: i32              |height| = rows, sign = source row orientation
//! bits_per_pixel: u16      must be a multiple of 8
//! num_classes: u64         >= 2
//! num_classes x (name_len: u8, name[name_len])
//! C(num_classes, 2) x vector of num_pixels * bytes_per_pixel f64
//! ```
//!
//! All integers are little-endian. Vector `(i, j)` with `i < j` separates
//! "class i positive, class j negative" and lives at the pair's rank in the
//! row-major combination order. Offset arithmetic is checked `u64`
//! throughout: overflow is an error, never a wrapped offset.

use crate::core::{ImageShape, Result, StoreError};
use std::io::Read;

/// Magic token at the start of every store file.
pub const MAGIC: [u8; 4] = *b"NSVM";

/// Byte width of the weight component type recorded in the header.
pub const FLOAT_WIDTH: u8 = std::mem::size_of::<f64>() as u8;

/// Byte length of the fixed header, before the class table.
pub const FIXED_HEADER_LEN: u64 = 4 + 1 + 4 + 4 + 2 + 8;

/// Zero-based rank of pair `(i, j)` in the canonical enumeration
/// `(0,1), (0,2), .., (0,n-1), (1,2), .., (n-2,n-1)`.
///
/// Bijective onto `0..C(n,2)` for `0 <= i < j < n`; callers get an error
/// rather than a wrapped rank if the arithmetic would overflow.
pub fn pair_index(i: u64, j: u64, n: u64) -> Result<u64> {
    debug_assert!(i < j && j < n);
    let outer = i.checked_mul(n).ok_or(StoreError::OffsetOverflow)?;
    let skipped = triangular(i)?;
    outer
        .checked_sub(skipped)
        .and_then(|v| v.checked_add(j - i - 1))
        .ok_or(StoreError::OffsetOverflow)
}

/// Number of unordered pairs over `n` classes, `C(n, 2)`.
pub fn pair_count(n: u64) -> Result<u64> {
    if n < 2 {
        return Ok(0);
    }
    triangular(n - 1)
}

/// `i * (i + 1) / 2`, halving before multiplying so the intermediate does
/// not overflow earlier than the result.
fn triangular(i: u64) -> Result<u64> {
    let (half, other) = if i % 2 == 0 { (i / 2, i + 1) } else { ((i + 1) / 2, i) };
    half.checked_mul(other).ok_or(StoreError::OffsetOverflow)
}

/// Parsed store header plus class table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    pub shape: ImageShape,
    pub class_names: Vec<String>,
}

impl StoreHeader {
    /// Validate and assemble a header for a new store.
    pub fn new(shape: ImageShape, class_names: Vec<String>) -> Result<Self> {
        shape.validate()?;
        if class_names.len() < 2 {
            return Err(StoreError::TooFewClasses(class_names.len()));
        }
        for name in &class_names {
            if name.is_empty() || name.len() > u8::MAX as usize {
                return Err(StoreError::ClassNameTooLong(name.clone()));
            }
        }
        Ok(Self { shape, class_names })
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Byte length of header plus class table; the base offset of the
    /// vector array.
    pub fn vectors_base(&self) -> u64 {
        let table: u64 = self
            .class_names
            .iter()
            .map(|n| 1 + n.len() as u64)
            .sum();
        FIXED_HEADER_LEN + table
    }

    /// f64 components per vector.
    pub fn vector_len(&self) -> Result<u64> {
        self.shape.component_count()
    }

    /// Byte length of one vector.
    pub fn vector_size(&self) -> Result<u64> {
        self.vector_len()?
            .checked_mul(u64::from(FLOAT_WIDTH))
            .ok_or(StoreError::OffsetOverflow)
    }

    /// Byte offset of the first component of vector `(i, j)`.
    pub fn offset_of(&self, i: usize, j: usize) -> Result<u64> {
        let n = self.num_classes() as u64;
        let rank = pair_index(i as u64, j as u64, n)?;
        rank.checked_mul(self.vector_size()?)
            .and_then(|v| v.checked_add(self.vectors_base()))
            .ok_or(StoreError::OffsetOverflow)
    }

    /// Exact byte length a well-formed store file must have.
    pub fn file_len(&self) -> Result<u64> {
        let vectors = pair_count(self.num_classes() as u64)?
            .checked_mul(self.vector_size()?)
            .ok_or(StoreError::OffsetOverflow)?;
        self.vectors_base()
            .checked_add(vectors)
            .ok_or(StoreError::OffsetOverflow)
    }

    /// Serialize header and class table.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.vectors_base() as usize);
        out.extend_from_slice(&MAGIC);
        out.push(FLOAT_WIDTH);
        out.extend_from_slice(&self.shape.width.to_le_bytes());
        out.extend_from_slice(&self.shape.height.to_le_bytes());
        out.extend_from_slice(&self.shape.bits_per_pixel.to_le_bytes());
        out.extend_from_slice(&(self.class_names.len() as u64).to_le_bytes());
        for name in &self.class_names {
            out.push(name.len() as u8);
            out.extend_from_slice(name.as_bytes());
        }
        out
    }

    /// Read and validate a header from the start of a store file.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(StoreError::BadMagic {
                expected: MAGIC,
                actual: magic,
            });
        }

        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        if byte[0] != FLOAT_WIDTH {
            return Err(StoreError::FloatWidthMismatch {
                stored: byte[0],
                native: FLOAT_WIDTH,
            });
        }

        let mut u32_buf = [0u8; 4];
        reader.read_exact(&mut u32_buf)?;
        let width = u32::from_le_bytes(u32_buf);
        reader.read_exact(&mut u32_buf)?;
        let height = i32::from_le_bytes(u32_buf);
        let mut u16_buf = [0u8; 2];
        reader.read_exact(&mut u16_buf)?;
        let bits_per_pixel = u16::from_le_bytes(u16_buf);
        let mut u64_buf = [0u8; 8];
        reader.read_exact(&mut u64_buf)?;
        let num_classes = u64::from_le_bytes(u64_buf);

        let num_classes: usize = num_classes
            .try_into()
            .map_err(|_| StoreError::OffsetOverflow)?;
        if num_classes < 2 {
            return Err(StoreError::TooFewClasses(num_classes));
        }

        // The count is untrusted until the class table has been read, so no
        // preallocation: a hostile header must fail on the table bytes, not
        // in the allocator.
        let mut class_names = Vec::new();
        for _ in 0..num_classes {
            reader.read_exact(&mut byte)?;
            let mut name = vec![0u8; byte[0] as usize];
            reader.read_exact(&mut name)?;
            let name = String::from_utf8(name)
                .map_err(|e| StoreError::ParseError(format!("class name is not UTF-8: {e}")))?;
            class_names.push(name);
        }

        let shape = ImageShape::new(width, height, bits_per_pixel);
        shape.validate()?;
        Ok(Self { shape, class_names })
    }
}
