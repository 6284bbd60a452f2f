//! The on-disk vector store and its lifecycle
//!
//! A store is created once (header, class table, zero-filled vectors) and
//! thereafter only its vector bytes are ever mutated. The header and class
//! table are immutable after creation; an interrupted training run can at
//! worst leave one vector partially updated, never an unparseable file.

pub mod layout;
pub mod stream;

use crate::core::{ImageShape, Result, StoreError};
use layout::StoreHeader;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Handle to a store file: the validated header plus the path the engines
/// open for the duration of one run.
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    header: StoreHeader,
}

impl VectorStore {
    /// Create (or overwrite) a store at `path` with all vectors zeroed.
    ///
    /// The order of `class_names` becomes each class's canonical index,
    /// permanently. Fails if fewer than 2 classes are supplied, the shape is
    /// invalid, or the implied file size overflows.
    pub fn create<P: AsRef<Path>>(
        path: P,
        shape: ImageShape,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let header = StoreHeader::new(shape, class_names)?;
        let file_len = header.file_len()?;
        let vector_bytes = file_len - header.vectors_base();

        let file = File::create(path).map_err(|e| StoreError::io_at(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&header.encode())
            .map_err(|e| StoreError::io_at(path, e))?;

        // Zero-fill the vector array in fixed-size chunks.
        let zeros = [0u8; 64 * 1024];
        let mut remaining = vector_bytes;
        while remaining > 0 {
            let take = (zeros.len() as u64).min(remaining) as usize;
            writer
                .write_all(&zeros[..take])
                .map_err(|e| StoreError::io_at(path, e))?;
            remaining -= take as u64;
        }
        writer.flush().map_err(|e| StoreError::io_at(path, e))?;

        debug!(
            "created store {} ({} classes, {} pairwise vectors, {} bytes)",
            path.display(),
            header.num_classes(),
            layout::pair_count(header.num_classes() as u64)?,
            file_len
        );
        Ok(Self {
            path: path.to_path_buf(),
            header,
        })
    }

    /// Open an existing store, validating magic, float width, shape, and
    /// that the file length matches what the header implies.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StoreError::io_at(path, e))?;
        let mut reader = BufReader::new(file);
        let header = StoreHeader::decode(&mut reader)?;

        let expected = header.file_len()?;
        let actual = reader
            .get_ref()
            .metadata()
            .map_err(|e| StoreError::io_at(path, e))?
            .len();
        if actual != expected {
            return Err(StoreError::TruncatedStore { expected, actual });
        }

        debug!(
            "opened store {} ({} classes, shape {})",
            path.display(),
            header.num_classes(),
            header.shape
        );
        Ok(Self {
            path: path.to_path_buf(),
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    pub fn shape(&self) -> ImageShape {
        self.header.shape
    }

    pub fn num_classes(&self) -> usize {
        self.header.num_classes()
    }

    pub fn class_names(&self) -> &[String] {
        &self.header.class_names
    }

    /// Open the file read-only, positioned at the first vector. Used by the
    /// classification pass, which streams the whole vector array once.
    pub fn open_vectors_reader(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|e| StoreError::io_at(&self.path, e))?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(self.header.vectors_base()))
            .map_err(|e| StoreError::io_at(&self.path, e))?;
        Ok(reader)
    }

    /// Open the file read-write for a training run. Exclusive single-process
    /// access is assumed; no locking is performed.
    pub fn open_rw(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| StoreError::io_at(&self.path, e))
    }
}
