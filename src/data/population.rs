//! Class population discovery and uniform sample selection
//!
//! A training tree is one directory per class under a common root; every
//! regular file inside a class directory is one sample. Subdirectory names
//! are sorted before the class order is established, so re-initializing a
//! store from the same tree always yields the same canonical indices.

use crate::core::{ImageShape, PixelSource, Result, SamplePicker, StoreError};
use crate::data::bmp::BmpFile;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// One class: its name (the directory name) and its sample files.
#[derive(Debug, Clone)]
pub struct ClassDir {
    pub name: String,
    pub samples: Vec<PathBuf>,
}

/// The full set of classes found under a root directory.
#[derive(Debug, Clone)]
pub struct ClassPopulation {
    classes: Vec<ClassDir>,
}

impl ClassPopulation {
    /// Scan `root`: every immediate subdirectory is a class, every regular
    /// file inside it a sample. Non-directories directly under the root are
    /// ignored. Fails on fewer than 2 classes or an empty class.
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut classes = Vec::new();

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
            .map_err(|e| StoreError::io_at(root, e))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| StoreError::io_at(root, e))?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let name = dir
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    StoreError::ParseError(format!(
                        "class directory name is not UTF-8: {}",
                        dir.display()
                    ))
                })?
                .to_string();

            let mut samples: Vec<PathBuf> = std::fs::read_dir(&dir)
                .map_err(|e| StoreError::io_at(&dir, e))?
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(|e| StoreError::io_at(&dir, e))?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            samples.sort();

            if samples.is_empty() {
                return Err(StoreError::EmptyClass(name));
            }
            classes.push(ClassDir { name, samples });
        }

        if classes.len() < 2 {
            return Err(StoreError::TooFewClasses(classes.len()));
        }
        Ok(Self { classes })
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class names in canonical index order.
    pub fn class_names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.name.clone()).collect()
    }

    pub fn classes(&self) -> &[ClassDir] {
        &self.classes
    }

    /// Establish the common image shape: the first sample of the first
    /// class sets it, and the first sample of every other class must agree.
    pub fn common_shape(&self) -> Result<ImageShape> {
        let mut established: Option<ImageShape> = None;
        for class in &self.classes {
            let shape = BmpFile::open(&class.samples[0])?.shape();
            match established {
                None => established = Some(shape),
                Some(first) if first.compatible_with(&shape) => {}
                Some(first) => {
                    return Err(StoreError::ShapeMismatch {
                        expected: first.to_string(),
                        actual: format!("{shape} (class {:?})", class.name),
                    });
                }
            }
        }
        // scan() guarantees at least two classes
        Ok(established.expect("population has classes"))
    }
}

/// Draws samples uniformly at random from a scanned population.
pub struct DirectoryPicker {
    population: ClassPopulation,
    rng: StdRng,
}

impl DirectoryPicker {
    pub fn new(population: ClassPopulation) -> Self {
        Self {
            population,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic picker for tests and reproducible runs.
    pub fn with_seed(population: ClassPopulation, seed: u64) -> Self {
        Self {
            population,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SamplePicker for DirectoryPicker {
    type Source = BmpFile;

    fn num_classes(&self) -> usize {
        self.population.num_classes()
    }

    fn pick(&mut self, class: usize) -> Result<BmpFile> {
        let samples = &self.population.classes[class].samples;
        let choice = self.rng.gen_range(0..samples.len());
        BmpFile::open(&samples[choice])
    }
}
