//! Stochastic sub-gradient training over the on-disk vector store
//!
//! One training step draws one fresh sample per class and applies the
//! Pegasos update to every pairwise vector that class participates in. A
//! vector is never held in memory whole: both passes of an update stream
//! the vector and the sample's pixel bytes in lock-step, one fixed-size
//! chunk at a time.
//!
//! Sign convention: in pair `(i, j)` with `i < j`, class `i` plays the
//! positive role and class `j` the negative one. A sample of class `c`
//! therefore trains with `y = +1` against every `k > c` and `y = -1`
//! against every `k < c`.

use crate::core::{NormPolicy, PixelSource, Result, SamplePicker, StoreError, TrainConfig};
use crate::store::layout::StoreHeader;
use crate::store::stream::{fill_pixels, rewrite_span, ComponentReader, CHUNK_COMPONENTS};
use crate::store::VectorStore;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};

/// Training engine: one store, one sample picker, one config.
///
/// The store file is opened read-write once per [`run`](Trainer::run) and
/// closed when the run completes or on the first fatal error. No locking is
/// performed; exclusive single-process access is assumed.
pub struct Trainer<'a, P: SamplePicker> {
    store: &'a VectorStore,
    picker: P,
    config: TrainConfig,
}

impl<'a, P: SamplePicker> Trainer<'a, P> {
    pub fn new(store: &'a VectorStore, picker: P) -> Self {
        Self::with_config(store, picker, TrainConfig::default())
    }

    pub fn with_config(store: &'a VectorStore, picker: P, config: TrainConfig) -> Self {
        Self {
            store,
            picker,
            config,
        }
    }

    /// Run the configured number of training steps.
    pub fn run(&mut self) -> Result<()> {
        let n = self.store.num_classes();
        if self.picker.num_classes() != n {
            return Err(StoreError::InvalidParameter(format!(
                "sample picker serves {} classes, store has {n}",
                self.picker.num_classes()
            )));
        }

        info!(
            "training {} steps over {} classes ({} pairwise vectors)",
            self.config.steps,
            n,
            crate::store::layout::pair_count(n as u64)?
        );

        let mut file = self.store.open_rw()?;
        for t in 0..self.config.steps {
            self.step(&mut file, t)?;
        }
        info!("training finished after {} steps", self.config.steps);
        Ok(())
    }

    /// One step: for every class, draw a sample and update all of that
    /// class's pairs with it.
    fn step(&mut self, file: &mut File, t: usize) -> Result<()> {
        let n = self.store.num_classes();
        let eta = self.config.learning_rate.eta(t);
        debug!("step {t}: eta = {eta}");

        for c in 0..n {
            let mut sample = self.picker.pick(c)?;
            let shape = self.store.shape();
            if !sample.shape().compatible_with(&shape) {
                return Err(StoreError::ShapeMismatch {
                    expected: shape.to_string(),
                    actual: sample.shape().to_string(),
                });
            }

            let divisor = norm_divisor(&mut sample, self.config.norm)?;
            if divisor == 0.0 {
                // Photometrically blank sample: documented no-op.
                debug!("step {t}: class {c} drew a blank sample, skipping");
                continue;
            }

            for k in 0..n {
                if k == c {
                    continue;
                }
                let (i, j) = (c.min(k), c.max(k));
                let y = if c < k { 1.0 } else { -1.0 };
                update_vector(
                    file,
                    self.store.header(),
                    i,
                    j,
                    y,
                    &mut sample,
                    divisor,
                    eta,
                    self.config.lambda,
                )?;
            }
        }
        Ok(())
    }
}

/// Normalization divisor for one sample under the configured policy.
pub fn norm_divisor<S: PixelSource>(sample: &mut S, policy: NormPolicy) -> Result<f64> {
    match policy {
        NormPolicy::Euclidean => Ok(sample.sum_of_squares()?.sqrt()),
        NormPolicy::ByteSum => sample.byte_sum(),
    }
}

/// Apply one Pegasos update of vector `(i, j)` with a single sample.
///
/// Two streaming passes over the same byte ranges: the first accumulates
/// `dot = sum(v_k * b_k / divisor)`, the second overwrites the vector in
/// place with either the hinge step (`margin < 1`) or the pure decay step.
/// A zero divisor leaves the vector untouched.
#[allow(clippy::too_many_arguments)]
pub fn update_vector<S: PixelSource>(
    file: &mut File,
    header: &StoreHeader,
    i: usize,
    j: usize,
    y: f64,
    sample: &mut S,
    divisor: f64,
    eta: f64,
    lambda: f64,
) -> Result<()> {
    if divisor == 0.0 {
        return Ok(());
    }
    let offset = header.offset_of(i, j)?;
    let components = header.vector_len()?;

    let dot = dot_with_vector(file, offset, components, sample, divisor)?;
    let margin = y * dot;

    sample.rewind()?;
    let mut pixels = [0u8; CHUNK_COMPONENTS];
    if margin < 1.0 {
        rewrite_span(file, offset, components, |chunk| {
            fill_pixels(sample, &mut pixels[..chunk.len()])?;
            for (v, &b) in chunk.iter_mut().zip(pixels.iter()) {
                *v -= eta * (lambda * *v - y * f64::from(b) / divisor);
            }
            Ok(())
        })
    } else {
        rewrite_span(file, offset, components, |chunk| {
            for v in chunk.iter_mut() {
                *v -= eta * lambda * *v;
            }
            Ok(())
        })
    }
}

/// Streaming dot product of a stored vector against a sample's normalized
/// pixel bytes.
fn dot_with_vector<S: PixelSource>(
    file: &mut File,
    offset: u64,
    components: u64,
    sample: &mut S,
    divisor: f64,
) -> Result<f64> {
    file.seek(SeekFrom::Start(offset))?;
    let mut reader = ComponentReader::new(BufReader::new(&mut *file), components);
    sample.rewind()?;

    let mut weights = [0.0f64; CHUNK_COMPONENTS];
    let mut pixels = [0u8; CHUNK_COMPONENTS];
    let mut dot = 0.0;
    loop {
        let n = reader.read_chunk(&mut weights)?;
        if n == 0 {
            break;
        }
        fill_pixels(sample, &mut pixels[..n])?;
        for (v, &b) in weights[..n].iter().zip(pixels[..n].iter()) {
            dot += v * (f64::from(b) / divisor);
        }
    }
    Ok(dot)
}
