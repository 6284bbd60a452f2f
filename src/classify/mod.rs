//! Voting-based classification over the vector store
//!
//! One sequential pass over the whole vector array: every pair `(i, j)` is
//! scored exactly once, in the canonical enumeration order, against the
//! same query pixel stream. A positive dot votes for the pair's positive
//! member `i`; anything else, zero included, votes for `j`. Ties for the
//! winning vote count are reported together, never broken arbitrarily.
//!
//! A query whose normalization divisor is zero scores `dot = 0` for every
//! pair, so it deterministically votes unanimously for the highest-indexed
//! class. That is a property of the voting rule, kept as-is.

use crate::core::{NormPolicy, PixelSource, Result, StoreError, Verdict};
use crate::store::stream::{fill_pixels, ComponentReader, CHUNK_COMPONENTS};
use crate::store::VectorStore;
use crate::train::norm_divisor;
use log::{debug, info};

/// Classify one query sample against a store, read-only.
pub fn classify<S: PixelSource>(
    store: &VectorStore,
    query: &mut S,
    norm: NormPolicy,
) -> Result<Verdict> {
    let shape = store.shape();
    if !query.shape().compatible_with(&shape) {
        return Err(StoreError::ShapeMismatch {
            expected: shape.to_string(),
            actual: query.shape().to_string(),
        });
    }

    let n = store.num_classes();
    let components = store.header().vector_len()?;
    let divisor = norm_divisor(query, norm)?;
    debug!("classifying against {n} classes, divisor = {divisor}");

    let mut votes = vec![0u32; n];
    if divisor == 0.0 {
        // Every dot is forced to exactly 0: the negative member of each
        // pair takes the vote, no file traffic needed.
        for i in 0..n {
            for j in (i + 1)..n {
                votes[j] += 1;
            }
        }
        return Ok(Verdict::from_votes(votes));
    }

    let mut reader = store.open_vectors_reader()?;
    let mut weights = [0.0f64; CHUNK_COMPONENTS];
    let mut pixels = [0u8; CHUNK_COMPONENTS];
    for i in 0..n {
        for j in (i + 1)..n {
            let mut span = ComponentReader::new(&mut reader, components);
            query.rewind()?;
            let mut dot = 0.0;
            loop {
                let got = span.read_chunk(&mut weights)?;
                if got == 0 {
                    break;
                }
                fill_pixels(query, &mut pixels[..got])?;
                for (v, &b) in weights[..got].iter().zip(pixels[..got].iter()) {
                    dot += v * (f64::from(b) / divisor);
                }
            }
            if dot > 0.0 {
                votes[i] += 1;
            } else {
                votes[j] += 1;
            }
        }
    }

    let verdict = Verdict::from_votes(votes);
    info!(
        "winners {:?} with {}/{} votes ({:.1}%)",
        verdict.winners,
        verdict.max_votes,
        n - 1,
        verdict.confidence()
    );
    Ok(verdict)
}
