//! A deterministic, model-free `Embedder` for tests: hashes the input
//! text into a fixed-dimension vector so tests never download a model
//! and stay reproducible run to run.

use super::{l2_normalize, EmbedMode, Embedder, EMBEDDING_DIM};
use crate::error::EmbeddingResult;

pub struct NullEmbedder {
    dimension: usize,
}

impl NullEmbedder {
    pub fn new() -> Self {
        Self { dimension: EMBEDDING_DIM }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NullEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for NullEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str, mode: EmbedMode) -> EmbeddingResult<Vec<f32>> {
        let seed = match mode {
            EmbedMode::Query => format!("q:{text}"),
            EmbedMode::Document => format!("d:{text}"),
        };
        let mut vector = vec![0.0_f32; self.dimension];
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in seed.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
            let idx = (hash as usize) % self.dimension;
            vector[idx] += ((hash >> 8) as i64 % 1000) as f32 / 1000.0;
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_idempotent_for_identical_input() {
        let embedder = NullEmbedder::new();
        let a = embedder.embed("hello world", EmbedMode::Document).unwrap();
        let b = embedder.embed("hello world", EmbedMode::Document).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_query_and_document_mode() {
        let embedder = NullEmbedder::new();
        let q = embedder.embed("hello", EmbedMode::Query).unwrap();
        let d = embedder.embed("hello", EmbedMode::Document).unwrap();
        assert_ne!(q, d);
    }

    #[test]
    fn respects_configured_dimension() {
        let embedder = NullEmbedder::with_dimension(16);
        let v = embedder.embed("x", EmbedMode::Document).unwrap();
        assert_eq!(v.len(), 16);
    }
}
