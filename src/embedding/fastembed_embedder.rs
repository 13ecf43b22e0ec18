//! `fastembed`-backed `Embedder`, wrapping `fastembed::TextEmbedding`
//! behind a mutex the same way the local-model adapters elsewhere in
//! this crate do.

use super::{l2_normalize, EmbedMode, Embedder, EMBEDDING_DIM};
use crate::error::{EmbeddingError, EmbeddingResult};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// `query`/`document` mode is expressed through fastembed's query-prefix
/// convention for `AllMiniLML6V2`: queries get an instruction prefix,
/// documents are embedded as-is.
const QUERY_PREFIX: &str = "query: ";

pub struct FastEmbedEmbedder {
    model: Mutex<TextEmbedding>,
    dimension: usize,
}

impl FastEmbedEmbedder {
    pub fn new() -> EmbeddingResult<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2)
    }

    pub fn with_model(model: EmbeddingModel) -> EmbeddingResult<Self> {
        let mut text_model = TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::Embed(e.to_string()))?;
        let dimension = probe.into_iter().next().map(|v| v.len()).unwrap_or(EMBEDDING_DIM);

        Ok(Self { model: Mutex::new(text_model), dimension })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str, mode: EmbedMode) -> EmbeddingResult<Vec<f32>> {
        let input = match mode {
            EmbedMode::Query => format!("{QUERY_PREFIX}{text}"),
            EmbedMode::Document => text.to_string(),
        };
        let mut embeddings = self
            .model
            .lock()
            .unwrap()
            .embed(vec![input], None)
            .map_err(|e| EmbeddingError::Embed(e.to_string()))?;
        let mut vector = embeddings.pop().ok_or_else(|| EmbeddingError::Embed("empty embedding result".to_string()))?;
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch { expected: self.dimension, actual: vector.len() });
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }
}
