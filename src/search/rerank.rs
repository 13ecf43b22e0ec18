//! Optional cross-encoder rerank (spec.md §4.7 step 6). Scores each of
//! the top candidates jointly with the query instead of independently,
//! then blends that score back into the fused one so a strong
//! cross-encoder opinion can reorder close calls without discarding the
//! retrieval signal entirely.

use crate::error::GenerationResult;

/// Cap on how many candidates get cross-encoder scored; reranking the
/// full candidate set would cost one model call per candidate.
pub const MAX_RERANK_CANDIDATES: usize = 30;

/// A joint query/document scorer, higher is more relevant. Mirrors
/// `cards::generator::TextGenerator`'s shape: an injectable trait so
/// tests can supply a deterministic fake instead of a real model.
pub trait CrossEncoder: Send + Sync {
    fn score(&self, query: &str, document: &str) -> GenerationResult<f64>;
}

pub struct RerankCandidate {
    pub card_id: u32,
    pub fused_score: f64,
    pub document: String,
}

/// Reranks `candidates` (already truncated to `MAX_RERANK_CANDIDATES`
/// by the caller) against `query`. A candidate whose cross-encoder call
/// fails keeps its fused score unchanged rather than being dropped —
/// rerank is a quality pass, not a filter.
pub fn rerank(encoder: &dyn CrossEncoder, query: &str, candidates: &[RerankCandidate], blend: f64) -> Vec<(u32, f64)> {
    let mut scored: Vec<(u32, f64)> = candidates
        .iter()
        .map(|c| {
            let final_score = match encoder.score(query, &c.document) {
                Ok(ce_score) => blend * ce_score + (1.0 - blend) * c.fused_score,
                Err(_) => c.fused_score,
            };
            (c.card_id, final_score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEncoder(f64);
    impl CrossEncoder for FixedEncoder {
        fn score(&self, _query: &str, _document: &str) -> GenerationResult<f64> {
            Ok(self.0)
        }
    }

    struct FailingEncoder;
    impl CrossEncoder for FailingEncoder {
        fn score(&self, _query: &str, _document: &str) -> GenerationResult<f64> {
            Err(crate::error::GenerationError::RequestFailed("boom".into()))
        }
    }

    #[test]
    fn blends_cross_encoder_score_with_fused_score() {
        let encoder = FixedEncoder(1.0);
        let candidates = vec![RerankCandidate { card_id: 1, fused_score: 0.0, document: "doc".into() }];
        let reranked = rerank(&encoder, "q", &candidates, 0.6);
        assert!((reranked[0].1 - 0.6).abs() < 1e-9);
    }

    #[test]
    fn failed_rerank_call_falls_back_to_fused_score() {
        let encoder = FailingEncoder;
        let candidates = vec![RerankCandidate { card_id: 1, fused_score: 0.42, document: "doc".into() }];
        let reranked = rerank(&encoder, "q", &candidates, 0.6);
        assert_eq!(reranked[0].1, 0.42);
    }

    #[test]
    fn result_is_sorted_descending() {
        let encoder = FixedEncoder(0.5);
        let candidates = vec![
            RerankCandidate { card_id: 1, fused_score: 0.1, document: "a".into() },
            RerankCandidate { card_id: 2, fused_score: 0.9, document: "b".into() },
        ];
        let reranked = rerank(&encoder, "q", &candidates, 0.0);
        assert_eq!(reranked[0].0, 2);
    }
}
