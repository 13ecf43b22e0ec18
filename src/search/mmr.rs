//! Maximal Marginal Relevance diversification (spec.md §4.7 step 5,
//! GLOSSARY). Greedily picks candidates that balance relevance against
//! redundancy with what's already been selected, until `limit` is
//! reached or candidates run out.

use crate::embedding::cosine_similarity;

pub struct MmrCandidate<'a> {
    pub id: u32,
    pub relevance: f64,
    pub embedding: &'a [f32],
}

/// `score = lambda * relevance - (1 - lambda) * max_cosine_to_selected`.
/// Ties in score are broken by ascending `id` (spec.md §4.7 determinism
/// note), so the result is a pure function of the input order.
pub fn diversify(candidates: &[MmrCandidate], lambda: f64, limit: usize) -> Vec<u32> {
    let mut remaining: Vec<&MmrCandidate> = candidates.iter().collect();
    let mut selected: Vec<&MmrCandidate> = Vec::new();

    while selected.len() < limit && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (idx, candidate) in remaining.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|s| cosine_similarity(candidate.embedding, s.embedding) as f64)
                .fold(0.0, f64::max);
            let score = lambda * candidate.relevance - (1.0 - lambda) * max_sim;
            if score > best_score || (score == best_score && candidate.id < remaining[best_idx].id) {
                best_score = score;
                best_idx = idx;
            }
        }
        selected.push(remaining.remove(best_idx));
    }

    selected.into_iter().map(|c| c.id).collect()
}
