//! Semantic cache (spec.md §4.7 step 1): before running retrieval at
//! all, compares the query embedding against the last 50 metrics rows
//! that have one. A hit above the similarity threshold replays that
//! row's `response_cards` with no new retrieval, no fusion, and no
//! metrics write of its own (spec.md §8 P7).

use crate::storage::vectors::bytes_to_f32;

/// Cosine similarity at or above this counts as a cache hit.
pub const SEMANTIC_CACHE_THRESHOLD: f32 = 0.92;

pub struct CacheHit {
    pub response_cards: Vec<u32>,
}

/// `history` is newest-first, exactly as `Store::recent_metrics_with_embedding`
/// returns it, so the first match found is also the most recent.
pub fn lookup(query_embedding: &[f32], history: &[(Vec<u8>, Vec<u32>)]) -> Option<CacheHit> {
    for (blob, response_cards) in history {
        let past = bytes_to_f32(blob);
        if crate::embedding::cosine_similarity(query_embedding, &past) >= SEMANTIC_CACHE_THRESHOLD {
            return Some(CacheHit { response_cards: response_cards.clone() });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::vectors::f32_to_bytes;

    #[test]
    fn hits_on_near_identical_query() {
        let history = vec![(f32_to_bytes(&[1.0, 0.0]), vec![1, 2])];
        let hit = lookup(&[0.999, 0.001], &history).unwrap();
        assert_eq!(hit.response_cards, vec![1, 2]);
    }

    #[test]
    fn misses_below_threshold() {
        let history = vec![(f32_to_bytes(&[1.0, 0.0]), vec![1])];
        assert!(lookup(&[0.0, 1.0], &history).is_none());
    }

    #[test]
    fn empty_history_is_always_a_miss() {
        assert!(lookup(&[1.0, 0.0], &[]).is_none());
    }

    #[test]
    fn returns_the_most_recent_match_first() {
        let history = vec![
            (f32_to_bytes(&[1.0, 0.0]), vec![9]),
            (f32_to_bytes(&[1.0, 0.0]), vec![1]),
        ];
        assert_eq!(lookup(&[1.0, 0.0], &history).unwrap().response_cards, vec![9]);
    }
}
