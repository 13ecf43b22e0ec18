//! Brute-force vector search over `card_embeddings`/`card_title_embeddings`
//! (spec.md §4.7 step 2a). No sqlite vector extension sits in the
//! corpus's dependency stack, so cosine distance is computed in Rust over
//! every stored vector — adequate at the card counts a single tenant's
//! store holds, and it keeps the fused-ranking code free of a second
//! index format to reason about.

use crate::embedding::cosine_similarity;

pub fn f32_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

/// One card's minimum distance across its content/title embeddings
/// (spec.md §4.7 step 2a: "taking the minimum distance per card").
pub fn min_distance(query: &[f32], vectors: &[&[f32]]) -> Option<f32> {
    vectors.iter().map(|v| 1.0 - cosine_similarity(query, v)).fold(None, |acc, d| Some(acc.map_or(d, |a: f32| a.min(d))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let v = vec![1.0_f32, -2.5, 0.0, 3.25];
        let bytes = f32_to_bytes(&v);
        assert_eq!(bytes_to_f32(&bytes), v);
    }

    #[test]
    fn min_distance_picks_the_closer_vector() {
        let query = vec![1.0_f32, 0.0];
        let close = vec![1.0_f32, 0.0];
        let far = vec![0.0_f32, 1.0];
        let d = min_distance(&query, &[&far, &close]).unwrap();
        assert!(d < 0.01);
    }
}
