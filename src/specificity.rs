//! C9 — specificity engine (spec.md §4.8). Recomputes, for every card, how
//! different its embedding is from the global centroid and from its own
//! repos' centroids — a card near everyone's centroid is generic; a card
//! far from both is the one worth surfacing when its repo is in play.
//!
//! Pure over a `&[(card_id, embedding, repos)]` snapshot in, `Vec<(card_id,
//! score)>` out; the orchestrator is the one that decides *when* to call
//! this (full reindex, or >= 5% of embeddings changed) and persists the
//! result via `Store::update_specificity`.

use crate::embedding::cosine_similarity;
use std::collections::HashMap;

const GLOBAL_WEIGHT: f64 = 0.4;
const REPO_WEIGHT: f64 = 0.6;
/// `d_R` fallback for a card with no associated repo (spec.md §4.8).
const NO_REPO_DISTANCE: f64 = 0.5;

pub struct CardEmbedding {
    pub card_id: u32,
    pub vector: Vec<f32>,
    pub repos: Vec<String>,
}

/// Recomputes specificity for every card in `cards`. Returns `(card_id,
/// specificity)` pairs, `specificity` always in `[0, 1]` (spec.md §4.8
/// invariant, §8 P5).
pub fn recompute(cards: &[CardEmbedding]) -> Vec<(u32, f64)> {
    if cards.is_empty() {
        return Vec::new();
    }

    let global_centroid = centroid(cards.iter().map(|c| c.vector.as_slice()));
    let repo_centroids = per_repo_centroids(cards);

    let raw: Vec<(u32, f64, f64)> = cards
        .iter()
        .map(|card| {
            let d_global = 1.0 - cosine_similarity(&card.vector, &global_centroid) as f64;
            let d_repo = if card.repos.is_empty() {
                NO_REPO_DISTANCE
            } else {
                let sum: f64 = card
                    .repos
                    .iter()
                    .map(|r| {
                        let centroid = &repo_centroids[r];
                        1.0 - cosine_similarity(&card.vector, centroid) as f64
                    })
                    .sum();
                sum / card.repos.len() as f64
            };
            (card.card_id, d_global, d_repo)
        })
        .collect();

    let global_range = min_max(raw.iter().map(|(_, g, _)| *g));
    let repo_range = min_max(raw.iter().map(|(_, _, r)| *r));

    raw.into_iter()
        .map(|(id, d_global, d_repo)| {
            let n_global = normalize(d_global, global_range);
            let n_repo = normalize(d_repo, repo_range);
            let score = (GLOBAL_WEIGHT * n_global + REPO_WEIGHT * n_repo).clamp(0.0, 1.0);
            (id, score)
        })
        .collect()
}

fn centroid<'a>(vectors: impl Iterator<Item = &'a [f32]>) -> Vec<f32> {
    let mut sum: Vec<f32> = Vec::new();
    let mut count = 0usize;
    for v in vectors {
        if sum.is_empty() {
            sum = vec![0.0; v.len()];
        }
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        for s in sum.iter_mut() {
            *s /= count as f32;
        }
    }
    sum
}

fn per_repo_centroids(cards: &[CardEmbedding]) -> HashMap<String, Vec<f32>> {
    let mut by_repo: HashMap<String, Vec<&[f32]>> = HashMap::new();
    for card in cards {
        for repo in &card.repos {
            by_repo.entry(repo.clone()).or_default().push(&card.vector);
        }
    }
    by_repo.into_iter().map(|(repo, vectors)| (repo, centroid(vectors.into_iter()))).collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn normalize(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if (hi - lo).abs() < 1e-12 {
        0.0
    } else {
        (value - lo) / (hi - lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: u32, vector: Vec<f32>, repos: &[&str]) -> CardEmbedding {
        CardEmbedding { card_id: id, vector, repos: repos.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let cards = vec![
            card(1, vec![1.0, 0.0], &["clinic"]),
            card(2, vec![0.9, 0.1], &["clinic"]),
            card(3, vec![0.0, 1.0], &["clinic"]),
        ];
        for (_, score) in recompute(&cards) {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn scenario_orthogonal_card_scores_higher_than_identical_pair() {
        // Two identical embeddings at e1, one orthogonal: the orthogonal
        // card should score as more specific (spec.md §8 scenario 6).
        let cards = vec![
            card(1, vec![1.0, 0.0], &["clinic"]),
            card(2, vec![1.0, 0.0], &["clinic"]),
            card(3, vec![0.0, 1.0], &["clinic"]),
        ];
        let scores: HashMap<u32, f64> = recompute(&cards).into_iter().collect();
        assert!(scores[&3] > scores[&1]);
        assert!(scores[&3] > scores[&2]);
        assert!((scores[&1] - scores[&2]).abs() < 1e-9);
    }

    #[test]
    fn card_with_no_repo_uses_fallback_distance() {
        let cards = vec![card(1, vec![1.0, 0.0], &[]), card(2, vec![0.0, 1.0], &["clinic"])];
        // Should not panic and stays in range.
        for (_, score) in recompute(&cards) {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(recompute(&[]).is_empty());
    }
}
