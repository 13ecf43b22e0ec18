//! Score fusion (spec.md §4.7 step 3): blends the keyword (BM25) and
//! semantic (cosine) retrieval lists into one ranked candidate set,
//! rewarding cards that both signals agreed on.

use crate::config::SearchConfig;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HitSource {
    Keyword,
    Semantic,
    Both,
}

#[derive(Debug, Clone)]
pub struct FusedHit {
    pub card_id: u32,
    pub score: f64,
    pub source: HitSource,
}

/// `keyword` is `(card_id, bm25_rank)` ascending (lower is better);
/// `semantic` is `(card_id, cosine_distance)` ascending (lower is
/// closer). Both are converted to a `[0, 1]` "higher is better" scale
/// before fusing, so a card scores `semantic_weight * sim +
/// keyword_weight * bm25_norm`, then `dual_hit_boost`'d if it appeared
/// in both lists. Returned sorted descending by score, ties broken by
/// ascending `card_id` for determinism.
pub fn fuse(keyword: &[(u32, f64)], semantic: &[(u32, f32)], config: &SearchConfig) -> Vec<FusedHit> {
    let keyword_scores = normalize_ascending_is_better(keyword.iter().map(|(id, rank)| (*id, *rank)));
    let semantic_scores =
        normalize_ascending_is_better(semantic.iter().map(|(id, dist)| (*id, *dist as f64)));

    let mut ids: Vec<u32> = keyword_scores.keys().chain(semantic_scores.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();

    let mut hits: Vec<FusedHit> = ids
        .into_iter()
        .map(|id| {
            let k = keyword_scores.get(&id).copied();
            let s = semantic_scores.get(&id).copied();
            let base = config.semantic_weight * s.unwrap_or(0.0) + config.keyword_weight * k.unwrap_or(0.0);
            let (score, source) = match (k, s) {
                (Some(_), Some(_)) => (base * config.dual_hit_boost, HitSource::Both),
                (Some(_), None) => (base, HitSource::Keyword),
                (None, Some(_)) => (base, HitSource::Semantic),
                (None, None) => (0.0, HitSource::Keyword),
            };
            FusedHit { card_id: id, score, source }
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then(a.card_id.cmp(&b.card_id)));
    hits
}

/// Min-max normalizes `(id, raw)` pairs where a smaller raw value is
/// better, onto `[0, 1]` where a larger normalized value is better. A
/// single-element or constant-valued input maps everything to `1.0`.
fn normalize_ascending_is_better(values: impl Iterator<Item = (u32, f64)>) -> HashMap<u32, f64> {
    let values: Vec<(u32, f64)> = values.collect();
    if values.is_empty() {
        return HashMap::new();
    }
    let lo = values.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let hi = values.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    values
        .into_iter()
        .map(|(id, v)| {
            let normalized = if (hi - lo).abs() < 1e-12 { 1.0 } else { 1.0 - (v - lo) / (hi - lo) };
            (id, normalized)
        })
        .collect()
}
