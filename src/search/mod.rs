//! C8 — hybrid search (spec.md §4.7). The only query-time path into the
//! store: semantic cache check, parallel keyword/semantic retrieval,
//! fusion, branch filtering, MMR diversification, and an optional
//! cross-encoder rerank, in that order.
//!
//! Every recoverable failure along the way (a down embedder, a rerank
//! call that times out) degrades the pipeline rather than failing the
//! call — `search` never returns an `Err` for a condition a caller could
//! not have prevented (spec.md §7's public-API invariant, mirrored in
//! `crate::error`'s module doc).

pub mod cache;
pub mod fusion;
pub mod mmr;
pub mod rerank;

use crate::cards::Card;
use crate::config::SearchConfig;
use crate::embedding::{EmbedMode, Embedder};
use crate::storage::{fts, vectors, Store};
use rerank::{CrossEncoder, RerankCandidate, MAX_RERANK_CANDIDATES};

pub struct SearchOptions {
    pub branch: Option<String>,
    pub limit: usize,
    pub debug: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { branch: None, limit: 5, debug: false }
    }
}

pub struct SearchOutcome {
    pub cards: Vec<Card>,
    pub cache_hit: bool,
}

/// Runs the full hybrid search pipeline. `now` is the caller-supplied
/// wall-clock timestamp (so the pipeline stays a pure function of its
/// inputs and is unit-testable without a clock).
pub fn search(
    store: &Store,
    embedder: &dyn Embedder,
    cross_encoder: Option<&dyn CrossEncoder>,
    config: &SearchConfig,
    query: &str,
    options: &SearchOptions,
    now: i64,
) -> SearchOutcome {
    // P7: an empty query returns an empty result and writes no metrics row.
    if query.trim().is_empty() {
        return SearchOutcome { cards: Vec::new(), cache_hit: false };
    }

    let started = now;
    let query_embedding = match embedder.embed(query, EmbedMode::Query) {
        Ok(mut v) => {
            crate::embedding::l2_normalize(&mut v);
            Some(v)
        }
        Err(e) => {
            tracing::warn!(error = %e, "query embedding failed, degrading to keyword-only search");
            None
        }
    };

    let cache_hit = query_embedding.as_deref().and_then(|qe| {
        let history = store
            .recent_metrics_with_embedding(50)
            .map_err(|e| tracing::warn!(error = %e, "semantic cache lookup failed"))
            .unwrap_or_default();
        cache::lookup(qe, &history)
    });

    if let Some(hit) = cache_hit {
        let cards = load_cards(store, &hit.response_cards, options.branch.as_deref());
        record_metrics(store, started, query, query_embedding.as_deref(), &cards, true, now);
        return SearchOutcome { cards, cache_hit: true };
    }

    let fetch_limit = (options.limit.max(1) * 3) as u32;

    let sanitized = fts::sanitize_fts5_query(query);
    let keyword_hits = store
        .search_fts(&sanitized, fetch_limit)
        .map_err(|e| tracing::warn!(error = %e, "fts search failed"))
        .unwrap_or_default();

    let embeddings = store
        .all_card_embeddings()
        .map_err(|e| tracing::warn!(error = %e, "loading card embeddings failed"))
        .unwrap_or_default();

    let semantic_hits: Vec<(u32, f32)> = match &query_embedding {
        Some(qe) => {
            let mut hits: Vec<(u32, f32)> = embeddings
                .iter()
                .filter_map(|(id, content, title)| {
                    let refs: Vec<&[f32]> = match title {
                        Some(t) => vec![content.as_slice(), t.as_slice()],
                        None => vec![content.as_slice()],
                    };
                    vectors::min_distance(qe, &refs).map(|d| (*id, d))
                })
                .collect();
            hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            hits.truncate(fetch_limit as usize);
            hits
        }
        None => Vec::new(),
    };

    let mut fused = fusion::fuse(&keyword_hits, &semantic_hits, config);
    if fused.is_empty() {
        record_metrics(store, started, query, query_embedding.as_deref(), &[], false, now);
        return SearchOutcome { cards: Vec::new(), cache_hit: false };
    }

    // Step 4 (branch filter) must run before step 5 (MMR) — MMR picks a
    // `limit`-sized set, so filtering afterward can starve it of
    // branch-valid candidates that were sitting further down the fused list.
    if let Some(branch) = options.branch.as_deref() {
        let candidate_ids: Vec<u32> = fused.iter().map(|h| h.card_id).collect();
        let allowed: std::collections::HashSet<u32> = store
            .cards_by_ids(&candidate_ids)
            .map_err(|e| tracing::warn!(error = %e, "loading cards for branch filter failed"))
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.valid_for_branch(branch))
            .filter_map(|c| c.id)
            .collect();
        fused.retain(|hit| allowed.contains(&hit.card_id));
    }
    if fused.is_empty() {
        record_metrics(store, started, query, query_embedding.as_deref(), &[], false, now);
        return SearchOutcome { cards: Vec::new(), cache_hit: false };
    }

    let embeddings_by_id: std::collections::HashMap<u32, &Vec<f32>> =
        embeddings.iter().map(|(id, content, _)| (*id, content)).collect();

    let mmr_pool_size = fused.len().min(fetch_limit as usize);
    let mmr_candidates: Vec<mmr::MmrCandidate> = fused
        .iter()
        .take(mmr_pool_size)
        .filter_map(|hit| embeddings_by_id.get(&hit.card_id).map(|vec| mmr::MmrCandidate {
            id: hit.card_id,
            relevance: hit.score,
            embedding: vec.as_slice(),
        }))
        .collect();

    let diversified_target = if config.rerank_enabled && cross_encoder.is_some() {
        options.limit.min(MAX_RERANK_CANDIDATES).max(options.limit)
    } else {
        options.limit
    };
    let diversified_target = diversified_target.min(mmr_candidates.len()).max(options.limit.min(mmr_candidates.len()));

    let ordered_ids: Vec<u32> = if mmr_candidates.is_empty() {
        fused.iter().take(options.limit).map(|h| h.card_id).collect()
    } else {
        mmr::diversify(&mmr_candidates, config.mmr_lambda, diversified_target.max(1))
    };

    let fused_score_by_id: std::collections::HashMap<u32, f64> =
        fused.iter().map(|h| (h.card_id, h.score)).collect();

    let candidate_cards = load_cards(store, &ordered_ids, options.branch.as_deref());

    let final_cards = match (config.rerank_enabled, cross_encoder) {
        (true, Some(encoder)) => {
            let rerank_input: Vec<RerankCandidate> = candidate_cards
                .iter()
                .take(MAX_RERANK_CANDIDATES)
                .map(|c| RerankCandidate {
                    card_id: c.id.unwrap_or(0),
                    fused_score: fused_score_by_id.get(&c.id.unwrap_or(0)).copied().unwrap_or(0.0),
                    document: format!("{}\n{}", c.title, c.content),
                })
                .collect();
            let reranked = rerank::rerank(encoder, query, &rerank_input, config.rerank_blend);
            let order: Vec<u32> = reranked.into_iter().take(options.limit).map(|(id, _)| id).collect();
            reorder_cards(candidate_cards, &order)
        }
        _ => candidate_cards.into_iter().take(options.limit).collect(),
    };

    record_metrics(store, started, query, query_embedding.as_deref(), &final_cards, false, now);
    SearchOutcome { cards: final_cards, cache_hit: false }
}

fn load_cards(store: &Store, ids: &[u32], branch: Option<&str>) -> Vec<Card> {
    let cards = store
        .cards_by_ids(ids)
        .map_err(|e| tracing::warn!(error = %e, "loading cards failed"))
        .unwrap_or_default();
    match branch {
        Some(b) => cards.into_iter().filter(|c| c.valid_for_branch(b)).collect(),
        None => cards,
    }
}

fn reorder_cards(cards: Vec<Card>, order: &[u32]) -> Vec<Card> {
    let mut by_id: std::collections::HashMap<u32, Card> =
        cards.into_iter().filter_map(|c| c.id.map(|id| (id, c))).collect();
    order.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// A returned card counts as one interaction at full signal strength; EMA
/// smoothing (`crate::cards::tiering::update_heat_score`) is what keeps a
/// single burst of queries from swinging a file's heat to the extremes.
const USAGE_INTERACTION_SIGNAL: f64 = 1.0;

fn record_metrics(
    store: &Store,
    started_at: i64,
    query: &str,
    query_embedding: Option<&[f32]>,
    cards: &[Card],
    cache_hit: bool,
    now: i64,
) {
    let blob = query_embedding.map(vectors::f32_to_bytes);
    let ids: Vec<u32> = cards.iter().filter_map(|c| c.id).collect();
    for card in cards {
        let Some(id) = card.id else { continue };
        if let Err(e) = store.increment_usage(id) {
            tracing::warn!(error = %e, card_id = id, "failed to record card usage");
            continue;
        }
        if let Err(e) = store.record_interaction(id, now, USAGE_INTERACTION_SIGNAL) {
            tracing::warn!(error = %e, card_id = id, "failed to record card interaction");
        }
        bump_heat_for_card(store, card);
    }
    let latency_ms = (now - started_at).max(0);
    if let Err(e) = store.insert_metrics_row(now, query, blob.as_deref(), &ids, cache_hit, latency_ms, None) {
        tracing::warn!(error = %e, "failed to record search metrics");
    }
}

/// Updates `file_heat` for every file this card sources from, attributing
/// the interaction to the single repo a file unambiguously belongs to.
/// A card spanning multiple repos (cross-service cards) has no reliable
/// per-file repo mapping to fall back on, so those are skipped rather than
/// guessed at.
fn bump_heat_for_card(store: &Store, card: &Card) {
    let [repo] = card.source_repos.as_slice() else { return };
    for path in &card.source_files {
        let previous = store
            .get_heat(path, repo)
            .map_err(|e| tracing::warn!(error = %e, path, repo, "failed to read file heat"))
            .unwrap_or_default();
        let updated = crate::cards::tiering::update_heat_score(previous, USAGE_INTERACTION_SIGNAL, crate::cards::tiering::HEAT_EMA_ALPHA);
        if let Err(e) = store.set_heat(path, repo, updated) {
            tracing::warn!(error = %e, path, repo, "failed to persist file heat");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::embedding::NullEmbedder;
    use crate::types::CardType;

    fn config() -> SearchConfig {
        SearchConfig {
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            dual_hit_boost: 1.2,
            mmr_lambda: 0.7,
            rerank_blend: 0.6,
            rerank_enabled: false,
        }
    }

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let mut card = Card::new(
            "patient",
            "Patient intake flow",
            "Handles patient intake and billing authorization.",
            CardType::Flow,
            vec!["app/models/patient.rb".to_string()],
            vec!["clinic".to_string()],
            vec!["model".to_string()],
            "Patient",
            0,
        );
        let id = store.upsert_card(&mut card).unwrap();
        store.upsert_fts_row(&card).unwrap();
        let vector = embedder.embed(&card.content, EmbedMode::Document).unwrap();
        store.upsert_card_embedding(id, &vector).unwrap();
        store
    }

    #[test]
    fn empty_query_returns_empty_result_and_writes_no_metrics() {
        let store = seeded_store();
        let embedder = NullEmbedder::with_dimension(8);
        let outcome = search(&store, &embedder, None, &config(), "  ", &SearchOptions::default(), 1000);
        assert!(outcome.cards.is_empty());
        assert!(!outcome.cache_hit);
        assert!(store.recent_metrics_with_embedding(10).unwrap().is_empty());
    }

    #[test]
    fn keyword_match_surfaces_the_seeded_card() {
        let store = seeded_store();
        let embedder = NullEmbedder::with_dimension(8);
        let outcome = search(&store, &embedder, None, &config(), "patient billing", &SearchOptions::default(), 1000);
        assert_eq!(outcome.cards.len(), 1);
        assert_eq!(outcome.cards[0].title, "Patient intake flow");
    }

    #[test]
    fn branch_filter_excludes_cards_restricted_to_other_branches() {
        let store = seeded_store();
        let mut card = store.all_cards().unwrap().remove(0);
        card.valid_branches = Some(vec!["main".to_string()]);
        store.upsert_card(&mut card).unwrap();

        let embedder = NullEmbedder::with_dimension(8);
        let options = SearchOptions { branch: Some("feature/x".to_string()), limit: 5, debug: false };
        let outcome = search(&store, &embedder, None, &config(), "patient billing", &options, 1000);
        assert!(outcome.cards.is_empty());
    }

    #[test]
    fn second_near_identical_query_is_a_cache_hit() {
        let store = seeded_store();
        let embedder = NullEmbedder::with_dimension(8);
        let first = search(&store, &embedder, None, &config(), "patient billing", &SearchOptions::default(), 1000);
        assert!(!first.cache_hit);
        let second = search(&store, &embedder, None, &config(), "patient billing", &SearchOptions::default(), 2000);
        assert!(second.cache_hit);
        assert_eq!(second.cards.len(), first.cards.len());
    }
}
