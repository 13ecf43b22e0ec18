//! The crate's public API surface (spec.md §6): `search`, `context`,
//! `save_insight`, `verify_card`, `list_flows`, and `sync`. Indexing
//! (`Orchestrator::index_repo`) is the other entry point into a running
//! store; `search`/`context`/`save_insight`/`verify_card`/`list_flows`
//! are what an AI coding assistant calls turn to turn, while `sync` is
//! what a git hook calls. `sync` unifies `crate::sync`'s change
//! detection/staleness bookkeeping with `Orchestrator::reindex_changed_files`'s
//! `Full`-level card regeneration, since spec.md §6 names it as one
//! operation with one signature rather than three separate functions.
//!
//! None of these return `Err` for a recoverable condition — a failed
//! store read degrades to an empty result rather than propagating, per
//! `crate::error`'s module doc. Only `save_insight`/`verify_card`, which
//! write, surface a `CoreError` when the write itself fails.

use crate::cards::Card;
use crate::config::SearchConfig;
use crate::embedding::Embedder;
use crate::error::{CoreError, CoreResult};
use crate::orchestrator::Orchestrator;
use crate::search::rerank::CrossEncoder;
use crate::search::{self, SearchOptions, SearchOutcome};
use crate::storage::Store;
use crate::sync;
use crate::types::{CardType, SyncEventType, SyncLevel};
use std::path::Path;

/// Cards concatenated into one markdown bundle, most relevant first.
const MAX_CONTEXT_CARDS: usize = 5;
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub fn search(
    store: &Store,
    embedder: &dyn Embedder,
    cross_encoder: Option<&dyn CrossEncoder>,
    config: &SearchConfig,
    query: &str,
    options: &SearchOptions,
    now: i64,
) -> SearchOutcome {
    search::search(store, embedder, cross_encoder, config, query, options, now)
}

/// HyDE-style context retrieval: `description` stands in for a would-be
/// hypothetical answer, embedded and searched exactly like a query, then
/// the top cards' content is stitched into one markdown bundle an agent
/// can drop straight into its own context window.
pub fn context(
    store: &Store,
    embedder: &dyn Embedder,
    cross_encoder: Option<&dyn CrossEncoder>,
    config: &SearchConfig,
    description: &str,
    branch: Option<&str>,
    now: i64,
) -> String {
    if description.trim().is_empty() {
        return String::new();
    }
    let options = SearchOptions { branch: branch.map(str::to_string), limit: MAX_CONTEXT_CARDS, debug: false };
    let outcome = search::search(store, embedder, cross_encoder, config, description, &options, now);
    outcome.cards.iter().map(|c| format!("## {}\n\n{}", c.title, c.content)).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Persists a developer- or conversation-authored insight as a card
/// (spec.md §3's `dev_insight`/`conv_insight` card types). Unlike
/// generated cards, the caller supplies the content directly — there is
/// no structural/LLM fallback to run.
#[allow(clippy::too_many_arguments)]
pub fn save_insight(
    store: &Store,
    flow: &str,
    title: &str,
    content: &str,
    card_type: CardType,
    source_files: Vec<String>,
    source_repos: Vec<String>,
    tags: Vec<String>,
    now: i64,
) -> CoreResult<Card> {
    let mut card = Card::new(flow, title, content, card_type, source_files, source_repos, tags, "", now);
    store.upsert_card(&mut card).map_err(CoreError::Migration)?;
    store.upsert_fts_row(&card).map_err(CoreError::Migration)?;
    Ok(card)
}

/// Records a human confirmation that a card is still accurate
/// (`verified_at`/`verification_count`). Returns `false` if the card
/// doesn't exist rather than erroring — verifying a stale id is a
/// no-op, not a failure.
pub fn verify_card(store: &Store, card_id: u32, now: i64) -> CoreResult<bool> {
    store.verify_card(card_id, now).map_err(CoreError::Migration)
}

/// The result of one `sync()` call (spec.md §6): `indexed` counts cards
/// regenerated by `Full`-level propagation, `invalidated` counts cards
/// simply marked stale (every non-`Skip` level does this).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub indexed: u32,
    pub invalidated: u32,
}

/// `sync(repo, branch, event_type, changed_files) -> {indexed, invalidated}`
/// (spec.md §6), the one entry point a git hook calls. `Checkout` only
/// persists a `BranchContext` and touches no cards. The other four event
/// types mark every card whose `source_files` intersects `changed_files`
/// stale; at `Full` sync level they additionally rebuild the edges those
/// files participate in and re-run C5 for the flows they belong to
/// (`Orchestrator::reindex_changed_files`). `Skip`-level branches and an
/// empty `changed_files` both return `{indexed: 0, invalidated: 0}`
/// without touching the store.
///
/// Per spec.md §7e, a sync error is never propagated to the caller — it
/// is logged and absorbed into an empty report, since a git hook must
/// never be blocked by a sync failure.
pub fn sync(
    orchestrator: &Orchestrator,
    repo: &str,
    repo_path: &Path,
    branch: &str,
    event_type: SyncEventType,
    changed_files: &[String],
    now: i64,
) -> SyncReport {
    match sync_inner(orchestrator, repo, repo_path, branch, event_type, changed_files, now) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(error = %e, repo, branch, "sync failed, returning an empty report");
            SyncReport::default()
        }
    }
}

fn sync_inner(
    orchestrator: &Orchestrator,
    repo: &str,
    repo_path: &Path,
    branch: &str,
    event_type: SyncEventType,
    changed_files: &[String],
    now: i64,
) -> CoreResult<SyncReport> {
    if event_type == SyncEventType::Checkout {
        sync::on_checkout(orchestrator.store, branch, None, now).map_err(CoreError::Migration)?;
        return Ok(SyncReport::default());
    }

    let sync_level = sync::branch::classify(branch);
    if sync_level == SyncLevel::Skip || changed_files.is_empty() {
        return Ok(SyncReport::default());
    }

    let invalidated = orchestrator.store.mark_stale_for_files(changed_files).map_err(CoreError::Migration)?;

    let indexed = if sync_level == SyncLevel::Full {
        orchestrator.reindex_changed_files(repo, repo_path, changed_files, now)?
    } else {
        0
    };

    Ok(SyncReport { indexed, invalidated })
}

/// Per spec.md §6: `(name, cardCount, fileCount, staleCount, repos, avgHeat, isPageFlow)`.
/// `is_page_flow` is an Open Question the visible spec never pins down; this
/// implementation decides a flow "is a page flow" when a majority of its
/// cards carry the `component` or `frontend` tag (see DESIGN.md), i.e. it
/// groups UI-facing files rather than a backend model/controller cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSummary {
    pub name: String,
    pub card_count: u32,
    pub file_count: u32,
    pub stale_count: u32,
    pub repos: Vec<String>,
    pub avg_heat: f64,
    pub is_hub: bool,
    pub is_page_flow: bool,
}

/// Flows aren't stored as their own table — `cards.flow` is the
/// durable record of Stage B's community assignment (spec.md §4.4), so
/// this groups the current card set rather than re-running detection.
pub fn list_flows(store: &Store) -> Vec<FlowSummary> {
    let cards = match store.all_cards() {
        Ok(cards) => cards,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load cards for list_flows");
            return Vec::new();
        }
    };

    struct Accum {
        files: std::collections::BTreeSet<String>,
        repos: std::collections::BTreeSet<String>,
        stale_count: u32,
        is_hub: bool,
        page_votes: u32,
        card_count: u32,
    }

    let mut by_flow: std::collections::BTreeMap<String, Accum> = std::collections::BTreeMap::new();
    for card in &cards {
        let entry = by_flow.entry(card.flow.clone()).or_insert_with(|| Accum {
            files: std::collections::BTreeSet::new(),
            repos: std::collections::BTreeSet::new(),
            stale_count: 0,
            is_hub: false,
            page_votes: 0,
            card_count: 0,
        });
        entry.files.extend(card.source_files.iter().cloned());
        entry.repos.extend(card.source_repos.iter().cloned());
        entry.stale_count += card.stale as u32;
        entry.is_hub = entry.is_hub || card.card_type == CardType::Hub;
        entry.page_votes += card.tags.iter().any(|t| t == "component" || t == "frontend") as u32;
        entry.card_count += 1;
    }

    by_flow
        .into_iter()
        .map(|(name, acc)| {
            let heats: Vec<f64> = acc
                .files
                .iter()
                .flat_map(|path| acc.repos.iter().filter_map(move |repo| store.get_heat(path, repo).ok().flatten()))
                .collect();
            let avg_heat = if heats.is_empty() { 0.0 } else { heats.iter().sum::<f64>() / heats.len() as f64 };
            FlowSummary {
                card_count: acc.card_count,
                file_count: acc.files.len() as u32,
                stale_count: acc.stale_count,
                repos: acc.repos.into_iter().collect(),
                avg_heat,
                is_hub: acc.is_hub,
                is_page_flow: acc.page_votes * 2 > acc.card_count,
                name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::embedding::NullEmbedder;
    use crate::types::CardType as CT;
    use std::sync::Arc;

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

    #[test]
    fn empty_description_returns_empty_context() {
        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        assert_eq!(context(&store, &embedder, None, &config(), "", None, 0), "");
    }

    #[test]
    fn save_insight_then_verify_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let card = save_insight(&store, "patient", "Gotcha", "watch the timezone", CT::DevInsight, vec![], vec![], vec![], 10).unwrap();
        assert!(verify_card(&store, card.id.unwrap(), 20).unwrap());
        assert!(!verify_card(&store, 9999, 20).unwrap());
    }

    #[test]
    fn list_flows_groups_cards_by_flow_name() {
        let store = Store::open_in_memory().unwrap();
        save_insight(&store, "patient", "A", "a", CT::DevInsight, vec![], vec![], vec![], 0).unwrap();
        save_insight(&store, "patient", "B", "b", CT::DevInsight, vec![], vec![], vec![], 0).unwrap();
        save_insight(&store, "billing", "C", "c", CT::Hub, vec![], vec![], vec![], 0).unwrap();

        let flows = list_flows(&store);
        let patient = flows.iter().find(|f| f.name == "patient").unwrap();
        assert_eq!(patient.card_count, 2);
        assert!(!patient.is_hub);
        assert_eq!(patient.file_count, 0);
        assert_eq!(patient.stale_count, 0);
        let billing = flows.iter().find(|f| f.name == "billing").unwrap();
        assert!(billing.is_hub);
    }

    #[test]
    fn list_flows_counts_stale_and_repos() {
        let store = Store::open_in_memory().unwrap();
        save_insight(&store, "patient", "A", "a", CT::Flow, vec!["app/models/patient.rb".to_string()], vec!["clinic".to_string()], vec![], 0).unwrap();
        save_insight(&store, "patient", "B", "b", CT::Flow, vec!["app/models/device.rb".to_string()], vec!["clinic".to_string()], vec![], 0).unwrap();
        store.mark_stale_for_files(&["app/models/device.rb".to_string()]).unwrap();

        let flows = list_flows(&store);
        let patient = flows.iter().find(|f| f.name == "patient").unwrap();
        assert_eq!(patient.file_count, 2);
        assert_eq!(patient.stale_count, 1);
        assert_eq!(patient.repos, vec!["clinic".to_string()]);
    }

    fn write_clinic_repo(root: &Path) {
        std::fs::create_dir_all(root.join("app/models")).unwrap();
        std::fs::write(
            root.join("app/models/patient.rb"),
            "class Patient < ApplicationRecord\n  has_many :devices\nend\n",
        )
        .unwrap();
        std::fs::write(
            root.join("app/models/device.rb"),
            "class Device < ApplicationRecord\n  belongs_to :patient\nend\n",
        )
        .unwrap();
    }

    #[test]
    fn sync_checkout_only_persists_branch_context() {
        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);

        let report = sync(&orchestrator, "clinic", Path::new("/tmp/clinic"), "feature/widgets", SyncEventType::Checkout, &[], 0);
        assert_eq!(report, SyncReport::default());
    }

    #[test]
    fn sync_on_a_skip_branch_does_no_work() {
        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);

        let report = sync(
            &orchestrator,
            "clinic",
            Path::new("/tmp/clinic"),
            "dependabot/bump-foo",
            SyncEventType::Pull,
            &["app/models/patient.rb".to_string()],
            0,
        );
        assert_eq!(report, SyncReport::default());
    }

    #[test]
    fn sync_with_no_changed_files_does_no_work() {
        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);

        let report = sync(&orchestrator, "clinic", Path::new("/tmp/clinic"), "main", SyncEventType::Save, &[], 0);
        assert_eq!(report, SyncReport::default());
    }

    #[test]
    fn sync_at_lightweight_level_marks_stale_without_regenerating_cards() {
        let store = Store::open_in_memory().unwrap();
        save_insight(&store, "patient", "A", "a", CT::Flow, vec!["app/models/patient.rb".to_string()], vec!["clinic".to_string()], vec![], 0).unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);

        let report = sync(
            &orchestrator,
            "clinic",
            Path::new("/tmp/clinic"),
            "feature/widgets",
            SyncEventType::Pull,
            &["app/models/patient.rb".to_string()],
            0,
        );
        assert_eq!(report.invalidated, 1);
        assert_eq!(report.indexed, 0);
    }

    #[test]
    fn sync_at_full_level_marks_stale_and_regenerates_affected_cards() {
        let dir = tempfile::tempdir().unwrap();
        write_clinic_repo(dir.path());

        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);
        orchestrator.index_repo("clinic", dir.path(), 1000).unwrap();

        std::fs::write(
            dir.path().join("app/models/patient.rb"),
            "class Patient < ApplicationRecord\n  has_many :devices\n  has_many :appointments\nend\n",
        )
        .unwrap();

        let report = sync(
            &orchestrator,
            "clinic",
            dir.path(),
            "main",
            SyncEventType::Merge,
            &["app/models/patient.rb".to_string()],
            2000,
        );
        assert!(report.invalidated > 0);
        assert!(report.indexed > 0);
    }
}
