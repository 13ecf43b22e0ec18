//! C10 — sync engine (spec.md §4.9). Keeps the store's view of a repo
//! current as branches are checked out, merged, and rebased, without
//! ever re-running the full indexing pipeline for a change that doesn't
//! warrant it.
//!
//! This module owns change *detection* and *staleness bookkeeping*;
//! regenerating cards for files it marks stale is the orchestrator's
//! job (C11), since that requires the parser/graph/card machinery this
//! module has no reason to depend on.

pub mod branch;
pub mod diff;

use crate::error::{StorageResult, SyncResult};
use crate::storage::Store;
use crate::types::SyncLevel;
use std::path::Path;

pub use branch::BranchContext;

/// Result of a single sync pass, for the caller (CLI/orchestrator) to log.
#[derive(Debug)]
pub struct SyncOutcome {
    pub sync_level: SyncLevel,
    pub changed_files: Vec<String>,
    pub cards_marked_stale: u32,
}

impl SyncOutcome {
    fn empty(sync_level: SyncLevel) -> Self {
        Self { sync_level, changed_files: Vec::new(), cards_marked_stale: 0 }
    }
}

/// Runs on every branch checkout: classifies the branch and persists a
/// `branch_events` row so later sync passes (and card-generation
/// prompts) know what ticket/epic this branch belongs to.
pub fn on_checkout(store: &Store, branch: &str, epic_branch: Option<String>, now: i64) -> StorageResult<BranchContext> {
    let context = branch::extract(branch, epic_branch);
    store.insert_branch_event(
        &context.branch,
        context.ticket_id.as_deref(),
        &context.context_hint,
        context.epic_branch.as_deref(),
        sync_level_str(context.sync_level),
        now,
    )?;
    Ok(context)
}

/// Runs on merge, pull, rebase, or an explicit save: diffs `from..to`
/// and marks affected cards stale according to the branch's sync level.
/// A `Skip`-level branch (bot-authored, ephemeral) does no work at all.
pub fn on_change(store: &Store, repo_path: &Path, branch: &str, from: &str, to: &str) -> SyncResult<SyncOutcome> {
    let sync_level = branch::classify(branch);
    if sync_level == SyncLevel::Skip {
        return Ok(SyncOutcome::empty(sync_level));
    }

    let changed_files = diff::changed_files(repo_path, from, to)?;
    if changed_files.is_empty() {
        return Ok(SyncOutcome::empty(sync_level));
    }

    // Lightweight and full sync both mark the changed files' cards stale;
    // full additionally propagates cross-repo (handled by the
    // orchestrator re-running the graph builder over the touched repo's
    // neighbors) — that propagation needs the full file set this module
    // doesn't load, so it only flags the level for the caller to act on.
    let cards_marked_stale = store.mark_stale_for_files(&changed_files)?;

    Ok(SyncOutcome { sync_level, changed_files, cards_marked_stale })
}

/// Branch garbage collection (spec.md §4.9): drops `file_index` rows for
/// branches no longer reported by the VCS, and prunes any card whose
/// `valid_branches` no longer names a live branch. Guarded by the
/// `repo_profiles.gc_in_progress` flag so two concurrent sync hooks for
/// the same repo don't race.
pub fn branch_gc(store: &Store, repo: &str, live_branches: &[String]) -> StorageResult<u32> {
    if !store.try_begin_gc(repo)? {
        return Ok(0);
    }
    let result = (|| -> StorageResult<u32> {
        let mut removed = 0;
        for stale_branch in store.live_branches(repo)? {
            if !live_branches.contains(&stale_branch) {
                removed += store.delete_file_index_for_branch(repo, &stale_branch)?;
            }
        }
        for card in store.all_cards()? {
            if let Some(branches) = &card.valid_branches {
                if !branches.iter().any(|b| live_branches.contains(b)) {
                    store.delete_card(card.id.unwrap())?;
                }
            }
        }
        Ok(removed)
    })();
    store.end_gc(repo)?;
    result
}

fn sync_level_str(level: SyncLevel) -> &'static str {
    match level {
        SyncLevel::Skip => "skip",
        SyncLevel::Lightweight => "lightweight",
        SyncLevel::Full => "full",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use crate::types::CardType;

    #[test]
    fn checkout_persists_a_branch_event() {
        let store = Store::open_in_memory().unwrap();
        let ctx = on_checkout(&store, "feature/PROJ-42_billing", None, 100).unwrap();
        assert_eq!(ctx.sync_level, SyncLevel::Lightweight);
        let latest = store.latest_branch_event().unwrap().unwrap();
        assert_eq!(latest.0, "feature/PROJ-42_billing");
    }

    #[test]
    fn skip_level_branch_does_no_work() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git").current_dir(dir.path()).args(["init", "-q"]).status().unwrap();
        let outcome = on_change(&store, dir.path(), "dependabot/npm/lodash", "HEAD~1", "HEAD");
        // A skip-level branch never touches git at all.
        assert_eq!(outcome.unwrap().sync_level, SyncLevel::Skip);
    }

    #[test]
    fn branch_gc_prunes_cards_with_no_live_branch() {
        let store = Store::open_in_memory().unwrap();
        let mut card = Card::new("f", "t", "c", CardType::Flow, vec![], vec![], vec![], "", 0);
        card.valid_branches = Some(vec!["feature/dead".to_string()]);
        let id = store.upsert_card(&mut card).unwrap();

        branch_gc(&store, "clinic", &["main".to_string()]).unwrap();
        assert!(store.get_card(id).unwrap().is_none());
    }

    #[test]
    fn branch_gc_keeps_cards_valid_on_a_live_branch() {
        let store = Store::open_in_memory().unwrap();
        let mut card = Card::new("f", "t", "c", CardType::Flow, vec![], vec![], vec![], "", 0);
        card.valid_branches = Some(vec!["main".to_string()]);
        let id = store.upsert_card(&mut card).unwrap();

        branch_gc(&store, "clinic", &["main".to_string()]).unwrap();
        assert!(store.get_card(id).unwrap().is_some());
    }
}
