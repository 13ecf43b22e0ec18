//! Branch classification (spec.md §4.9). A checkout's name alone
//! decides how expensive the sync that follows is allowed to be: a
//! long-lived integration branch earns a full cross-repo resync, a
//! feature branch only gets its changed files marked stale, and a
//! handful of bot/ephemeral prefixes are skipped outright.

use crate::types::SyncLevel;
use regex::Regex;
use std::sync::LazyLock;

static TICKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]{2,10}-\d+").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/_-]+").unwrap());

const SKIP_PREFIXES: [&str; 3] = ["dependabot/", "renovate/", "snyk-fix/"];
const FULL_BRANCHES: [&str; 2] = ["main", "master"];
const FULL_PREFIXES: [&str; 2] = ["release/", "hotfix/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub branch: String,
    pub ticket_id: Option<String>,
    pub context_hint: String,
    pub epic_branch: Option<String>,
    pub sync_level: SyncLevel,
}

/// `main`/`master` and `release/*`/`hotfix/*` get a full resync (they feed
/// other repos' cross-service cards); bot-authored dependency-bump
/// branches are skipped entirely; everything else — feature and bugfix
/// work — gets the lightweight staleness-only pass.
pub fn classify(branch: &str) -> SyncLevel {
    if SKIP_PREFIXES.iter().any(|p| branch.starts_with(p)) {
        SyncLevel::Skip
    } else if FULL_BRANCHES.contains(&branch) || FULL_PREFIXES.iter().any(|p| branch.starts_with(p)) {
        SyncLevel::Full
    } else {
        SyncLevel::Lightweight
    }
}

/// Builds the full `BranchContext` for a checked-out branch. `epic_branch`
/// is populated by the caller from a prior `branch_events` row when this
/// branch was forked from a tracked epic; sync itself has no way to know
/// that from the name alone.
pub fn extract(branch: &str, epic_branch: Option<String>) -> BranchContext {
    let ticket_id = TICKET_RE.find(branch).map(|m| m.as_str().to_string());
    let context_hint = SEPARATOR_RE.replace_all(branch, " ").trim().to_string();
    BranchContext { branch: branch.to_string(), ticket_id, context_hint, epic_branch, sync_level: classify(branch) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_and_master_get_full_sync() {
        assert_eq!(classify("main"), SyncLevel::Full);
        assert_eq!(classify("master"), SyncLevel::Full);
        assert_eq!(classify("release/2026.03"), SyncLevel::Full);
    }

    #[test]
    fn bot_branches_are_skipped() {
        assert_eq!(classify("dependabot/npm_and_yarn/lodash-4.17.21"), SyncLevel::Skip);
    }

    #[test]
    fn feature_branches_get_lightweight_sync() {
        assert_eq!(classify("feature/patient-intake"), SyncLevel::Lightweight);
    }

    #[test]
    fn extracts_ticket_id_and_humanized_hint() {
        let ctx = extract("feature/PROJ-1234_patient_intake_flow", None);
        assert_eq!(ctx.ticket_id.as_deref(), Some("PROJ-1234"));
        assert_eq!(ctx.context_hint, "feature PROJ 1234 patient intake flow");
        assert_eq!(ctx.sync_level, SyncLevel::Lightweight);
    }

    #[test]
    fn branch_without_ticket_id_has_none() {
        let ctx = extract("quick-fix-typo", None);
        assert!(ctx.ticket_id.is_none());
    }
}
