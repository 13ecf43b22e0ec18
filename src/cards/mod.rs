//! Card generator. Builds structural markdown for a flow/hub/model/
//! cross-service input, optionally replaces it with an LLM completion,
//! and always produces a card — never omits one.

pub mod assemble;
pub mod generator;
pub mod tags;
pub mod templates;
pub mod tiering;

pub use assemble::{build_cards, AssembleInputs};
pub use generator::{generate_card, GenerationOptions, TextGenerator};
pub use templates::{CardContent, CardVariant};

use crate::types::CardType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MIN_MODEL_ASSOCIATIONS: usize = 2;

/// The unit of retrievable knowledge surfaced by search and context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: Option<u32>,
    pub flow: String,
    pub title: String,
    pub content: String,
    pub card_type: CardType,
    pub source_files: Vec<String>,
    pub source_repos: Vec<String>,
    pub tags: Vec<String>,
    pub identifiers: String,
    pub valid_branches: Option<Vec<String>>,
    pub commit_sha: Option<String>,
    pub stale: bool,
    pub usage_count: u64,
    pub specificity_score: f64,
    pub verified_at: Option<i64>,
    pub verification_count: u64,
    pub content_hash: String,
    pub updated_at: i64,
}

impl Card {
    pub fn new(
        flow: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        card_type: CardType,
        source_files: Vec<String>,
        source_repos: Vec<String>,
        tags: Vec<String>,
        identifiers: impl Into<String>,
        updated_at: i64,
    ) -> Self {
        let title = title.into();
        let content = content.into();
        let content_hash = compute_content_hash(&title, &content);
        Self {
            id: None,
            flow: flow.into(),
            title,
            content,
            card_type,
            source_files,
            source_repos,
            tags,
            identifiers: identifiers.into(),
            valid_branches: None,
            commit_sha: None,
            stale: false,
            usage_count: 0,
            specificity_score: 0.0,
            verified_at: None,
            verification_count: 0,
            content_hash,
            updated_at,
        }
    }

    /// Recomputes `content_hash` after `content`/`title` changes. Used by
    /// the sync engine and the card generator's update path; callers
    /// compare the result against the stored hash before rewriting a row,
    /// so an unchanged card never triggers a write.
    pub fn refresh_hash(&mut self) {
        self.content_hash = compute_content_hash(&self.title, &self.content);
    }

    pub fn is_branch_agnostic(&self) -> bool {
        self.valid_branches.is_none()
    }

    pub fn valid_for_branch(&self, branch: &str) -> bool {
        match &self.valid_branches {
            None => true,
            Some(branches) => branches.iter().any(|b| b == branch),
        }
    }
}

/// `content_hash = SHA256(title || "\n" || content)`.
pub fn compute_content_hash(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic_and_matches_invariant() {
        let card = Card::new(
            "patient",
            "Patient flow",
            "body",
            CardType::Flow,
            vec!["a.rb".to_string()],
            vec!["clinic".to_string()],
            vec![],
            "Patient",
            0,
        );
        assert_eq!(card.content_hash, compute_content_hash("Patient flow", "body"));
    }

    #[test]
    fn branch_agnostic_when_valid_branches_is_none() {
        let card = Card::new("f", "t", "c", CardType::Flow, vec![], vec![], vec![], "", 0);
        assert!(card.is_branch_agnostic());
        assert!(card.valid_for_branch("anything"));
    }

    #[test]
    fn branch_filter_respects_explicit_list() {
        let mut card = Card::new("f", "t", "c", CardType::Flow, vec![], vec![], vec![], "", 0);
        card.valid_branches = Some(vec!["main".to_string()]);
        assert!(card.valid_for_branch("main"));
        assert!(!card.valid_for_branch("feature/foo"));
    }
}
