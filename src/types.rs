//! Small newtype identifiers and value types shared across the crate.
//!
//! Mirrors the teacher's `types/mod.rs` convention: `NonZeroU32`-backed ids
//! so `Option<Id>` is free, plus a handful of domain enums that show up in
//! every data-model entity from `spec.md` §3.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(NonZeroU32);

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl CardId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// The language a parser was selected for. Drives extension detection and
/// the framework-extractor second pass (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
    Ruby,
    JavaScript,
    TypeScript,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Some(Language::Rust),
            "py" | "pyi" => Some(Language::Python),
            "rb" | "rake" | "gemspec" => Some(Language::Ruby),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "vue" => Some(Language::JavaScript),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// File role classification from C2 (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileRole {
    Domain,
    SharedUtility,
    Test,
    Config,
    EntryPoint,
}

impl FileRole {
    /// Only `domain` and `shared_utility` files can source card content.
    pub fn is_domain_relevant(&self) -> bool {
        matches!(self, FileRole::Domain | FileRole::SharedUtility)
    }

    /// Files in these roles never participate in the graph builder (spec.md §4.3a).
    pub fn is_non_emitting(&self) -> bool {
        matches!(self, FileRole::Test | FileRole::Config | FileRole::EntryPoint)
    }
}

/// Class/type kind as recorded on a `ParsedFile` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Model,
    Controller,
    Service,
    Job,
    Concern,
    Helper,
    Serializer,
    Middleware,
    Component,
    Other,
}

/// Association kind between model classes (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    HasMany,
    BelongsTo,
    HasOne,
    HasAndBelongsToMany,
    ForeignKey,
    ManyToManyField,
    OneToOneField,
}

/// The kind of cross-file edge the graph builder (C3) can emit (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Import,
    ModelAssociation,
    RouteController,
    ControllerModel,
    ApiEndpoint,
}

impl RelationKind {
    /// Base weight from the spec.md §4.3 table, before the shared-utility
    /// 0.5 multiplier is applied.
    pub fn base_weight(&self) -> f64 {
        match self {
            RelationKind::Import => 1.0,
            RelationKind::ModelAssociation => 3.0,
            RelationKind::RouteController => 3.0,
            RelationKind::ControllerModel => 2.0,
            RelationKind::ApiEndpoint => 3.0,
        }
    }

    /// Relations the flow detector's PageRank stage restricts itself to
    /// (spec.md §4.4, Stage A).
    pub fn is_high_signal(&self) -> bool {
        matches!(
            self,
            RelationKind::ModelAssociation | RelationKind::ControllerModel | RelationKind::RouteController
        )
    }

    /// Only `api_endpoint` edges may cross a repo boundary (spec.md §4.3c).
    pub fn allows_cross_repo(&self) -> bool {
        matches!(self, RelationKind::ApiEndpoint)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Import => "import",
            RelationKind::ModelAssociation => "model_association",
            RelationKind::RouteController => "route_controller",
            RelationKind::ControllerModel => "controller_model",
            RelationKind::ApiEndpoint => "api_endpoint",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Card template selected by C5 (spec.md §3, `Card.card_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Flow,
    Hub,
    Model,
    CrossService,
    AutoGenerated,
    DevInsight,
    ConvInsight,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Flow => "flow",
            CardType::Hub => "hub",
            CardType::Model => "model",
            CardType::CrossService => "cross_service",
            CardType::AutoGenerated => "auto_generated",
            CardType::DevInsight => "dev_insight",
            CardType::ConvInsight => "conv_insight",
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Branch classification level (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLevel {
    Skip,
    Lightweight,
    Full,
}

/// The git event driving one call to `sync()` (spec.md §4.9/§6). Checkout
/// carries no changed files and only updates the active `BranchContext`;
/// the other four all diff a range and mark/propagate card staleness the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    Checkout,
    Merge,
    Pull,
    Rebase,
    Save,
}

/// A minimal half-open source range: (start_line, end_line), 1-indexed and
/// inclusive, used to cap card source snippets at 150 lines (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self { start_line, end_line }
    }

    pub fn len(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end_line < self.start_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_rejects_zero() {
        assert!(FileId::new(0).is_none());
        assert_eq!(FileId::new(7).unwrap().value(), 7);
    }

    #[test]
    fn language_from_extension_covers_frameworks() {
        assert_eq!(Language::from_extension("rb"), Some(Language::Ruby));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("vue"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("md"), None);
    }

    #[test]
    fn role_domain_relevance() {
        assert!(FileRole::Domain.is_domain_relevant());
        assert!(FileRole::SharedUtility.is_domain_relevant());
        assert!(!FileRole::Test.is_domain_relevant());
        assert!(FileRole::EntryPoint.is_non_emitting());
        assert!(!FileRole::Domain.is_non_emitting());
    }

    #[test]
    fn line_range_length() {
        let r = LineRange::new(10, 14);
        assert_eq!(r.len(), 5);
        assert!(!r.is_empty());
    }
}
