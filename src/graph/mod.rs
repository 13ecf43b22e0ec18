//! Cross-file graph builder.
//!
//! Turns a repo's parsed files into weighted, typed, deduplicated edges.
//! No I/O: `build_edges` is a pure function over `&[ParsedFile]`, so it
//! feeds directly into flow detection's petgraph construction without a
//! store round trip.

pub mod builder;

pub use builder::build_edges;

use crate::types::RelationKind;
use serde::{Deserialize, Serialize};

/// One edge produced by the graph builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source_file: String,
    pub target_file: String,
    pub relation: RelationKind,
    pub weight: f64,
    pub repo: String,
    pub metadata: Option<String>,
}

impl GraphEdge {
    pub fn new(
        source_file: impl Into<String>,
        target_file: impl Into<String>,
        relation: RelationKind,
        weight: f64,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            target_file: target_file.into(),
            relation,
            weight,
            repo: repo.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn is_cross_repo(&self, other_repo: &str) -> bool {
        self.repo != other_repo
    }
}
