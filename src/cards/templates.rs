//! Tagged variant over card components: every card shape is a variant
//! of `CardContent` with its own pure `render()` formatter — no
//! reflection, no dictionary of closures keyed by element name.

use crate::flows::Flow;
use crate::parsing::ParsedFile;
use crate::types::CardType;

/// A single source file contributing to a card, shortened for display.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub path: String,
    pub repo: String,
    /// Up to 150 lines of source, already clipped.
    pub snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Relationship {
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ApiContract {
    pub method: String,
    pub path: String,
    pub description: String,
}

/// The structural inputs to a card, independent of flow/hub/model/cross
/// service — every variant below is built from a subset of these.
#[derive(Debug, Clone)]
pub struct CardContent {
    pub title: String,
    pub summary: String,
    pub sources: Vec<SourceRef>,
    pub relationships: Vec<Relationship>,
    pub api_contracts: Vec<ApiContract>,
    pub variant: CardVariant,
}

#[derive(Debug, Clone)]
pub enum CardVariant {
    Flow { flow_name: String },
    Hub { flow_name: String, connected_flows: Vec<String> },
    Model { model_name: String, association_count: usize },
    CrossService { fe_file: String, be_file: String },
}

impl CardContent {
    pub fn card_type(&self) -> CardType {
        match self.variant {
            CardVariant::Flow { .. } => CardType::Flow,
            CardVariant::Hub { .. } => CardType::Hub,
            CardVariant::Model { .. } => CardType::Model,
            CardVariant::CrossService { .. } => CardType::CrossService,
        }
    }

    /// Renders the structural markdown body: title, one-line summary,
    /// source file list excluding entry points, relationships, API
    /// contracts, clipped snippets.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("{}\n\n", self.summary));

        match &self.variant {
            CardVariant::Hub { connected_flows, .. } if !connected_flows.is_empty() => {
                out.push_str("## Connected flows\n\n");
                for flow in connected_flows {
                    out.push_str(&format!("- {flow}\n"));
                }
                out.push('\n');
            }
            CardVariant::Model { model_name, association_count } => {
                out.push_str(&format!("Model `{model_name}` has {association_count} association(s).\n\n"));
            }
            CardVariant::CrossService { fe_file, be_file } => {
                out.push_str(&format!("Frontend `{fe_file}` calls backend `{be_file}`.\n\n"));
            }
            _ => {}
        }

        if !self.sources.is_empty() {
            out.push_str("## Source files\n\n");
            for source in &self.sources {
                out.push_str(&format!("- `{}` ({})\n", source.path, source.repo));
            }
            out.push('\n');
        }

        if !self.relationships.is_empty() {
            out.push_str("## Relationships\n\n");
            for rel in &self.relationships {
                out.push_str(&format!("- {}\n", rel.description));
            }
            out.push('\n');
        }

        if !self.api_contracts.is_empty() {
            out.push_str("## API contracts\n\n");
            for contract in &self.api_contracts {
                out.push_str(&format!("- `{} {}` — {}\n", contract.method, contract.path, contract.description));
            }
            out.push('\n');
        }

        for source in &self.sources {
            if let Some(snippet) = &source.snippet {
                out.push_str(&format!("### {}\n\n```\n{}\n```\n\n", source.path, snippet));
            }
        }

        out.truncate_to_card_limit()
    }
}

pub(crate) trait TruncateToCardLimit {
    fn truncate_to_card_limit(self) -> String;
}

impl TruncateToCardLimit for String {
    /// Card content is capped at 4000 chars.
    fn truncate_to_card_limit(mut self) -> String {
        const LIMIT: usize = 4000;
        if self.len() > LIMIT {
            while !self.is_char_boundary(LIMIT) {
                self.truncate(self.len() - 1);
                if self.len() <= LIMIT {
                    break;
                }
            }
            self.truncate(LIMIT.min(self.len()));
        }
        self
    }
}

/// Clips a file's first N lines for a card's source snippet.
pub fn clip_snippet(source: &str, max_lines: usize) -> String {
    source.lines().take(max_lines).collect::<Vec<_>>().join("\n")
}

/// Shortens a full path for display, excluding entry-point files as the
/// spec requires (`source_files` never includes an `entry_point`, P2).
pub fn shorten_source_files(files: &[&ParsedFile]) -> Vec<String> {
    files
        .iter()
        .filter(|f| f.file_role != crate::types::FileRole::EntryPoint)
        .map(|f| f.path.clone())
        .collect()
}

pub fn flow_title(flow: &Flow) -> String {
    format!("{} flow", flow.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_stays_under_content_limit() {
        let long_snippet = "x".repeat(10_000);
        let content = CardContent {
            title: "Big".to_string(),
            summary: "summary".to_string(),
            sources: vec![SourceRef { path: "a.rb".to_string(), repo: "r".to_string(), snippet: Some(long_snippet) }],
            relationships: vec![],
            api_contracts: vec![],
            variant: CardVariant::Flow { flow_name: "big".to_string() },
        };
        assert!(content.render().len() <= 4000);
    }

    #[test]
    fn model_variant_mentions_association_count() {
        let content = CardContent {
            title: "Patient model".to_string(),
            summary: "s".to_string(),
            sources: vec![],
            relationships: vec![],
            api_contracts: vec![],
            variant: CardVariant::Model { model_name: "Patient".to_string(), association_count: 3 },
        };
        assert!(content.render().contains("3 association"));
    }
}
