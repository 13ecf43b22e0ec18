//! C4 — flow detector (spec.md §4.4). Partitions the weighted file graph
//! into logical "flows": Louvain communities of >= 3 files, plus one-file
//! "hub" flows flagged by PageRank over high-signal edges. Pure function
//! over `(&[ParsedFile], &[GraphEdge])` in, `Vec<Flow>` out — no I/O, so
//! the concrete scenarios in spec.md §8 are plain unit tests.

pub mod dedup;
pub mod louvain;
pub mod naming;
pub mod pagerank;

use crate::config::FlowConfig;
use crate::graph::GraphEdge;
use crate::parsing::ParsedFile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A logical subsystem (spec.md §3, `Flow`). `files.len() >= 3` unless
/// `is_hub`, in which case it holds exactly one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flow {
    pub name: String,
    pub files: Vec<String>,
    pub repos: Vec<String>,
    pub edge_count: u32,
    pub is_hub: bool,
}

const MIN_COMMUNITY_SIZE: usize = 3;

pub fn detect_flows(files: &[ParsedFile], edges: &[GraphEdge], config: &FlowConfig) -> Vec<Flow> {
    let hubs = pagerank::detect_hubs(edges, config);
    let hub_set: HashSet<String> = hubs.iter().cloned().collect();

    let undirected_pairs: Vec<(String, String, f64)> =
        edges.iter().map(|e| (e.source_file.clone(), e.target_file.clone(), e.weight)).collect();

    let communities = louvain::detect_communities(&undirected_pairs, &hubs, config.louvain_seed);
    let kept_communities: Vec<Vec<String>> = communities.into_iter().filter(|c| c.len() >= MIN_COMMUNITY_SIZE).collect();

    let file_refs: Vec<&ParsedFile> = files.iter().collect();

    let mut community_flows: Vec<Flow> = kept_communities
        .iter()
        .map(|community| {
            let name = naming::name_community(&file_refs, community);
            let file_set: HashSet<&str> = community.iter().map(|s| s.as_str()).collect();
            let edge_count = edges
                .iter()
                .filter(|e| file_set.contains(e.source_file.as_str()) && file_set.contains(e.target_file.as_str()))
                .count() as u32;
            let repos = repos_for(files, community);
            Flow {
                name,
                files: community.clone(),
                repos,
                edge_count,
                is_hub: false,
            }
        })
        .collect();

    // spec.md §4.4 sort: descending edge count, ties by node count, then
    // smallest file path.
    community_flows.sort_by(|a, b| {
        b.edge_count
            .cmp(&a.edge_count)
            .then_with(|| b.files.len().cmp(&a.files.len()))
            .then_with(|| a.files.iter().min().cmp(&b.files.iter().min()))
    });

    let names = dedup::dedup_names(community_flows.iter().map(|f| f.name.clone()).collect());
    for (flow, name) in community_flows.iter_mut().zip(names) {
        flow.name = name;
    }

    let mut hub_paths: Vec<String> = hub_set.into_iter().collect();
    hub_paths.sort();
    let hub_flows: Vec<Flow> = hub_paths
        .into_iter()
        .map(|path| {
            let name = kebab_hub_name(&path);
            let repos = repos_for(files, std::slice::from_ref(&path));
            let edge_count = edges.iter().filter(|e| e.source_file == path || e.target_file == path).count() as u32;
            Flow {
                name,
                files: vec![path],
                repos,
                edge_count,
                is_hub: true,
            }
        })
        .collect();

    let hub_names = dedup::dedup_names(hub_flows.iter().map(|f| f.name.clone()).collect());
    let mut hub_flows = hub_flows;
    for (flow, name) in hub_flows.iter_mut().zip(hub_names) {
        flow.name = name;
    }

    let mut result = hub_flows;
    result.extend(community_flows);
    result
}

fn kebab_hub_name(path: &str) -> String {
    let base = path.rsplit('/').next().unwrap_or(path);
    let stem = base.split('.').next().unwrap_or(base);
    stem.replace('_', "-").to_lowercase()
}

fn repos_for(files: &[ParsedFile], paths: &[String]) -> Vec<String> {
    let mut repos: Vec<String> = files
        .iter()
        .filter(|f| paths.contains(&f.path))
        .map(|f| f.repo.clone())
        .collect();
    repos.sort();
    repos.dedup();
    repos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parsed_file::{Association, ClassDef};
    use crate::types::{AssociationKind, ClassKind, FileRole, Language, LineRange, RelationKind};

    fn model(path: &str, name: &str) -> ParsedFile {
        let mut f = ParsedFile::new(path, "clinic", Language::Ruby);
        f.file_role = FileRole::Domain;
        f.classes.push(ClassDef { name: name.to_string(), kind: ClassKind::Model, parent: None, range: LineRange::new(1, 1) });
        f
    }

    #[test]
    fn scenario_flow_naming() {
        let mut patient = model("app/models/patient.rb", "Patient");
        patient.associations.push(Association {
            kind: AssociationKind::HasMany,
            name: "devices".to_string(),
            target_model: Some("Device".to_string()),
            options: None,
        });
        let device = model("app/models/device.rb", "Device");
        let mut controller = ParsedFile::new("app/controllers/patients_controller.rb", "clinic", Language::Ruby);
        controller.classes.push(ClassDef {
            name: "PatientsController".to_string(),
            kind: ClassKind::Controller,
            parent: None,
            range: LineRange::new(1, 1),
        });

        let files = vec![patient, controller, device];
        let edges = vec![
            GraphEdge::new("app/controllers/patients_controller.rb", "app/models/patient.rb", RelationKind::ControllerModel, 3.0, "clinic"),
            GraphEdge::new("app/models/patient.rb", "app/models/device.rb", RelationKind::ModelAssociation, 2.0, "clinic"),
            GraphEdge::new("app/controllers/patients_controller.rb", "app/models/device.rb", RelationKind::ControllerModel, 2.0, "clinic"),
        ];
        let config = FlowConfig::default();
        let flows = detect_flows(&files, &edges, &config);

        let community = flows.iter().find(|f| !f.is_hub).expect("one community flow");
        assert_eq!(community.name, "patient");
        assert_eq!(community.files.len(), 3);
        assert!(!community.is_hub);
    }

    #[test]
    fn scenario_hub_detection() {
        let mut files = Vec::new();
        let mut edges = Vec::new();
        for i in 0..9 {
            let path = format!("app/models/file_{i}.rb");
            files.push(model(&path, &format!("File{i}")));
            edges.push(GraphEdge::new(path, "app/models/user.rb", RelationKind::ModelAssociation, 3.0, "clinic"));
        }
        files.push(model("app/models/user.rb", "User"));
        let config = FlowConfig::default();
        let flows = detect_flows(&files, &edges, &config);

        let hub = flows.iter().find(|f| f.is_hub).expect("a hub flow");
        assert_eq!(hub.files, vec!["app/models/user.rb".to_string()]);
    }
}
