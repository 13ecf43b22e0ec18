//! Wires the flow detector, parsed files, and graph edges into concrete
//! `CardContent` inputs: one card per flow/hub, one per qualifying
//! model, one per cross-service edge cluster. This is the function the
//! orchestrator calls per repo set; `generate_card` stays a pure
//! per-card primitive.

use super::generator::{generate_card, GenerationOptions};
use super::tags::compute_tags;
use super::templates::{ApiContract, CardContent, CardVariant, SourceRef, clip_snippet};
use super::{Card, MIN_MODEL_ASSOCIATIONS};
use crate::flows::Flow;
use crate::graph::GraphEdge;
use crate::parsing::ParsedFile;
use crate::types::{ClassKind, FileRole, RelationKind};
use std::collections::{BTreeMap, HashMap};

const MAX_SNIPPET_LINES: usize = 150;

pub struct AssembleInputs<'a> {
    pub flows: &'a [Flow],
    pub files: &'a [ParsedFile],
    pub edges: &'a [GraphEdge],
    pub sources: &'a HashMap<String, String>,
}

pub fn build_cards(inputs: &AssembleInputs, opts: &GenerationOptions) -> Vec<Card> {
    let mut cards = Vec::new();

    for flow in inputs.flows {
        if flow.is_hub {
            cards.push(build_hub_card(flow, inputs, opts));
        } else {
            cards.push(build_flow_card(flow, inputs, opts));
        }
    }

    cards.extend(build_model_cards(inputs, opts));
    cards.extend(build_cross_service_cards(inputs, opts));

    cards
}

fn files_in<'a>(inputs: &AssembleInputs<'a>, paths: &[String]) -> Vec<&'a ParsedFile> {
    inputs.files.iter().filter(|f| paths.contains(&f.path)).collect()
}

fn sources_for(inputs: &AssembleInputs, files: &[&ParsedFile]) -> Vec<SourceRef> {
    files
        .iter()
        .filter(|f| f.file_role != FileRole::EntryPoint)
        .map(|f| SourceRef {
            path: f.path.clone(),
            repo: f.repo.clone(),
            snippet: inputs.sources.get(&f.path).map(|s| clip_snippet(s, MAX_SNIPPET_LINES)),
        })
        .collect()
}

fn identifiers_for(files: &[&ParsedFile]) -> String {
    let mut tokens = Vec::new();
    for file in files {
        for class in &file.classes {
            tokens.push(class.name.clone());
        }
        for route in &file.routes {
            tokens.push(format!("{} {}", route.method, route.path));
        }
    }
    tokens.join(" ")
}

fn repos_for(files: &[&ParsedFile]) -> Vec<String> {
    let mut repos: Vec<String> = files.iter().map(|f| f.repo.clone()).collect();
    repos.sort();
    repos.dedup();
    repos
}

fn build_flow_card(flow: &Flow, inputs: &AssembleInputs, opts: &GenerationOptions) -> Card {
    let files = files_in(inputs, &flow.files);
    let sources = sources_for(inputs, &files);
    let source_files: Vec<String> = sources.iter().map(|s| s.path.clone()).collect();
    let relationships = relationships_within(flow, inputs.edges);

    let content = CardContent {
        title: format!("{} flow", flow.name),
        summary: format!(
            "Logical subsystem spanning {} file(s) across {} repo(s).",
            flow.files.len(),
            flow.repos.len()
        ),
        sources,
        relationships,
        api_contracts: vec![],
        variant: CardVariant::Flow { flow_name: flow.name.clone() },
    };

    generate_card(
        content,
        &flow.name,
        identifiers_for(&files),
        compute_tags(&files),
        source_files,
        repos_for(&files),
        opts,
    )
}

fn build_hub_card(flow: &Flow, inputs: &AssembleInputs, opts: &GenerationOptions) -> Card {
    let files = files_in(inputs, &flow.files);
    let hub_path = flow.files.first().cloned().unwrap_or_default();

    let connected_flows: Vec<String> = inputs
        .flows
        .iter()
        .filter(|other| !other.is_hub)
        .filter(|other| {
            inputs
                .edges
                .iter()
                .any(|e| (e.source_file == hub_path && other.files.contains(&e.target_file)) || (e.target_file == hub_path && other.files.contains(&e.source_file)))
        })
        .map(|f| f.name.clone())
        .collect();

    let sources = sources_for(inputs, &files);
    let source_files: Vec<String> = sources.iter().map(|s| s.path.clone()).collect();

    let content = CardContent {
        title: format!("{} hub", flow.name),
        summary: format!("`{hub_path}` is referenced heavily enough to warrant its own card."),
        sources,
        relationships: vec![],
        api_contracts: vec![],
        variant: CardVariant::Hub { flow_name: flow.name.clone(), connected_flows },
    };

    generate_card(
        content,
        &flow.name,
        identifiers_for(&files),
        compute_tags(&files),
        source_files,
        repos_for(&files),
        opts,
    )
}

fn relationships_within(flow: &Flow, edges: &[GraphEdge]) -> Vec<super::templates::Relationship> {
    let file_set: std::collections::HashSet<&str> = flow.files.iter().map(|s| s.as_str()).collect();
    edges
        .iter()
        .filter(|e| file_set.contains(e.source_file.as_str()) && file_set.contains(e.target_file.as_str()))
        .map(|e| super::templates::Relationship {
            description: format!("`{}` --{}--> `{}`", e.source_file, e.relation, e.target_file),
        })
        .collect()
}

/// Model cards: one per model class with `>= MIN_MODEL_ASSOCIATIONS`
/// associations.
fn build_model_cards(inputs: &AssembleInputs, opts: &GenerationOptions) -> Vec<Card> {
    let mut cards = Vec::new();
    for file in inputs.files {
        for class in &file.classes {
            if class.kind != ClassKind::Model {
                continue;
            }
            if file.associations.len() < MIN_MODEL_ASSOCIATIONS {
                continue;
            }
            let files = vec![file];
            let sources = sources_for(inputs, &files);
            let source_files: Vec<String> = sources.iter().map(|s| s.path.clone()).collect();
            let flow_name = inputs
                .flows
                .iter()
                .find(|f| f.files.contains(&file.path))
                .map(|f| f.name.clone())
                .unwrap_or_else(|| class.name.to_ascii_lowercase());

            let content = CardContent {
                title: format!("{} model", class.name),
                summary: format!("`{}` has {} association(s).", class.name, file.associations.len()),
                sources,
                relationships: file
                    .associations
                    .iter()
                    .map(|a| super::templates::Relationship {
                        description: format!(
                            "{:?} {} -> {}",
                            a.kind,
                            a.name,
                            a.target_model.as_deref().unwrap_or("?")
                        ),
                    })
                    .collect(),
                api_contracts: vec![],
                variant: CardVariant::Model { model_name: class.name.clone(), association_count: file.associations.len() },
            };

            cards.push(generate_card(
                content,
                &flow_name,
                identifiers_for(&files),
                compute_tags(&files),
                source_files,
                repos_for(&files),
                opts,
            ));
        }
    }
    cards
}

/// Cross-service cards: one per `(fe_file, be_file)` cluster of
/// `api_endpoint` edges.
fn build_cross_service_cards(inputs: &AssembleInputs, opts: &GenerationOptions) -> Vec<Card> {
    let mut clusters: BTreeMap<(String, String), Vec<&GraphEdge>> = BTreeMap::new();
    for edge in inputs.edges {
        if edge.relation == RelationKind::ApiEndpoint {
            clusters.entry((edge.source_file.clone(), edge.target_file.clone())).or_default().push(edge);
        }
    }

    clusters
        .into_iter()
        .map(|((fe_file, be_file), edges)| {
            let fe = inputs.files.iter().find(|f| f.path == fe_file);
            let be = inputs.files.iter().find(|f| f.path == be_file);
            let files: Vec<&ParsedFile> = [fe, be].into_iter().flatten().collect();
            let sources = sources_for(inputs, &files);
            let source_files: Vec<String> = sources.iter().map(|s| s.path.clone()).collect();

            let api_contracts: Vec<ApiContract> = fe
                .map(|f| {
                    f.api_calls
                        .iter()
                        .map(|c| ApiContract { method: c.method.clone(), path: c.path.clone(), description: format!("served by {be_file}") })
                        .collect()
                })
                .unwrap_or_default();

            let flow_name = inputs
                .flows
                .iter()
                .find(|flow| flow.files.contains(&fe_file) || flow.files.contains(&be_file))
                .map(|f| f.name.clone())
                .unwrap_or_else(|| "cross-service".to_string());

            let content = CardContent {
                title: format!("{fe_file} <-> {be_file}"),
                summary: format!("{} API call(s) cross the repo boundary here.", edges.len()),
                sources,
                relationships: vec![],
                api_contracts,
                variant: CardVariant::CrossService { fe_file: fe_file.clone(), be_file: be_file.clone() },
            };

            generate_card(
                content,
                &flow_name,
                identifiers_for(&files),
                compute_tags(&files),
                source_files,
                repos_for(&files),
                opts,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parsed_file::{Association, ClassDef};
    use crate::types::{AssociationKind, Language, LineRange};

    fn model_with_associations(path: &str, name: &str, n: usize) -> ParsedFile {
        let mut f = ParsedFile::new(path, "clinic", Language::Ruby);
        f.file_role = FileRole::Domain;
        f.classes.push(ClassDef { name: name.to_string(), kind: ClassKind::Model, parent: None, range: LineRange::new(1, 1) });
        for i in 0..n {
            f.associations.push(Association { kind: AssociationKind::HasMany, name: format!("assoc_{i}"), target_model: None, options: None });
        }
        f
    }

    #[test]
    fn model_card_requires_minimum_associations() {
        let rich = model_with_associations("a.rb", "Patient", 2);
        let poor = model_with_associations("b.rb", "Device", 1);
        let files = vec![rich, poor];
        let sources = HashMap::new();
        let inputs = AssembleInputs { flows: &[], files: &files, edges: &[], sources: &sources };
        let opts = GenerationOptions { text_generator: None, now: 0 };
        let cards = build_model_cards(&inputs, &opts);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Patient model");
    }
}
