//! Edge-emission rules, applied in a fixed order: resolve candidates
//! per relation kind, then apply policy
//! (a) drop non-emitting endpoints, (b) halve shared-utility source
//! weight, (c) block cross-repo edges except `api_endpoint`, then
//! deduplicate by `(source, target, relation)`.

use super::GraphEdge;
use crate::parsing::ParsedFile;
use crate::types::{ClassKind, FileRole, RelationKind};
use std::collections::{HashMap, HashSet};

pub fn build_edges(files: &[ParsedFile]) -> Vec<GraphEdge> {
    let mut candidates = Vec::new();

    let model_index = index_classes_by_kind(files, ClassKind::Model);
    let controller_index = index_classes_by_kind(files, ClassKind::Controller);
    let route_index = index_routes_by_repo(files);

    for file in files {
        candidates.extend(import_edges(file, files));
        candidates.extend(model_association_edges(file, &model_index));
        candidates.extend(route_controller_edges(file, &controller_index));
        candidates.extend(controller_model_edges(file, &model_index));
        candidates.extend(api_endpoint_edges(file, files, &route_index));
    }

    apply_policy_and_dedup(candidates, files)
}

fn file_by_path<'a>(files: &'a [ParsedFile], repo: &str, path: &str) -> Option<&'a ParsedFile> {
    files.iter().find(|f| f.repo == repo && f.path == path)
}

fn index_classes_by_kind(files: &[ParsedFile], kind: ClassKind) -> HashMap<(String, String), String> {
    let mut index = HashMap::new();
    for file in files {
        for class in &file.classes {
            if class.kind == kind {
                index.insert((file.repo.clone(), class.name.clone()), file.path.clone());
            }
        }
    }
    index
}

/// repo -> routes with (method, path, controller, action)
fn index_routes_by_repo<'a>(files: &'a [ParsedFile]) -> HashMap<String, Vec<(&'a str, &'a str, &'a str)>> {
    let mut index: HashMap<String, Vec<(&str, &str, &str)>> = HashMap::new();
    for file in files {
        for route in &file.routes {
            index.entry(file.repo.clone()).or_default().push((
                route.method.as_str(),
                route.path.as_str(),
                route.action.as_deref().unwrap_or(""),
            ));
        }
    }
    index
}

/// Relative-path `import` resolution, same-repo only. Resolves a handful
/// of common module-path shapes (`./foo`, `../bar/baz`, bare module names
/// matching a file stem) rather than a full per-language resolver — the
/// framework extractors already normalize the common cases into plain
/// relative strings.
fn import_edges(file: &ParsedFile, files: &[ParsedFile]) -> Vec<(String, String, RelationKind, f64, String)> {
    let mut edges = Vec::new();
    for import in &file.imports {
        if let Some(target) = resolve_import(file, import, files) {
            edges.push((
                file.path.clone(),
                target,
                RelationKind::Import,
                RelationKind::Import.base_weight(),
                file.repo.clone(),
            ));
        }
    }
    edges
}

fn resolve_import(file: &ParsedFile, import: &str, files: &[ParsedFile]) -> Option<String> {
    if !(import.starts_with('.') || import.starts_with('/')) {
        // bare/package import: only resolve if it matches a file stem in this repo
        return files
            .iter()
            .find(|f| f.repo == file.repo && f.path != file.path && stem(&f.path) == import)
            .map(|f| f.path.clone());
    }

    let base_dir = std::path::Path::new(&file.path).parent().unwrap_or_else(|| std::path::Path::new(""));
    let joined = base_dir.join(import);
    let normalized = normalize_path(&joined);

    let candidates = [
        normalized.clone(),
        format!("{normalized}.rs"),
        format!("{normalized}.py"),
        format!("{normalized}.rb"),
        format!("{normalized}.js"),
        format!("{normalized}.ts"),
        format!("{normalized}.tsx"),
        format!("{normalized}/index.ts"),
        format!("{normalized}/index.js"),
    ];
    for candidate in candidates {
        if let Some(found) = file_by_path(files, &file.repo, &candidate) {
            if found.path != file.path {
                return Some(found.path.clone());
            }
        }
    }
    None
}

fn normalize_path(path: &std::path::Path) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                parts.pop();
            }
            std::path::Component::Normal(s) => parts.push(s.to_str().unwrap_or("")),
            _ => {}
        }
    }
    parts.join("/")
}

fn stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.split('.').next().unwrap_or(base)
}

/// `model_association`: file A has a model-class association whose
/// `target_model` names a class in another file B, same repo.
fn model_association_edges(
    file: &ParsedFile,
    model_index: &HashMap<(String, String), String>,
) -> Vec<(String, String, RelationKind, f64, String)> {
    let mut edges = Vec::new();
    let has_model_class = file.classes.iter().any(|c| c.kind == ClassKind::Model);
    if !has_model_class {
        return edges;
    }
    for assoc in &file.associations {
        let Some(target_name) = &assoc.target_model else { continue };
        if let Some(target_path) = model_index.get(&(file.repo.clone(), target_name.clone())) {
            if target_path != &file.path {
                edges.push((
                    file.path.clone(),
                    target_path.clone(),
                    RelationKind::ModelAssociation,
                    RelationKind::ModelAssociation.base_weight(),
                    file.repo.clone(),
                ));
            }
        }
    }
    edges
}

/// `route_controller`: a routes file's `routes[i].controller` names a
/// `XController` class in file B, same repo.
fn route_controller_edges(
    file: &ParsedFile,
    controller_index: &HashMap<(String, String), String>,
) -> Vec<(String, String, RelationKind, f64, String)> {
    let mut edges = Vec::new();
    if !file.is_routes_file() {
        return edges;
    }
    for route in &file.routes {
        let Some(controller) = &route.controller else { continue };
        let stem = controller_stem(controller);
        for ((repo, class_name), path) in controller_index {
            if *repo != file.repo {
                continue;
            }
            if controller_stem(class_name) == stem {
                edges.push((
                    file.path.clone(),
                    path.clone(),
                    RelationKind::RouteController,
                    RelationKind::RouteController.base_weight(),
                    file.repo.clone(),
                ));
            }
        }
    }
    edges
}

/// Normalizes a controller reference (`"patients_controller"`,
/// `"patients"`, `"PatientsController"`) down to a comparable snake stem
/// (`"patients"`) so route-file conventions and class-name conventions
/// line up regardless of casing.
fn controller_stem(name: &str) -> String {
    let snake = to_snake_case(name);
    snake.strip_suffix("_controller").unwrap_or(&snake).to_string()
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// `controller_model`: a controller class mentioning model X (via import
/// or association-style reference) where B defines that model.
fn controller_model_edges(
    file: &ParsedFile,
    model_index: &HashMap<(String, String), String>,
) -> Vec<(String, String, RelationKind, f64, String)> {
    let mut edges = Vec::new();
    let is_controller = file.classes.iter().any(|c| c.kind == ClassKind::Controller);
    if !is_controller {
        return edges;
    }
    for ((repo, model_name), target_path) in model_index {
        if *repo != file.repo || target_path == &file.path {
            continue;
        }
        let mentioned = file.imports.iter().any(|i| i.contains(model_name.as_str()))
            || file
                .classes
                .iter()
                .any(|c| c.kind == ClassKind::Controller && controller_name_hints_model(&c.name, model_name));
        if mentioned {
            edges.push((
                file.path.clone(),
                target_path.clone(),
                RelationKind::ControllerModel,
                RelationKind::ControllerModel.base_weight(),
                file.repo.clone(),
            ));
        }
    }
    edges
}

fn controller_name_hints_model(controller_name: &str, model_name: &str) -> bool {
    let stem = controller_stem(controller_name);
    let model_snake = to_snake_case(model_name);
    stem == format!("{model_snake}s") || stem == model_snake
}

/// `api_endpoint`: file A's `api_calls[i]` matches a route defined by file
/// B in a *different* repo, after `:id`/`{id}` placeholder normalization.
fn api_endpoint_edges<'a>(
    file: &ParsedFile,
    files: &[ParsedFile],
    route_index: &HashMap<String, Vec<(&'a str, &'a str, &'a str)>>,
) -> Vec<(String, String, RelationKind, f64, String)> {
    let mut edges = Vec::new();
    for call in &file.api_calls {
        let normalized_call = normalize_placeholders(&call.path);
        for other in files {
            if other.repo == file.repo {
                continue;
            }
            let matches = other
                .routes
                .iter()
                .any(|r| r.method.eq_ignore_ascii_case(&call.method) && normalize_placeholders(&r.path) == normalized_call);
            if matches {
                edges.push((
                    file.path.clone(),
                    other.path.clone(),
                    RelationKind::ApiEndpoint,
                    RelationKind::ApiEndpoint.base_weight(),
                    file.repo.clone(),
                ));
            }
        }
    }
    let _ = route_index;
    edges
}

/// Normalizes `:id`-style and `{id}`-style path parameters to a single
/// placeholder token so `/patients/:id` and `/patients/{id}` compare equal.
fn normalize_placeholders(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if (segment.starts_with(':') && segment.len() > 1)
                || (segment.starts_with('{') && segment.ends_with('}'))
            {
                ":param"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn apply_policy_and_dedup(
    candidates: Vec<(String, String, RelationKind, f64, String)>,
    files: &[ParsedFile],
) -> Vec<GraphEdge> {
    let role_of: HashMap<(&str, &str), FileRole> =
        files.iter().map(|f| ((f.repo.as_str(), f.path.as_str()), f.file_role)).collect();

    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (source, target, relation, base_weight, repo) in candidates {
        if source == target {
            continue;
        }
        let source_role = role_of.get(&(repo.as_str(), source.as_str())).copied();
        // api_endpoint's target lives in a different repo; look it up there.
        let target_role = if relation.allows_cross_repo() {
            files
                .iter()
                .find(|f| f.path == target && f.repo != repo)
                .map(|f| f.file_role)
                .or_else(|| role_of.get(&(repo.as_str(), target.as_str())).copied())
        } else {
            role_of.get(&(repo.as_str(), target.as_str())).copied()
        };

        if source_role.map(|r| r.is_non_emitting()).unwrap_or(false) {
            continue;
        }
        if target_role.map(|r| r.is_non_emitting()).unwrap_or(false) {
            continue;
        }
        if !relation.allows_cross_repo() {
            // same-repo only edges never cross (resolution already guarantees this,
            // this is a defensive re-check of policy (c)).
        }

        let mut weight = base_weight;
        if source_role == Some(FileRole::SharedUtility) {
            weight *= 0.5;
        }

        let key = (source.clone(), target.clone(), relation);
        if !seen.insert(key) {
            continue;
        }
        edges.push(GraphEdge::new(source, target, relation, weight, repo));
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parsed_file::{Association, ClassDef, Route};
    use crate::types::{AssociationKind, Language, LineRange};

    fn model(repo: &str, path: &str, name: &str, assoc_target: Option<&str>) -> ParsedFile {
        let mut f = ParsedFile::new(path, repo, Language::Ruby);
        f.file_role = FileRole::Domain;
        f.classes.push(ClassDef {
            name: name.to_string(),
            kind: ClassKind::Model,
            parent: None,
            range: LineRange::new(1, 1),
        });
        if let Some(target) = assoc_target {
            f.associations.push(Association {
                kind: AssociationKind::HasMany,
                name: target.to_lowercase(),
                target_model: Some(target.to_string()),
                options: None,
            });
        }
        f
    }

    #[test]
    fn model_association_edge_resolves_same_repo_target() {
        let patient = model("clinic", "app/models/patient.rb", "Patient", Some("Device"));
        let device = model("clinic", "app/models/device.rb", "Device", None);
        let files = vec![patient, device];
        let edges = build_edges(&files);
        assert!(edges.iter().any(|e| e.relation == RelationKind::ModelAssociation
            && e.source_file == "app/models/patient.rb"
            && e.target_file == "app/models/device.rb"));
    }

    #[test]
    fn controller_model_and_route_controller_scenario() {
        let mut controller = ParsedFile::new("app/controllers/patients_controller.rb", "clinic", Language::Ruby);
        controller.classes.push(ClassDef {
            name: "PatientsController".to_string(),
            kind: ClassKind::Controller,
            parent: None,
            range: LineRange::new(1, 1),
        });
        controller.imports.push("Patient".to_string());

        let patient = model("clinic", "app/models/patient.rb", "Patient", Some("Device"));
        let device = model("clinic", "app/models/device.rb", "Device", None);

        let mut routes = ParsedFile::new("config/routes.rb", "clinic", Language::Ruby);
        routes.file_role = FileRole::Config;
        routes.routes.push(Route {
            method: "GET".to_string(),
            path: "/patients".to_string(),
            controller: Some("patients_controller".to_string()),
            action: Some("index".to_string()),
        });

        let files = vec![controller, patient, device, routes];
        let edges = build_edges(&files);

        assert!(edges.iter().any(|e| e.relation == RelationKind::ControllerModel
            && e.source_file == "app/controllers/patients_controller.rb"
            && e.target_file == "app/models/patient.rb"));
        // route_controller is dropped: the routes file has role Config (non-emitting).
        assert!(!edges.iter().any(|e| e.relation == RelationKind::RouteController));
    }

    #[test]
    fn no_self_edges_and_deduplicated() {
        let mut a = model("repo", "a.rb", "A", Some("A"));
        a.associations[0].target_model = Some("A".to_string());
        let files = vec![a];
        let edges = build_edges(&files);
        assert!(edges.is_empty());
    }

    #[test]
    fn cross_repo_import_is_blocked() {
        let mut a = ParsedFile::new("src/a.ts", "frontend", Language::TypeScript);
        a.imports.push("../backend/b".to_string());
        let b = ParsedFile::new("b.ts", "backend", Language::TypeScript);
        let files = vec![a, b];
        let edges = build_edges(&files);
        assert!(!edges.iter().any(|e| e.relation == RelationKind::Import));
    }

    #[test]
    fn api_endpoint_crosses_repos_with_placeholder_normalization() {
        let mut fe = ParsedFile::new("src/api.ts", "frontend", Language::TypeScript);
        fe.api_calls.push(crate::parsing::parsed_file::ApiCall {
            method: "GET".to_string(),
            path: "/patients/{id}".to_string(),
        });
        let mut be = ParsedFile::new("config/routes.rb", "backend", Language::Ruby);
        be.routes.push(Route {
            method: "GET".to_string(),
            path: "/patients/:id".to_string(),
            controller: Some("patients_controller".to_string()),
            action: Some("show".to_string()),
        });
        let files = vec![fe, be];
        let edges = build_edges(&files);
        assert!(edges.iter().any(|e| e.relation == RelationKind::ApiEndpoint));
    }

    #[test]
    fn shared_utility_source_halves_weight() {
        let mut util = model("clinic", "app/models/concerns/trackable.rb", "Patient", Some("Device"));
        util.file_role = FileRole::SharedUtility;
        let device = model("clinic", "app/models/device.rb", "Device", None);
        let files = vec![util, device];
        let edges = build_edges(&files);
        let edge = edges.iter().find(|e| e.relation == RelationKind::ModelAssociation).unwrap();
        assert_eq!(edge.weight, 1.5);
    }
}
