//! Rails conventions: model associations, controller/model class kinds,
//! and `config/routes.rb` route declarations.

use crate::parsing::parsed_file::{Association, ParsedFile, Route};
use crate::types::{AssociationKind, ClassKind};
use regex::Regex;
use std::sync::LazyLock;

static ASSOCIATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(has_many|belongs_to|has_one|has_and_belongs_to_many)\s+:(\w+)(?:.*?class_name:\s*["']?(\w+)["']?)?"#).unwrap()
});

static ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(get|post|put|patch|delete)\s+["']([^"']+)["']\s*,?\s*to:\s*["']([\w/]+)#(\w+)["']"#).unwrap()
});

static RESOURCES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*resources?\s+:(\w+)"#).unwrap());

pub fn extract(file: &mut ParsedFile, source: &str) {
    classify_classes(file);

    for cap in ASSOCIATION_RE.captures_iter(source) {
        let kind = match &cap[1] {
            "has_many" => AssociationKind::HasMany,
            "belongs_to" => AssociationKind::BelongsTo,
            "has_one" => AssociationKind::HasOne,
            _ => AssociationKind::HasAndBelongsToMany,
        };
        let name = cap[2].to_string();
        let target_model = cap
            .get(3)
            .map(|m| m.as_str().to_string())
            .or_else(|| Some(singularize_to_model(&name)));
        file.associations.push(Association {
            kind,
            name,
            target_model,
            options: None,
        });
    }

    if file.is_routes_file() {
        for cap in ROUTE_RE.captures_iter(source) {
            file.routes.push(Route {
                method: cap[1].to_uppercase(),
                path: cap[2].to_string(),
                controller: Some(format!("{}_controller", &cap[3])),
                action: Some(cap[4].to_string()),
            });
        }
        for cap in RESOURCES_RE.captures_iter(source) {
            let resource = &cap[1];
            for (method, action) in [
                ("GET", "index"),
                ("GET", "show"),
                ("POST", "create"),
                ("PUT", "update"),
                ("DELETE", "destroy"),
            ] {
                file.routes.push(Route {
                    method: method.to_string(),
                    path: format!("/{resource}"),
                    controller: Some(format!("{resource}_controller")),
                    action: Some(action.to_string()),
                });
            }
        }
    }
}

fn classify_classes(file: &mut ParsedFile) {
    for class in &mut file.classes {
        let parent = class.parent.as_deref().unwrap_or("");
        class.kind = if parent.contains("ApplicationRecord") || parent.contains("ActiveRecord::Base") {
            ClassKind::Model
        } else if parent.contains("ApplicationController") || parent.ends_with("Controller") {
            ClassKind::Controller
        } else if class.name.ends_with("Job") {
            ClassKind::Job
        } else if class.name.ends_with("Serializer") {
            ClassKind::Serializer
        } else if file.path.contains("/concerns/") {
            ClassKind::Concern
        } else if file.path.contains("/services/") || class.name.ends_with("Service") {
            ClassKind::Service
        } else if file.path.contains("/middleware/") {
            ClassKind::Middleware
        } else {
            ClassKind::Other
        };
    }
}

/// Best-effort singular PascalCase guess from an association name, used
/// only when Rails' implicit `class_name:` convention applies (no explicit
/// override present in the source).
fn singularize_to_model(assoc_name: &str) -> String {
    let singular = assoc_name.strip_suffix('s').unwrap_or(assoc_name);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
