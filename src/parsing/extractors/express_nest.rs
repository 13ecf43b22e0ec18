//! Express/Nest conventions on the backend (route decorators, service/
//! controller class kinds) and outbound `fetch`/`axios` calls on the
//! frontend, which the graph builder turns into `api_endpoint` edges.

use crate::parsing::parsed_file::{ApiCall, ParsedFile, Route};
use crate::types::ClassKind;
use regex::Regex;
use std::sync::LazyLock;

static EXPRESS_ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)\.(get|post|put|patch|delete)\(\s*["']([^"']+)["']"#).unwrap()
});

static NEST_CONTROLLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@Controller\(\s*["']?([^"')]*)["']?\s*\)"#).unwrap());

static NEST_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@(Get|Post|Put|Patch|Delete)\(\s*["']?([^"')]*)["']?\s*\)"#).unwrap());

static FETCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"fetch\(\s*["']([^"']+)["']"#).unwrap());

static AXIOS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"axios\.(get|post|put|patch|delete)\(\s*["']([^"']+)["']"#).unwrap()
});

pub fn extract(file: &mut ParsedFile, source: &str) {
    classify_classes(file, source);

    if let Some(prefix_cap) = NEST_CONTROLLER_RE.captures(source) {
        let prefix = prefix_cap[1].trim_matches('/');
        for cap in NEST_METHOD_RE.captures_iter(source) {
            let sub = cap[2].trim_matches('/');
            let path = if sub.is_empty() {
                format!("/{prefix}")
            } else {
                format!("/{prefix}/{sub}")
            };
            file.routes.push(Route {
                method: cap[1].to_uppercase(),
                path,
                controller: file.classes.first().map(|c| c.name.clone()),
                action: None,
            });
        }
    } else {
        for cap in EXPRESS_ROUTE_RE.captures_iter(source) {
            file.routes.push(Route {
                method: cap[1].to_uppercase(),
                path: cap[2].to_string(),
                controller: None,
                action: None,
            });
        }
    }

    for cap in FETCH_RE.captures_iter(source) {
        file.api_calls.push(ApiCall {
            method: "GET".to_string(),
            path: cap[1].to_string(),
        });
    }
    for cap in AXIOS_RE.captures_iter(source) {
        file.api_calls.push(ApiCall {
            method: cap[1].to_uppercase(),
            path: cap[2].to_string(),
        });
    }
}

fn classify_classes(file: &mut ParsedFile, source: &str) {
    for class in &mut file.classes {
        class.kind = if source.contains("@Injectable") && class.name.ends_with("Service") {
            ClassKind::Service
        } else if source.contains("@Controller") || class.name.ends_with("Controller") {
            ClassKind::Controller
        } else if class.parent.as_deref().unwrap_or("").contains("Schema")
            || class.parent.as_deref().unwrap_or("").contains("Model")
        {
            ClassKind::Model
        } else if class.name.ends_with("Middleware") {
            ClassKind::Middleware
        } else if class.name.ends_with("Component") || file.path.ends_with(".vue") {
            ClassKind::Component
        } else {
            ClassKind::Other
        };
    }
}
