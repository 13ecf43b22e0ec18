//! Django conventions: model fields as associations/foreign keys, view
//! class kinds, and `urls.py` route declarations.

use crate::parsing::parsed_file::{Association, ParsedFile, Route};
use crate::types::{AssociationKind, ClassKind};
use regex::Regex;
use std::sync::LazyLock;

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(\w+)\s*=\s*models\.(ForeignKey|ManyToManyField|OneToOneField)\(\s*['"]?(\w+)['"]?"#).unwrap()
});

static URLPATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)path\(\s*["']([^"']*)["']\s*,\s*([\w.]+)"#).unwrap()
});

pub fn extract(file: &mut ParsedFile, source: &str) {
    classify_classes(file);

    for cap in FIELD_RE.captures_iter(source) {
        let kind = match &cap[2] {
            "ForeignKey" => AssociationKind::ForeignKey,
            "ManyToManyField" => AssociationKind::ManyToManyField,
            _ => AssociationKind::OneToOneField,
        };
        file.associations.push(Association {
            kind,
            name: cap[1].to_string(),
            target_model: Some(cap[3].to_string()),
            options: None,
        });
    }

    if file.path.ends_with("urls.py") {
        for cap in URLPATTERN_RE.captures_iter(source) {
            file.routes.push(Route {
                method: "GET".to_string(),
                path: format!("/{}", cap[1].trim_end_matches('/')),
                controller: Some(cap[2].to_string()),
                action: None,
            });
        }
    }
}

fn classify_classes(file: &mut ParsedFile) {
    let is_views_file = file.path.ends_with("views.py") || file.path.contains("/views/");
    for class in &mut file.classes {
        let parent = class.parent.as_deref().unwrap_or("");
        class.kind = if parent.contains("models.Model") {
            ClassKind::Model
        } else if parent.contains("View") || is_views_file {
            ClassKind::Controller
        } else if parent.contains("Serializer") || class.name.ends_with("Serializer") {
            ClassKind::Serializer
        } else if file.path.contains("/middleware") {
            ClassKind::Middleware
        } else {
            ClassKind::Other
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parsed_file::ClassDef;
    use crate::types::{Language, LineRange};

    #[test]
    fn extracts_foreign_key_association() {
        let mut file = ParsedFile::new("app/models.py", "clinic", Language::Python);
        file.classes.push(ClassDef {
            name: "Device".to_string(),
            kind: ClassKind::Other,
            parent: Some("models.Model".to_string()),
            range: LineRange::new(1, 4),
        });
        extract(&mut file, "class Device(models.Model):\n    owner = models.ForeignKey('Patient')\n");
        assert_eq!(file.classes[0].kind, ClassKind::Model);
        assert_eq!(file.associations[0].kind, AssociationKind::ForeignKey);
        assert_eq!(file.associations[0].target_model.as_deref(), Some("Patient"));
    }
}
