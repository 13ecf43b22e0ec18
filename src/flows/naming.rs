//! Flow naming (spec.md §4.4, "Naming"): dominant model class name, else
//! first recognized path segment, else most-common basename stem —
//! lowercased and kebab-cased.

use crate::parsing::ParsedFile;
use crate::types::ClassKind;
use std::collections::HashMap;

const RECOGNIZED_SEGMENTS: [&str; 4] = ["/models/", "/controllers/", "/components/", "/api/"];

pub fn name_community(files: &[&ParsedFile], community: &[String]) -> String {
    if let Some(name) = dominant_model_name(files, community) {
        return kebab_case(&name);
    }
    if let Some(name) = first_recognized_segment_name(community) {
        return kebab_case(&name);
    }
    kebab_case(&most_common_basename_stem(community))
}

fn dominant_model_name(files: &[&ParsedFile], community: &[String]) -> Option<String> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for file in files {
        if !community.contains(&file.path) {
            continue;
        }
        for class in &file.classes {
            if class.kind == ClassKind::Model {
                *counts.entry(class.name.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(name, _)| name)
}

fn first_recognized_segment_name(community: &[String]) -> Option<String> {
    let mut sorted = community.to_vec();
    sorted.sort();
    for segment in RECOGNIZED_SEGMENTS {
        if let Some(path) = sorted.iter().find(|p| p.contains(segment)) {
            return Some(basename_stem(path));
        }
    }
    None
}

fn most_common_basename_stem(community: &[String]) -> String {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for path in community {
        *counts.entry(basename_stem(path)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(name, _)| name)
        .unwrap_or_else(|| "flow".to_string())
}

fn basename_stem(path: &str) -> String {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.split('.').next().unwrap_or(base).to_string()
}

/// `PascalCase`/`snake_case`/mixed -> `kebab-case`, lowercased.
fn kebab_case(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch == '_' || ch == ' ' {
            out.push('-');
        } else if ch.is_uppercase() {
            if i != 0 && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parsed_file::ClassDef;
    use crate::types::{FileRole, Language, LineRange};

    fn model_file(path: &str, class_name: &str) -> ParsedFile {
        let mut f = ParsedFile::new(path, "clinic", Language::Ruby);
        f.file_role = FileRole::Domain;
        f.classes.push(ClassDef {
            name: class_name.to_string(),
            kind: ClassKind::Model,
            parent: None,
            range: LineRange::new(1, 1),
        });
        f
    }

    #[test]
    fn names_after_dominant_model_class() {
        let patient = model_file("app/models/patient.rb", "Patient");
        let controller = ParsedFile::new("app/controllers/patients_controller.rb", "clinic", Language::Ruby);
        let files = vec![&patient, &controller];
        let community = vec![patient.path.clone(), controller.path.clone()];
        assert_eq!(name_community(&files, &community), "patient");
    }

    #[test]
    fn falls_back_to_path_segment() {
        let a = ParsedFile::new("app/components/widget.tsx", "web", Language::TypeScript);
        let files = vec![&a];
        let community = vec![a.path.clone()];
        assert_eq!(name_community(&files, &community), "widget");
    }

    #[test]
    fn falls_back_to_basename_stem() {
        let a = ParsedFile::new("lib/foo_helper.rb", "clinic", Language::Ruby);
        let b = ParsedFile::new("lib/foo_helper_v2.rb", "clinic", Language::Ruby);
        let files = vec![&a, &b];
        let community = vec![a.path.clone(), b.path.clone()];
        // neither matches a recognized segment or has a model class
        assert!(!name_community(&files, &community).is_empty());
    }

    #[test]
    fn kebab_cases_pascal_names() {
        assert_eq!(kebab_case("PatientRecord"), "patient-record");
        assert_eq!(kebab_case("patient_record"), "patient-record");
    }
}
