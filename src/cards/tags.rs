//! Tag computation: repos ∪ languages ∪ path-pattern class tags ∪
//! frontend/backend repo-name heuristic ∪ file role, deduplicated.

use crate::parsing::ParsedFile;
use std::collections::BTreeSet;

const PATH_PATTERN_TAGS: [(&str, &str); 6] = [
    ("/models/", "model"),
    ("/controllers/", "controller"),
    ("/components/", "component"),
    ("/services/", "service"),
    ("/jobs/", "job"),
    ("/middleware/", "middleware"),
];

const FRONTEND_HINTS: [&str; 4] = ["frontend", "web", "client", "ui"];
const BACKEND_HINTS: [&str; 4] = ["backend", "api", "server", "service"];

pub fn compute_tags(files: &[&ParsedFile]) -> Vec<String> {
    let mut tags: BTreeSet<String> = BTreeSet::new();

    for file in files {
        tags.insert(file.repo.clone());
        tags.insert(file.language.name().to_string());
        tags.insert(role_tag(file.file_role).to_string());

        for (pattern, tag) in PATH_PATTERN_TAGS {
            if file.path.contains(pattern) {
                tags.insert(tag.to_string());
            }
        }

        let repo_lower = file.repo.to_ascii_lowercase();
        if FRONTEND_HINTS.iter().any(|hint| repo_lower.contains(hint)) {
            tags.insert("frontend".to_string());
        }
        if BACKEND_HINTS.iter().any(|hint| repo_lower.contains(hint)) {
            tags.insert("backend".to_string());
        }
    }

    tags.into_iter().collect()
}

fn role_tag(role: crate::types::FileRole) -> &'static str {
    use crate::types::FileRole::*;
    match role {
        Domain => "domain",
        SharedUtility => "shared_utility",
        Test => "test",
        Config => "config",
        EntryPoint => "entry_point",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileRole, Language};

    #[test]
    fn tags_are_deduplicated_and_cover_sources() {
        let mut a = ParsedFile::new("app/models/patient.rb", "clinic-backend", Language::Ruby);
        a.file_role = FileRole::Domain;
        let mut b = ParsedFile::new("app/models/device.rb", "clinic-backend", Language::Ruby);
        b.file_role = FileRole::Domain;
        let files = vec![&a, &b];
        let tags = compute_tags(&files);
        assert!(tags.contains(&"clinic-backend".to_string()));
        assert!(tags.contains(&"ruby".to_string()));
        assert!(tags.contains(&"model".to_string()));
        assert!(tags.contains(&"backend".to_string()));
        assert!(tags.contains(&"domain".to_string()));
        let unique: std::collections::HashSet<_> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
    }
}
