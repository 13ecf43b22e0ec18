//! C2 — file-role classifier (spec.md §4.2).
//!
//! A pure, first-match-wins decision table from a workspace-relative path
//! and its detected language to a `FileRole`. No I/O, no state: the
//! orchestrator calls this once per parsed file, after C1 and before C3.

use crate::types::{FileRole, Language};
use regex::Regex;
use std::path::Path;

/// Classifies a single file. `language` is currently unused by the base
/// decision table (every rule below is path-shaped) but is kept in the
/// signature because a skill override table is keyed per-language.
pub fn classify(path: &Path, _language: Language) -> FileRole {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if is_test_path(&normalized, basename) {
        return FileRole::Test;
    }
    if is_config_path(&normalized, basename) {
        return FileRole::Config;
    }
    if is_entry_point(basename) {
        return FileRole::EntryPoint;
    }
    if normalized.contains("/concerns/") || normalized.contains("/utils/") || normalized.contains("/shared/") {
        return FileRole::SharedUtility;
    }
    FileRole::Domain
}

/// Applies an optional per-language override list before falling back to
/// `classify`. Each entry is `(path_regex, role)`; the first match wins,
/// exactly like the base table. Used by the orchestrator when `Settings`
/// carries skill-provided overrides; `classify` alone is what the parser
/// registry calls and what the unit tests below exercise directly.
pub fn classify_with_overrides(path: &Path, language: Language, overrides: &[(Regex, FileRole)]) -> FileRole {
    let normalized = path.to_string_lossy().replace('\\', "/");
    for (re, role) in overrides {
        if re.is_match(&normalized) {
            return *role;
        }
    }
    classify(path, language)
}

fn is_test_path(normalized: &str, basename: &str) -> bool {
    normalized.contains("/spec/")
        || normalized.contains("/test/")
        || basename.contains("_spec.")
        || basename.contains("_test.")
        || basename.contains(".test.")
        || basename.contains(".stories.")
}

fn is_config_path(normalized: &str, basename: &str) -> bool {
    normalized.contains("/config/")
        || normalized.contains("/initializers/")
        || (basename.starts_with("settings") && basename.ends_with(".py"))
}

fn is_entry_point(basename: &str) -> bool {
    matches!(basename, "index.ts" | "main.ts" | "app.rb" | "manage.py") || basename.starts_with("root.")
}

/// Only `domain` and `shared_utility` files can source card content
/// (spec.md §4.2, `isDomainRelevant`).
pub fn is_domain_relevant(role: FileRole) -> bool {
    role.is_domain_relevant()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> std::path::PathBuf {
        std::path::PathBuf::from(s)
    }

    #[test]
    fn classifies_test_files() {
        assert_eq!(classify(&p("app/models/patient_spec.rb"), Language::Ruby), FileRole::Test);
        assert_eq!(classify(&p("src/foo.test.ts"), Language::TypeScript), FileRole::Test);
        assert_eq!(classify(&p("components/Button.stories.tsx"), Language::TypeScript), FileRole::Test);
    }

    #[test]
    fn classifies_config_files() {
        assert_eq!(classify(&p("config/routes.rb"), Language::Ruby), FileRole::Config);
        assert_eq!(classify(&p("myapp/settings/base.py"), Language::Python), FileRole::Config);
    }

    #[test]
    fn classifies_entry_points() {
        assert_eq!(classify(&p("src/index.ts"), Language::TypeScript), FileRole::EntryPoint);
        assert_eq!(classify(&p("manage.py"), Language::Python), FileRole::EntryPoint);
    }

    #[test]
    fn classifies_shared_utility_and_domain() {
        assert_eq!(classify(&p("app/models/concerns/trackable.rb"), Language::Ruby), FileRole::SharedUtility);
        assert_eq!(classify(&p("app/models/patient.rb"), Language::Ruby), FileRole::Domain);
    }

    #[test]
    fn first_match_wins_over_later_rules() {
        // a spec file that also lives under /config/ is still a test
        assert_eq!(classify(&p("config/initializers/foo_spec.rb"), Language::Ruby), FileRole::Test);
    }

    #[test]
    fn overrides_take_priority() {
        let overrides = vec![(Regex::new(r"^app/models/patient\.rb$").unwrap(), FileRole::SharedUtility)];
        assert_eq!(
            classify_with_overrides(&p("app/models/patient.rb"), Language::Ruby, &overrides),
            FileRole::SharedUtility
        );
    }
}
