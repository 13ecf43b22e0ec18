//! File discovery for the orchestrator (C11, spec.md §4.10). Walks a repo
//! root honoring `.codeprismignore` (gitignore syntax) merged with the
//! default excludes the spec names, filtered down to enabled languages.

use crate::parsing::Language;
use crate::Settings;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default excludes from spec.md §4.10, applied regardless of what
/// `.codeprismignore` says.
const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules", "vendor", ".git", "dist", "build", ".next", "tmp", "venv", ".venv",
];

pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walks `root`, returning every enabled-language file the ignore
    /// rules let through. Traversal order is not guaranteed stable;
    /// callers that need determinism (the graph builder) sort their own
    /// input.
    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false)
            .add_custom_ignore_filename(".codeprismignore");

        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in DEFAULT_EXCLUDES {
            let _ = override_builder.add(&format!("!**/{pattern}/**"));
        }
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!(pattern, error = %e, "invalid ignore pattern");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let enabled_languages = self.enabled_languages();

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                let hidden = path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('.')).unwrap_or(false);
                if hidden {
                    return None;
                }
                let language = Language::from_path(path)?;
                enabled_languages.contains(&language).then(|| path.to_path_buf())
            })
            .collect()
    }

    fn enabled_languages(&self) -> Vec<Language> {
        Language::all()
            .into_iter()
            .filter(|&lang| self.settings.languages.get(lang.config_key()).map(|c| c.enabled).unwrap_or(false))
            .collect()
    }

    pub fn count_files(&self, root: &Path) -> usize {
        self.walk(root).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings_with_rust_only() -> Arc<Settings> {
        let mut settings = Settings::default();
        for (key, cfg) in settings.languages.iter_mut() {
            cfg.enabled = key == "rust";
        }
        Arc::new(settings)
    }

    #[test]
    fn filters_by_enabled_language() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.rs"), "").unwrap();
        fs::write(dir.path().join("test.py"), "").unwrap();

        let walker = FileWalker::new(settings_with_rust_only());
        let files = walker.walk(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
    }

    #[test]
    fn skips_default_excluded_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.js"), "").unwrap();
        fs::write(dir.path().join("app.rb"), "").unwrap();

        let walker = FileWalker::new(Arc::new(Settings::default()));
        let files = walker.walk(dir.path());
        assert!(files.iter().any(|p| p.ends_with("app.rb")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains("node_modules")));
    }

    #[test]
    fn respects_codeprismignore() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".codeprismignore"), "ignored_dir/\n").unwrap();
        fs::create_dir_all(dir.path().join("ignored_dir")).unwrap();
        fs::write(dir.path().join("ignored_dir/a.rb"), "").unwrap();
        fs::write(dir.path().join("kept.rb"), "").unwrap();

        let walker = FileWalker::new(Arc::new(Settings::default()));
        let files = walker.walk(dir.path());
        assert!(files.iter().any(|p| p.ends_with("kept.rb")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains("ignored_dir")));
    }

    #[test]
    fn ignores_hidden_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".hidden.rb"), "").unwrap();
        fs::write(dir.path().join("visible.rb"), "").unwrap();

        let walker = FileWalker::new(Arc::new(Settings::default()));
        let files = walker.walk(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.rb"));
    }
}
