//! Re-exports the shared `Language` enum and gives it the config-key and
//! tree-sitter-grammar glue the parser registry needs.

pub use crate::types::Language;

impl Language {
    /// Key this language is registered under in `Settings::languages`.
    pub fn config_key(&self) -> &'static str {
        self.name()
    }

    pub fn all() -> [Language; 5] {
        [
            Language::Rust,
            Language::Python,
            Language::Ruby,
            Language::JavaScript,
            Language::TypeScript,
        ]
    }
}
