//! Parser factory: resolves a `Language` to a concrete `LanguageParser`,
//! honoring per-language enable/disable settings.

use super::javascript::JavaScriptParser;
use super::parser::LanguageParser;
use super::python::PythonParser;
use super::ruby::RubyParser;
use super::rust::RustParser;
use crate::config::Settings;
use crate::types::Language;
use std::sync::Arc;

pub struct ParserFactory {
    settings: Arc<Settings>,
}

impl ParserFactory {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    pub fn is_language_enabled(&self, language: Language) -> bool {
        self.settings
            .languages
            .get(language.config_key())
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    pub fn enabled_languages(&self) -> Vec<Language> {
        Language::all()
            .into_iter()
            .filter(|&l| self.is_language_enabled(l))
            .collect()
    }

    /// Returns `None` (never an error) for a disabled or unsupported
    /// language: C1's contract is "unknown language -> empty partial", and
    /// the orchestrator treats `None` the same way as an empty parse.
    pub fn create_parser(&self, language: Language) -> Option<Box<dyn LanguageParser>> {
        if !self.is_language_enabled(language) {
            return None;
        }
        match language {
            Language::Rust => RustParser::new().ok().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::Python => PythonParser::new().ok().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::Ruby => RubyParser::new().ok().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::JavaScript => JavaScriptParser::new().ok().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::TypeScript => JavaScriptParser::new_typescript()
                .ok()
                .map(|p| Box::new(p) as Box<dyn LanguageParser>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parser_for_enabled_language() {
        let factory = ParserFactory::new(Arc::new(Settings::default()));
        assert!(factory.create_parser(Language::Rust).is_some());
        assert!(factory.is_language_enabled(Language::Ruby));
    }

    #[test]
    fn disabled_language_yields_no_parser() {
        let mut settings = Settings::default();
        settings.languages.get_mut("rust").unwrap().enabled = false;
        let factory = ParserFactory::new(Arc::new(settings));
        assert!(factory.create_parser(Language::Rust).is_none());
    }
}
