//! C1 — parser registry. Maps a file extension to a `LanguageParser`; each
//! parser returns a `ParsedFile` which framework extractors then refine.

pub mod extractors;
pub mod factory;
pub mod javascript;
pub mod language;
pub mod parsed_file;
pub mod parser;
pub mod python;
pub mod ruby;
pub mod rust;

pub use factory::ParserFactory;
pub use language::Language;
pub use parsed_file::{ApiCall, Association, ClassDef, FunctionDef, ParsedFile, Route};
pub use parser::LanguageParser;

use crate::error::ParseError;
use crate::roles;

/// Parses one file end to end: grammar parse, role classification (C2),
/// then the framework-extractor second pass. Returns `Ok(None)` for an
/// unsupported or disabled language rather than an error, matching C1's
/// "unknown language -> empty partial" contract.
pub fn parse_file(
    factory: &ParserFactory,
    content: &str,
    path: &str,
    repo: &str,
) -> Result<Option<ParsedFile>, ParseError> {
    let Some(language) = Language::from_path(std::path::Path::new(path)) else {
        return Ok(None);
    };
    let Some(parser) = factory.create_parser(language) else {
        return Ok(None);
    };
    let mut parsed = parser.parse(content, path, repo)?;
    parsed.file_role = roles::classify(std::path::Path::new(path), language);
    extractors::run(&mut parsed, content);
    Ok(Some(parsed))
}
