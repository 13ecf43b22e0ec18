//! The `LanguageParser` trait every grammar-backed parser implements.

use super::parsed_file::PartialParsedFile;
use crate::error::ParseResult;
use crate::types::Language;

/// A single-language structural parser. Implementations wrap a
/// `tree-sitter` grammar and must be deterministic: identical input bytes
/// always produce an identical `PartialParsedFile`. Unknown constructs are
/// dropped silently rather than causing an error — only I/O and grammar
/// failures are `Err`.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    /// `path` is workspace-relative; `repo` names the owning repository.
    fn parse(&self, content: &str, path: &str, repo: &str) -> ParseResult<PartialParsedFile>;
}
