//! Framework extractors: a second pass over a `ParsedFile` plus the raw
//! source that refines class kinds and recovers associations/routes a
//! generic grammar walk can't express (spec §4.1).

pub mod django;
pub mod express_nest;
pub mod rails;
pub mod vue;

use crate::parsing::parsed_file::ParsedFile;

/// Runs the extractor appropriate for `file`'s path/language, if any.
/// Extractors never fail the run: on any internal inconsistency they leave
/// the file as-is.
pub fn run(file: &mut ParsedFile, source: &str) {
    use crate::types::Language;
    match file.language {
        Language::Ruby => rails::extract(file, source),
        Language::Python => django::extract(file, source),
        Language::JavaScript | Language::TypeScript => {
            if file.path.ends_with(".vue") {
                vue::extract(file, source);
            } else {
                express_nest::extract(file, source);
            }
        }
        Language::Rust => {}
    }
}

/// Concatenates a set of partial parses of the same logical file (used by
/// the Vue extractor, which parses the `<script>` block and the template
/// separately and needs one merged `ParsedFile`).
pub fn merge_partial_parses(parts: Vec<ParsedFile>) -> Option<ParsedFile> {
    let mut iter = parts.into_iter();
    let mut merged = iter.next()?;
    for part in iter {
        merged.imports.extend(part.imports);
        merged.exports.extend(part.exports);
        merged.classes.extend(part.classes);
        merged.functions.extend(part.functions);
        merged.associations.extend(part.associations);
        merged.routes.extend(part.routes);
        merged.api_calls.extend(part.api_calls);
        merged.validations.extend(part.validations);
        merged.callbacks.extend(part.callbacks);
    }
    Some(merged)
}
