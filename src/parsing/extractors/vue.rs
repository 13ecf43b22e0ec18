//! Vue single-file components: the `<script>` block is parsed with the
//! JS/TS grammar; the template is scanned separately for child-component
//! usage. Both partial parses are concatenated with `merge_partial_parses`.

use super::merge_partial_parses;
use crate::parsing::javascript::JavaScriptParser;
use crate::parsing::parsed_file::{ClassDef, ParsedFile};
use crate::parsing::parser::LanguageParser;
use crate::types::{ClassKind, LineRange};
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<script[^>]*>(.*?)</script>"#).unwrap());

static COMPONENT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([A-Z][A-Za-z0-9]*)"#).unwrap());

pub fn extract(file: &mut ParsedFile, source: &str) {
    let is_ts = SCRIPT_RE
        .captures(source)
        .map(|c| source[..c.get(0).unwrap().start()].contains("lang=\"ts\""))
        .unwrap_or(false);

    let script_parse = SCRIPT_RE.captures(source).and_then(|cap| {
        let body = cap.get(1)?.as_str();
        let parser: Box<dyn LanguageParser> = if is_ts {
            Box::new(JavaScriptParser::new_typescript().ok()?)
        } else {
            Box::new(JavaScriptParser::new().ok()?)
        };
        parser.parse(body, &file.path, &file.repo).ok()
    });

    let mut template_shell = ParsedFile::new(&file.path, &file.repo, file.language);
    let component_name = file
        .path
        .rsplit('/')
        .next()
        .unwrap_or(&file.path)
        .trim_end_matches(".vue")
        .to_string();
    template_shell.classes.push(ClassDef {
        name: component_name,
        kind: ClassKind::Component,
        parent: None,
        range: LineRange::new(1, source.lines().count() as u32),
    });
    for cap in COMPONENT_TAG_RE.captures_iter(source) {
        template_shell.imports.push(cap[1].to_string());
    }

    let parts = match script_parse {
        Some(script) => vec![template_shell, script],
        None => vec![template_shell],
    };
    if let Some(merged) = merge_partial_parses(parts) {
        file.imports.extend(merged.imports);
        file.exports.extend(merged.exports);
        file.classes.extend(merged.classes);
        file.functions.extend(merged.functions);
        file.associations.extend(merged.associations);
        file.routes.extend(merged.routes);
        file.api_calls.extend(merged.api_calls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Language;

    #[test]
    fn merges_script_block_with_template_component_name() {
        let mut file = ParsedFile::new("src/components/PatientCard.vue", "frontend", Language::JavaScript);
        let src = "<template><PatientAvatar/></template>\n<script>\nimport axios from 'axios'\nexport default { name: 'PatientCard' }\n</script>\n";
        extract(&mut file, src);
        assert!(file.classes.iter().any(|c| c.name == "PatientCard"));
        assert!(file.imports.iter().any(|i| i == "axios" || i == "PatientAvatar"));
    }
}
