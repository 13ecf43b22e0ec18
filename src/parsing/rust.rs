//! Rust parser backed by `tree-sitter-rust`.

use super::parsed_file::{ClassDef, FunctionDef, ParsedFile, PartialParsedFile};
use super::parser::LanguageParser;
use crate::error::{ParseError, ParseResult};
use crate::types::{ClassKind, Language, LineRange};
use tree_sitter::{Node, Parser};

pub struct RustParser {
    language: tree_sitter::Language,
}

impl RustParser {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        })
    }
}

impl LanguageParser for RustParser {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn parse(&self, content: &str, path: &str, repo: &str) -> ParseResult<PartialParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::GrammarError {
                path: path.into(),
                reason: e.to_string(),
            })?;

        let tree = parser.parse(content, None).ok_or_else(|| ParseError::GrammarError {
            path: path.into(),
            reason: "tree-sitter returned no parse tree".to_string(),
        })?;

        let mut file = ParsedFile::new(path, repo, Language::Rust);
        walk(tree.root_node(), content, &mut file);
        Ok(file)
    }
}

fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    content.get(node.byte_range()).unwrap_or("")
}

fn line_range(node: Node) -> LineRange {
    LineRange::new(
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}

fn walk(node: Node, content: &str, file: &mut ParsedFile) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "use_declaration" => {
                if let Some(path_node) = child.child_by_field_name("argument") {
                    file.imports.push(node_text(path_node, content).to_string());
                }
            }
            "struct_item" | "enum_item" => {
                if let Some(name) = child.child_by_field_name("name") {
                    file.classes.push(ClassDef {
                        name: node_text(name, content).to_string(),
                        kind: ClassKind::Other,
                        parent: None,
                        range: line_range(child),
                    });
                }
            }
            "function_item" => {
                if let Some(name) = child.child_by_field_name("name") {
                    file.functions.push(FunctionDef {
                        name: node_text(name, content).to_string(),
                        range: line_range(child),
                    });
                }
            }
            _ => {}
        }
        walk(child, content, file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structs_and_functions() {
        let parser = RustParser::new().unwrap();
        let src = "use std::fmt;\n\nstruct Patient { id: u32 }\n\nfn treat(p: &Patient) {}\n";
        let parsed = parser.parse(src, "app/models/patient.rs", "clinic").unwrap();
        assert_eq!(parsed.classes.len(), 1);
        assert_eq!(parsed.classes[0].name, "Patient");
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.imports, vec!["std::fmt"]);
    }
}
