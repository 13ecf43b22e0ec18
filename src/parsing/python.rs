//! Python parser backed by `tree-sitter-python`. Django model/view
//! refinement happens in `extractors::django`; this parser only extracts
//! the language-generic shape.

use super::parsed_file::{ClassDef, FunctionDef, ParsedFile, PartialParsedFile};
use super::parser::LanguageParser;
use crate::error::{ParseError, ParseResult};
use crate::types::{ClassKind, Language, LineRange};
use tree_sitter::{Node, Parser};

pub struct PythonParser {
    language: tree_sitter::Language,
}

impl PythonParser {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            language: tree_sitter_python::LANGUAGE.into(),
        })
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
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

        let mut file = ParsedFile::new(path, repo, Language::Python);
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
            "import_statement" | "import_from_statement" => {
                file.imports.push(node_text(child, content).trim().to_string());
            }
            "class_definition" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let parent = child
                        .child_by_field_name("superclasses")
                        .map(|n| node_text(n, content).trim_matches(['(', ')']).to_string());
                    file.classes.push(ClassDef {
                        name: node_text(name, content).to_string(),
                        kind: ClassKind::Other,
                        parent,
                        range: line_range(child),
                    });
                }
            }
            "function_definition" => {
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
