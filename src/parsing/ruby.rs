//! Ruby parser backed by `tree-sitter-ruby`. Rails association/route
//! refinement happens in `extractors::rails`.

use super::parsed_file::{ClassDef, FunctionDef, ParsedFile, PartialParsedFile};
use super::parser::LanguageParser;
use crate::error::{ParseError, ParseResult};
use crate::types::{ClassKind, Language, LineRange};
use tree_sitter::{Node, Parser};

pub struct RubyParser {
    language: tree_sitter::Language,
}

impl RubyParser {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            language: tree_sitter_ruby::LANGUAGE.into(),
        })
    }
}

impl LanguageParser for RubyParser {
    fn language(&self) -> Language {
        Language::Ruby
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

        let mut file = ParsedFile::new(path, repo, Language::Ruby);
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
            "call" => {
                // `require`/`require_relative "foo"` surface as a bare call node.
                if let Some(method) = child.child_by_field_name("method") {
                    let name = node_text(method, content);
                    if name == "require" || name == "require_relative" {
                        if let Some(args) = child.child_by_field_name("arguments") {
                            file.imports
                                .push(node_text(args, content).trim_matches(['"', '\'']).to_string());
                        }
                    }
                }
            }
            "class" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let parent = child
                        .child_by_field_name("superclass")
                        .map(|n| node_text(n, content).trim_start_matches('<').trim().to_string());
                    file.classes.push(ClassDef {
                        name: node_text(name, content).to_string(),
                        kind: ClassKind::Other,
                        parent,
                        range: line_range(child),
                    });
                }
            }
            "method" => {
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
    fn parses_class_with_superclass() {
        let parser = RubyParser::new().unwrap();
        let src = "require 'active_record'\n\nclass Patient < ApplicationRecord\n  def treat\n  end\nend\n";
        let parsed = parser.parse(src, "app/models/patient.rb", "clinic").unwrap();
        assert_eq!(parsed.classes.len(), 1);
        assert_eq!(parsed.classes[0].name, "Patient");
        assert_eq!(parsed.classes[0].parent.as_deref(), Some("ApplicationRecord"));
        assert_eq!(parsed.functions.len(), 1);
    }
}
