//! JavaScript/TypeScript parser. One implementation shared by both
//! languages since the grammars agree on the node kinds this pass needs;
//! only the underlying tree-sitter grammar differs.

use super::parsed_file::{ClassDef, FunctionDef, ParsedFile, PartialParsedFile};
use super::parser::LanguageParser;
use crate::error::{ParseError, ParseResult};
use crate::types::{ClassKind, Language, LineRange};
use tree_sitter::{Node, Parser};

pub struct JavaScriptParser {
    language: Language,
    grammar: tree_sitter::Language,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            language: Language::JavaScript,
            grammar: tree_sitter_javascript::LANGUAGE.into(),
        })
    }

    pub fn new_typescript() -> Result<Self, String> {
        Ok(Self {
            language: Language::TypeScript,
            grammar: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        })
    }
}

impl LanguageParser for JavaScriptParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&self, content: &str, path: &str, repo: &str) -> ParseResult<PartialParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar)
            .map_err(|e| ParseError::GrammarError {
                path: path.into(),
                reason: e.to_string(),
            })?;
        let tree = parser.parse(content, None).ok_or_else(|| ParseError::GrammarError {
            path: path.into(),
            reason: "tree-sitter returned no parse tree".to_string(),
        })?;

        let mut file = ParsedFile::new(path, repo, self.language);
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

pub fn walk(node: Node, content: &str, file: &mut ParsedFile) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_statement" => {
                if let Some(source) = child.child_by_field_name("source") {
                    file.imports
                        .push(node_text(source, content).trim_matches(['"', '\'']).to_string());
                }
            }
            "export_statement" => {
                file.exports.push(node_text(child, content).trim().to_string());
            }
            "class_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let parent = child
                        .child_by_field_name("heritage")
                        .map(|n| node_text(n, content).trim_start_matches("extends").trim().to_string());
                    file.classes.push(ClassDef {
                        name: node_text(name, content).to_string(),
                        kind: ClassKind::Other,
                        parent,
                        range: line_range(child),
                    });
                }
            }
            "function_declaration" => {
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
    fn parses_es_module_imports_and_classes() {
        let parser = JavaScriptParser::new().unwrap();
        let src = "import React from 'react';\n\nclass PatientCard extends React.Component {}\n";
        let parsed = parser.parse(src, "src/components/PatientCard.js", "frontend").unwrap();
        assert_eq!(parsed.imports, vec!["react"]);
        assert_eq!(parsed.classes[0].name, "PatientCard");
    }

    #[test]
    fn typescript_variant_parses_same_shape() {
        let parser = JavaScriptParser::new_typescript().unwrap();
        let src = "import { Injectable } from '@nestjs/common';\n\nclass PatientService {}\n";
        let parsed = parser.parse(src, "src/patient.service.ts", "backend").unwrap();
        assert_eq!(parsed.language, Language::TypeScript);
        assert_eq!(parsed.classes[0].name, "PatientService");
    }
}
