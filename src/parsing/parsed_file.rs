//! The data model produced by a parser (C1) and refined by a framework
//! extractor second pass. Mirrors spec §3's `ParsedFile` entity.

use crate::types::{AssociationKind, ClassKind, FileRole, Language, LineRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
    pub parent: Option<String>,
    pub range: LineRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub range: LineRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub kind: AssociationKind,
    pub name: String,
    pub target_model: Option<String>,
    pub options: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub controller: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCall {
    pub method: String,
    pub path: String,
}

/// One file's worth of structural facts. A parser (`LanguageParser::parse`)
/// produces this directly from tree-sitter output; a framework extractor
/// then mutates it in place to fill in routes, associations, and refined
/// class kinds that a generic grammar walk can't recover on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Workspace-relative path. Never an absolute machine path (spec §3 invariant).
    pub path: String,
    pub repo: String,
    pub language: Language,
    /// Set by the role classifier (C2), not by the parser itself.
    pub file_role: FileRole,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub classes: Vec<ClassDef>,
    pub functions: Vec<FunctionDef>,
    pub associations: Vec<Association>,
    pub routes: Vec<Route>,
    pub api_calls: Vec<ApiCall>,
    pub validations: Vec<String>,
    pub callbacks: Vec<String>,
}

impl ParsedFile {
    pub fn new(path: impl Into<String>, repo: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            repo: repo.into(),
            language,
            file_role: FileRole::Domain,
            imports: Vec::new(),
            exports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            associations: Vec::new(),
            routes: Vec::new(),
            api_calls: Vec::new(),
            validations: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// True for files whose basename plausibly holds route declarations
    /// (`routes.rb`, `urls.py`), which get dedicated extractor handling.
    pub fn is_routes_file(&self) -> bool {
        let base = self.path.rsplit('/').next().unwrap_or(&self.path);
        matches!(base, "routes.rb" | "urls.py" | "routes.ts" | "routes.js")
            || self.path.contains("/config/routes")
    }
}

/// Alias used by parsers and extractors: the in-progress, possibly
/// incomplete `ParsedFile` a second pass still needs to refine.
pub type PartialParsedFile = ParsedFile;
