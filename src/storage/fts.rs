//! FTS5 query sanitization (spec.md §4.7 step 2b, §8 P6). Strips URLs,
//! splits CamelCase, drops the FTS5 boolean operators, keeps tokens of
//! at least 2 characters, caps at 30 tokens, and joins them unquoted
//! with `OR` so a single typo'd token still finds a match.

use regex::Regex;
use std::sync::LazyLock;

const MAX_TOKENS: usize = 30;
const OPERATORS: [&str; 4] = ["AND", "OR", "NOT", "NEAR"];

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static CAMEL_BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]+").unwrap());

/// Returns a string safe to pass straight into an FTS5 `MATCH` query:
/// never quotes a token, never emits a bare `AND`/`OR`/`NOT`/`NEAR`.
pub fn sanitize_fts5_query(query: &str) -> String {
    let without_urls = URL_RE.replace_all(query, " ");
    let split_camel = CAMEL_BOUNDARY_RE.replace_all(&without_urls, "$1 $2");
    let tokens: Vec<String> = NON_WORD_RE
        .split(&split_camel)
        .filter(|t| !t.is_empty())
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !OPERATORS.iter().any(|op| op.eq_ignore_ascii_case(t)))
        .take(MAX_TOKENS)
        .map(|t| t.to_string())
        .collect();
    tokens.join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_operator_injection() {
        let out = sanitize_fts5_query("patient AND authorization OR billing NOT hub");
        assert!(out.contains("patient"));
        assert!(out.contains("authorization"));
        assert!(out.contains("billing"));
        assert!(out.contains("hub"));
        assert!(!out.split(' ').any(|t| t == "AND" || t == "NOT"));
        assert!(!out.contains('"'));
        assert_eq!(out, "patient OR authorization OR billing OR hub");
    }

    #[test]
    fn strips_urls() {
        let out = sanitize_fts5_query("see https://example.com/docs for patient billing");
        assert!(!out.contains("http"));
        assert!(out.contains("patient"));
    }

    #[test]
    fn splits_camel_case() {
        let out = sanitize_fts5_query("PatientController");
        assert!(out.contains("Patient"));
        assert!(out.contains("Controller"));
    }

    #[test]
    fn drops_single_character_tokens() {
        let out = sanitize_fts5_query("a b patient");
        assert_eq!(out, "patient");
    }

    #[test]
    fn caps_at_thirty_tokens() {
        let many = (0..50).map(|i| format!("tok{i}")).collect::<Vec<_>>().join(" ");
        let out = sanitize_fts5_query(&many);
        assert_eq!(out.split(" OR ").count(), MAX_TOKENS);
    }

    #[test]
    fn empty_query_yields_empty_string() {
        assert_eq!(sanitize_fts5_query(""), "");
        assert_eq!(sanitize_fts5_query("a"), "");
    }
}
