//! Sanitizes user-supplied search terms into safe FTS5 MATCH expressions.

use std::sync::LazyLock;

use regex::Regex;

/// Characters reserved by the FTS5 query syntax.
static SYNTAX_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[()"*.:]"#).expect("syntax character class"));

/// Boolean operators that must not survive as bare tokens.
const QUERY_KEYWORDS: [&str; 4] = ["and", "or", "not", "near"];

/// Turns a raw search term into an FTS5 expression matching every surviving
/// token as an exact quoted term, joined with `AND`.
///
/// Returns an empty string when nothing survives; callers treat that as a
/// query that matches nothing.
pub fn sanitize_term(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let lowered = raw.to_lowercase();
    let stripped = SYNTAX_CHARS.replace_all(&lowered, " ");
    let spaced = stripped.replace('-', " ");
    let tokens: Vec<&str> = spaced
        .split_whitespace()
        .filter(|token| !QUERY_KEYWORDS.contains(token))
        .collect();
    if tokens.is_empty() {
        return String::new();
    }
    tokens
        .iter()
        .map(|token| format!("\"{token}\""))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_syntax_and_drops_keywords() {
        assert_eq!(
            sanitize_term("Wood (Finish).Test AND more"),
            "\"wood\" AND \"finish\" AND \"test\" AND \"more\""
        );
    }

    #[test]
    fn hyphens_split_tokens() {
        assert_eq!(sanitize_term("drum-kit"), "\"drum\" AND \"kit\"");
    }

    #[test]
    fn keywords_only_input_yields_empty_query() {
        assert_eq!(sanitize_term("AND or NOT near"), "");
        assert_eq!(sanitize_term(""), "");
        assert_eq!(sanitize_term("()*.:\""), "");
    }

    #[test]
    fn single_token_is_quoted() {
        assert_eq!(sanitize_term("Ozone"), "\"ozone\"");
    }
}
