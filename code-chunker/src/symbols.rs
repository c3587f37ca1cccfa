//! Regex-based declared-name extraction.
//!
//! Language-agnostic and intentionally shallow: it only looks at line starts
//! for common declaration keywords. Good enough to enrich search hits without
//! a grammar.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(?:(?:pub(?:\([^)]*\))?|export|default|public|private|protected|static|abstract|async|unsafe|const)\s+)*(?:fn|struct|enum|trait|class|def|function|interface|type|func|mod)\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("declaration regex is valid")
});

static IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*impl(?:<[^>]*>)?\s+(?:[A-Za-z_][\w:<>, ]*\s+for\s+)?([A-Za-z_][A-Za-z0-9_]*)")
        .expect("impl regex is valid")
});

/// Returns declared names in order of first appearance, without duplicates.
pub fn extract_symbols(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = DECL_RE
        .captures_iter(text)
        .chain(IMPL_RE.captures_iter(text))
        .filter_map(|cap| cap.get(1).map(|m| (m.start(), m.as_str().to_string())))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(|(_, name)| seen.insert(name.clone()).then_some(name))
        .collect()
}
