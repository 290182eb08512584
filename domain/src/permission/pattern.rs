//! Wildcard matching for tool-name patterns.
//!
//! `*` matches any (possibly empty) run of characters, everything else is
//! literal. Patterns are anchored: `github/*` matches `github/createIssues`
//! but not `mirror/github/createIssues`.

use regex::Regex;

pub fn wildcard_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == name;
    }

    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}$", body))
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}
