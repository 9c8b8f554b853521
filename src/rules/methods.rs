//! HTTP method list expansion.
//!
//! `ALL` expands to the canonical method set, `!<METHOD>` excludes a method from
//! it. Without `ALL`, the plain tokens are taken as is and negations are ignored.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Methods `ALL` expands to, in output order.
pub const CANONICAL_METHODS: [&str; 9] = [
    "CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT", "TRACE",
];

pub fn expand_http_methods(methods: &[String]) -> Result<Vec<String>> {
    if methods.is_empty() {
        return Ok(Vec::new());
    }

    if methods.iter().any(String::is_empty) {
        return Err(Error::configuration(format!(
            "failed to expand HTTP methods {methods:?}: empty method name"
        )));
    }

    if !methods.iter().any(|m| m == "ALL") {
        let mut seen = HashSet::new();
        return Ok(methods
            .iter()
            .filter(|m| !m.starts_with('!'))
            .filter(|m| seen.insert(m.as_str()))
            .cloned()
            .collect());
    }

    let excluded: HashSet<&str> = methods.iter().filter_map(|m| m.strip_prefix('!')).collect();

    Ok(CANONICAL_METHODS
        .iter()
        .filter(|m| !excluded.contains(*m))
        .map(|m| (*m).to_owned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_list() {
        assert!(expand_http_methods(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_token_fails() {
        let err = expand_http_methods(&strings(&["FOO", ""])).unwrap_err();
        assert!(err.to_string().contains("failed to expand"));

        assert!(expand_http_methods(&strings(&["", "ALL"])).is_err());
    }

    #[test]
    fn test_all_expands_to_canonical_set() {
        let methods = expand_http_methods(&strings(&["ALL"])).unwrap();
        assert_eq!(methods, strings(&CANONICAL_METHODS));
    }

    #[test]
    fn test_all_minus_post_and_trace() {
        let methods = expand_http_methods(&strings(&["ALL", "!POST", "!TRACE"])).unwrap();
        assert_eq!(
            methods,
            strings(&["CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "PUT"])
        );
    }

    #[test]
    fn test_all_with_exclusions() {
        let methods =
            expand_http_methods(&strings(&["ALL", "GET", "!POST", "!TRACE", "!TRACE"])).unwrap();
        assert_eq!(
            methods,
            strings(&["CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "PUT"])
        );
    }

    #[test]
    fn test_plain_methods_are_deduplicated() {
        let methods = expand_http_methods(&strings(&["BAR", "BAZ", "BAZ", "FOO"])).unwrap();
        assert_eq!(methods, strings(&["BAR", "BAZ", "FOO"]));

        let methods = expand_http_methods(&strings(&["POST", "GET", "POST", "!GET"])).unwrap();
        assert_eq!(methods, strings(&["POST", "GET"]));
    }
}
