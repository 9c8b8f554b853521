//! URL matching logic.
//!
//! # Responsibilities
//! - Compile rule URL patterns with the configured strategy (glob or regex)
//! - Match request URLs in the form `scheme://host[:port]/path`
//!
//! # Design Decisions
//! - Query strings are not part of the matched value
//! - Glob `*` does not cross `/`, `**` does
//! - Regex patterns are not implicitly anchored
//! - Patterns are compiled once when the rule is built

use std::fmt;
use std::str::FromStr;

use globset::GlobBuilder;
use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

/// Trait for matching a string against a compiled pattern.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the value matches this pattern.
    fn matches(&self, value: &str) -> bool;
}

/// Glob pattern matcher.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    matcher: globset::GlobMatcher,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> std::result::Result<Self, globset::Error> {
        let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }
}

impl Matcher for GlobMatcher {
    fn matches(&self, value: &str) -> bool {
        self.matcher.is_match(value)
    }
}

/// Regular expression matcher.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Matcher for RegexMatcher {
    fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Pattern language of a rule URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    #[default]
    Glob,
    Regex,
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "glob" => Ok(MatchStrategy::Glob),
            "regex" => Ok(MatchStrategy::Regex),
            other => Err(format!("unsupported matching strategy '{other}'")),
        }
    }
}

/// Compiled URL pattern of a rule.
#[derive(Debug)]
pub struct UrlMatcher {
    pattern: String,
    strategy: MatchStrategy,
    matcher: Box<dyn Matcher>,
}

impl UrlMatcher {
    /// Compile a pattern. A missing strategy means glob.
    pub fn new(pattern: &str, strategy: Option<&str>) -> Result<Self> {
        let bad_pattern =
            |reason: String| Error::configuration(format!("bad URL pattern '{pattern}': {reason}"));

        if pattern.is_empty() {
            return Err(bad_pattern("pattern is empty".into()));
        }

        let strategy = match strategy {
            Some(s) => s.parse::<MatchStrategy>().map_err(bad_pattern)?,
            None => MatchStrategy::default(),
        };

        let matcher: Box<dyn Matcher> = match strategy {
            MatchStrategy::Glob => {
                Box::new(GlobMatcher::new(pattern).map_err(|err| bad_pattern(err.to_string()))?)
            }
            MatchStrategy::Regex => {
                Box::new(RegexMatcher::new(pattern).map_err(|err| bad_pattern(err.to_string()))?)
            }
        };

        Ok(Self {
            pattern: pattern.to_owned(),
            strategy,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.matcher.matches(&match_target(url))
    }
}

/// The part of a URL patterns are matched against.
pub fn match_target(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}{}", url.scheme(), url.path()),
        None => format!("{}://{host}{}", url.scheme(), url.path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    #[test]
    fn test_match_target_drops_query() {
        assert_eq!(
            match_target(&url("https://foo.bar:8443/a/b?c=d")),
            "https://foo.bar:8443/a/b"
        );
    }

    #[test]
    fn test_glob_matcher() {
        let matcher = UrlMatcher::new("http://foo.bar/api/*", None).unwrap();
        assert_eq!(matcher.strategy(), MatchStrategy::Glob);

        assert!(matcher.matches(&url("http://foo.bar/api/users")));
        assert!(matcher.matches(&url("http://foo.bar/api/users?limit=1")));
        assert!(!matcher.matches(&url("http://foo.bar/api/users/1")));
        assert!(!matcher.matches(&url("https://foo.bar/api/users")));

        let matcher = UrlMatcher::new("http://foo.bar/api/**", Some("glob")).unwrap();
        assert!(matcher.matches(&url("http://foo.bar/api/users/1")));
    }

    #[test]
    fn test_regex_matcher() {
        let matcher = UrlMatcher::new(r"^https?://foo\.bar/items/\d+$", Some("regex")).unwrap();
        assert!(matcher.matches(&url("http://foo.bar/items/42")));
        assert!(matcher.matches(&url("https://foo.bar/items/7")));
        assert!(!matcher.matches(&url("http://foo.bar/items/abc")));
    }

    #[test]
    fn test_bad_patterns() {
        for (pattern, strategy) in [
            ("", None),
            ("http://foo.bar/*", Some("")),
            ("http://foo.bar/*", Some("foo")),
            ("http://foo.bar/[", Some("glob")),
            ("http://foo.bar/(", Some("regex")),
        ] {
            let err = UrlMatcher::new(pattern, strategy).unwrap_err();
            assert!(err.to_string().contains("bad URL pattern"), "{pattern}");
        }
    }
}
