//! Rule lookup.
//!
//! # Responsibilities
//! - Store compiled rules in definition order
//! - Find the rule responsible for a request URL and method
//! - Fall back to the default rule, or report an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan, first match wins
//! - A URL match with a wrong method is reported as such when there is no
//!   default rule to take over

use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::rules::Rule;

#[derive(Debug, Default)]
pub struct RuleRouter {
    rules: Vec<Arc<Rule>>,
    default_rule: Option<Arc<Rule>>,
}

impl RuleRouter {
    pub fn new(rules: Vec<Arc<Rule>>, default_rule: Option<Arc<Rule>>) -> Self {
        Self {
            rules,
            default_rule,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn default_rule(&self) -> Option<&Arc<Rule>> {
        self.default_rule.as_ref()
    }

    pub fn find_rule(&self, url: &Url, method: &str) -> Result<Arc<Rule>> {
        let mut url_matched = false;

        for rule in &self.rules {
            if !rule.matches_url(url) {
                continue;
            }
            if rule.matches_method(method) {
                return Ok(rule.clone());
            }
            url_matched = true;
        }

        if let Some(default) = &self.default_rule {
            return Ok(default.clone());
        }

        if url_matched {
            Err(Error::MethodNotAllowed {
                method: method.to_owned(),
                url: url.to_string(),
            })
        } else {
            Err(Error::NoRuleFound(url.to_string()))
        }
    }
}
