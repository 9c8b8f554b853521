//! Upstream URL computation for proxy mode.

use std::collections::HashSet;

use tracing::warn;
use url::{form_urlencoded, Url};

use crate::config::schema::UpstreamConfig;
use crate::error::{Error, Result};

/// Derives the upstream URL from an inbound request URL.
///
/// Host and port are replaced, path and query are rewritten as configured.
#[derive(Debug, Clone)]
pub struct UpstreamUrlFactory {
    host: String,
    port: Option<u16>,
    scheme: Option<String>,
    strip_path_prefix: Option<String>,
    add_path_prefix: Option<String>,
    strip_query_parameters: HashSet<String>,
}

impl UpstreamUrlFactory {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let authority = Url::parse(&format!("http://{}", config.host))
            .map_err(|err| Error::configuration(format!("invalid upstream host '{}': {err}", config.host)))?;
        let host = authority
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::configuration(format!("invalid upstream host '{}'", config.host)))?
            .to_owned();

        let rewrite = config.rewrite.clone().unwrap_or_default();
        let scheme = rewrite.scheme.filter(|s| !s.is_empty());
        if let Some(scheme) = &scheme {
            if scheme != "http" && scheme != "https" {
                return Err(Error::configuration(format!(
                    "unsupported upstream scheme '{scheme}'"
                )));
            }
        }

        Ok(Self {
            host,
            port: authority.port(),
            scheme,
            strip_path_prefix: rewrite.strip_path_prefix.filter(|p| !p.is_empty()),
            add_path_prefix: rewrite.add_path_prefix.filter(|p| !p.is_empty()),
            strip_query_parameters: rewrite
                .strip_query_parameters
                .unwrap_or_default()
                .into_iter()
                .collect(),
        })
    }

    /// Compute the upstream URL for the given inbound URL.
    pub fn create_url(&self, original: &Url) -> Url {
        let mut target = original.clone();

        if let Some(scheme) = &self.scheme {
            if target.set_scheme(scheme).is_err() {
                warn!(from = original.scheme(), to = %scheme, "Cannot rewrite URL scheme");
            }
        }
        if target.set_host(Some(&self.host)).is_err() {
            warn!(host = %self.host, "Cannot rewrite URL host");
        }
        if target.set_port(self.port).is_err() {
            warn!(port = ?self.port, "Cannot rewrite URL port");
        }

        let mut path = original.path();
        if let Some(prefix) = &self.strip_path_prefix {
            path = path.strip_prefix(prefix.as_str()).unwrap_or(path);
        }
        let path = match &self.add_path_prefix {
            Some(prefix) => format!("{prefix}{path}"),
            None => path.to_owned(),
        };
        target.set_path(&path);

        let query = original.query().map(|q| self.filter_query(q));
        target.set_query(query.as_deref().filter(|q| !q.is_empty()));

        target
    }

    /// Remove configured parameters, keeping the raw encoding and order of the rest.
    fn filter_query(&self, query: &str) -> String {
        if self.strip_query_parameters.is_empty() {
            return query.to_owned();
        }

        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let key = form_urlencoded::parse(pair.as_bytes())
                    .next()
                    .map(|(key, _)| key.into_owned())
                    .unwrap_or_default();
                !self.strip_query_parameters.contains(&key)
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RewriteConfig;

    fn factory(host: &str, rewrite: Option<RewriteConfig>) -> UpstreamUrlFactory {
        UpstreamUrlFactory::new(&UpstreamConfig {
            host: host.into(),
            rewrite,
        })
        .unwrap()
    }

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    #[test]
    fn test_host_replaced_without_rewrite() {
        let factory = factory("bar.foo", None);
        let result = factory.create_url(&url("http://foo.bar:8888/foo/bar?baz=zab"));
        assert_eq!(result.as_str(), "http://bar.foo/foo/bar?baz=zab");
    }

    #[test]
    fn test_full_rewrite() {
        let factory = factory(
            "bar.foo",
            Some(RewriteConfig {
                scheme: Some("https".into()),
                strip_path_prefix: Some("/foo".into()),
                add_path_prefix: Some("/baz".into()),
                strip_query_parameters: Some(vec!["bar".into()]),
            }),
        );

        let result = factory.create_url(&url("http://foo.bar:8888/foo/bar?bar=foo&foo=bar"));
        assert_eq!(result.as_str(), "https://bar.foo/baz/bar?foo=bar");
    }

    #[test]
    fn test_upstream_port_and_query_removal() {
        let factory = factory(
            "backend:8080",
            Some(RewriteConfig {
                strip_query_parameters: Some(vec!["token".into()]),
                ..Default::default()
            }),
        );

        let result = factory.create_url(&url("http://foo.bar/api?token=secret"));
        assert_eq!(result.as_str(), "http://backend:8080/api");
    }

    #[test]
    fn test_strip_prefix_only_when_present() {
        let factory = factory(
            "bar.foo",
            Some(RewriteConfig {
                strip_path_prefix: Some("/api".into()),
                ..Default::default()
            }),
        );

        let result = factory.create_url(&url("http://foo.bar/other/api"));
        assert_eq!(result.path(), "/other/api");
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(UpstreamUrlFactory::new(&UpstreamConfig {
            host: "bad host".into(),
            rewrite: None,
        })
        .is_err());

        assert!(UpstreamUrlFactory::new(&UpstreamConfig {
            host: "bar.foo".into(),
            rewrite: Some(RewriteConfig {
                scheme: Some("ftp".into()),
                ..Default::default()
            }),
        })
        .is_err());
    }
}
