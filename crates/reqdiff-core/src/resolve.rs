//! Placeholder resolution: one template plus one host gives one request

use crate::command::{RequestTemplate, PLACEHOLDER};
use crate::host::HostSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

/// A template with its placeholder substituted for one concrete host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub method: String,
    /// Always absolute
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}

/// Resolve a template against one host
///
/// With a placeholder in the URL, the host's base URL replaces it and is
/// joined to the rest with exactly one slash. Without one, the URL is
/// resolved relative to the base URL. Headers and body only get literal
/// placeholder substitution.
pub fn resolve(template: &RequestTemplate, host: &HostSpec) -> ResolvedRequest {
    let base = host.base_url();

    let url = match template.url.split_once(PLACEHOLDER) {
        Some((prefix, rest)) => {
            if !prefix.is_empty() {
                trace!(prefix, "Dropping text before the placeholder");
            }
            join_base(base, &rest.replace(PLACEHOLDER, base))
        }
        None => resolve_relative(base, &template.url),
    };

    let headers = template
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), value.replace(PLACEHOLDER, base)))
        .collect();
    let body = template
        .body
        .as_ref()
        .map(|body| body.replace(PLACEHOLDER, base));

    ResolvedRequest {
        method: template.method.clone(),
        url,
        headers,
        body,
    }
}

/// Resolve a template against every host, in host order
pub fn batch_resolve(template: &RequestTemplate, hosts: &[HostSpec]) -> Vec<ResolvedRequest> {
    hosts.iter().map(|host| resolve(template, host)).collect()
}

fn join_base(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        return base.to_string();
    }
    if rest.starts_with('?') || rest.starts_with('#') {
        return format!("{base}{rest}");
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        rest.trim_start_matches('/')
    )
}

fn resolve_relative(base: &str, url: &str) -> String {
    if url.is_empty() {
        return base.to_string();
    }
    match Url::parse(base).and_then(|base_url| base_url.join(url)) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            trace!(base, url, error = %e, "Relative resolution failed, joining as text");
            join_base(base, url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parse;
    use crate::host;

    #[test]
    fn test_placeholder_with_bare_host() {
        let template = parse("curl {host}/users");
        let request = resolve(&template, &host::parse("api.example.com"));
        assert_eq!(request.url, "http://api.example.com/users");
        assert_eq!(request.method, "GET");
    }

    #[test]
    fn test_exactly_one_separating_slash() {
        let template = parse("curl {host}//users");
        let request = resolve(&template, &host::parse("https://example.com/"));
        assert_eq!(request.url, "https://example.com/users");

        let template = parse("curl {host}users");
        let request = resolve(&template, &host::parse("https://example.com/api"));
        assert_eq!(request.url, "https://example.com/api/users");
    }

    #[test]
    fn test_placeholder_alone_and_query() {
        let host = host::parse("example.com:8080");
        assert_eq!(resolve(&parse("curl {host}"), &host).url, "http://example.com:8080");
        assert_eq!(
            resolve(&parse("curl '{host}?a=1'"), &host).url,
            "http://example.com:8080?a=1"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let request = resolve(
            &parse("curl {host}/users"),
            &host::parse("https://gw.example.com/v2"),
        );
        assert_eq!(request.url, "https://gw.example.com/v2/users");
    }

    #[test]
    fn test_headers_and_body_substitution() {
        let template = parse(r#"curl -H 'Origin: {host}' -d '{"cb":"{host}/hook"}' {host}/x"#);
        let request = resolve(&template, &host::parse("a.test"));
        assert_eq!(
            request.headers.get("Origin").map(String::as_str),
            Some("http://a.test")
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"cb":"http://a.test/hook"}"#));
    }

    #[test]
    fn test_relative_resolution_without_placeholder() {
        let host = host::parse("https://example.com/api/v1");
        assert_eq!(
            resolve(&parse("curl /health"), &host).url,
            "https://example.com/health"
        );
        assert_eq!(
            resolve(&parse("curl status"), &host).url,
            "https://example.com/api/status"
        );
        assert_eq!(
            resolve(&parse("curl http://other.test/x"), &host).url,
            "http://other.test/x"
        );
        assert_eq!(resolve(&parse("curl -s"), &host).url, "https://example.com/api/v1");
    }

    #[test]
    fn test_batch_resolve_keeps_host_order() {
        let hosts = host::parse_many(["b.test,a.test,c.test"]);
        let requests = batch_resolve(&parse("curl {host}/p"), &hosts);
        let urls: Vec<_> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["http://b.test/p", "http://a.test/p", "http://c.test/p"]);
    }
}
