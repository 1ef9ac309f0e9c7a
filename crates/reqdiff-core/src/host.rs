//! Host specification: free-form host text reduced to a canonical base URL
//!
//! Users type hosts in whatever shape is at hand: `api.example.com`,
//! `localhost:8080`, `10.0.0.7`, or `https://staging.example.com/v2/`.
//! [`HostSpec::parse`] turns all of these into a base URL that the
//! placeholder resolver can splice request paths onto.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};
use url::{Host, Url};

/// Scheme assumed when the host text does not carry one
pub const DEFAULT_SCHEME: &str = "http";

/// Longest DNS label accepted by [`validate`]
const MAX_LABEL_LEN: usize = 63;

/// Error type for host text rejected by [`validate`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// Blank host text
    #[error("host cannot be empty")]
    Empty,

    /// Text that does not parse as a URL even with a scheme added
    #[error("'{text}' is not a valid host or URL")]
    Unparseable { text: String },

    /// Hostname that is neither a DNS name nor an IP address
    #[error("hostname '{hostname}' must be a DNS name or a dotted-quad IPv4 address")]
    InvalidHostname { hostname: String },

    /// DNS label with a bad length or character
    #[error(
        "label '{label}' in hostname '{hostname}' must be 1-63 characters of letters, digits or hyphens"
    )]
    InvalidLabel { hostname: String, label: String },
}

/// A host the request matrix is executed against
///
/// Immutable once built: editing a host means parsing new text into a new
/// `HostSpec`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HostSpec {
    original: String,
    base_url: String,
    hostname: String,
}

impl HostSpec {
    /// Parse free-form host text. Never fails.
    ///
    /// Text that cannot be read as a URL is treated as a bare hostname with
    /// the default scheme in front of it.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match parse_url(trimmed) {
            Some(url) => Self::from_url(text, &with_scheme(trimmed), &url),
            None => {
                debug!(host = trimmed, "Host text is not a URL, using it as a bare hostname");
                Self {
                    original: text.to_string(),
                    base_url: format!("{DEFAULT_SCHEME}://{trimmed}"),
                    hostname: trimmed.to_string(),
                }
            }
        }
    }

    fn from_url(original: &str, prefixed: &str, url: &Url) -> Self {
        let hostname = match url.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        };

        let mut authority = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            authority.push(':');
            authority.push_str(&port.to_string());
        }

        // Url always reports at least "/", so only keep a path the user typed
        let path = if has_explicit_path(prefixed) {
            let path = url.path();
            if path == "/" {
                path
            } else {
                path.strip_suffix('/').unwrap_or(path)
            }
        } else {
            ""
        };

        let base_url = format!("{}://{}{}", url.scheme(), authority, path);
        trace!(host = original, base_url = %base_url, "Parsed host");

        Self {
            original: original.to_string(),
            base_url,
            hostname,
        }
    }

    /// The text this spec was parsed from
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Scheme, authority and optional path; no trailing slash unless the
    /// path is exactly `/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bare hostname without scheme, port or path
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

impl FromStr for HostSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for HostSpec {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<HostSpec> for String {
    fn from(host: HostSpec) -> Self {
        host.original
    }
}

/// Parse host text into a [`HostSpec`]
pub fn parse(text: &str) -> HostSpec {
    HostSpec::parse(text)
}

/// Parse a list of host texts, splitting each entry on commas
///
/// Empty segments are dropped. Order is preserved: callers treat the first
/// host as the default reference. Accepts a single string as well as a list:
///
/// ```
/// let hosts = reqdiff_core::host::parse_many(["a.example.com, b.example.com"]);
/// assert_eq!(hosts.len(), 2);
/// ```
pub fn parse_many<I, S>(items: I) -> Vec<HostSpec>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .flat_map(|item| {
            item.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(HostSpec::parse)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Check that host text names a usable host
pub fn validate(text: &str) -> Result<(), HostError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(HostError::Empty);
    }

    let url = parse_url(trimmed).ok_or_else(|| HostError::Unparseable {
        text: trimmed.to_string(),
    })?;

    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => Ok(()),
        Some(Host::Domain(domain)) => validate_hostname(domain),
        None => Err(HostError::Unparseable {
            text: trimmed.to_string(),
        }),
    }
}

fn validate_hostname(hostname: &str) -> Result<(), HostError> {
    if hostname.is_empty() {
        return Err(HostError::InvalidHostname {
            hostname: hostname.to_string(),
        });
    }

    for label in hostname.split('.') {
        let valid = !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(HostError::InvalidLabel {
                hostname: hostname.to_string(),
                label: label.to_string(),
            });
        }
    }

    Ok(())
}

fn has_scheme(text: &str) -> bool {
    match text.find("://") {
        Some(idx) if idx > 0 => {
            let scheme = &text[..idx];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn with_scheme(text: &str) -> Cow<'_, str> {
    if has_scheme(text) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{DEFAULT_SCHEME}://{text}"))
    }
}

/// Whether the text after `scheme://` carries a path component
fn has_explicit_path(prefixed: &str) -> bool {
    let rest = prefixed
        .find("://")
        .map(|idx| &prefixed[idx + 3..])
        .unwrap_or(prefixed);
    rest.find(['/', '?', '#'])
        .map(|idx| rest[idx..].starts_with('/'))
        .unwrap_or(false)
}

fn parse_url(trimmed: &str) -> Option<Url> {
    if trimmed.is_empty() {
        return None;
    }
    Url::parse(&with_scheme(trimmed))
        .ok()
        .filter(|url| url.host_str().is_some_and(|host| !host.is_empty()))
}
