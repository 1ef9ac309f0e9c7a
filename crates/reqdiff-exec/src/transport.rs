//! HTTP transports: direct via reqwest, or indirect through a local proxy

use async_trait::async_trait;
use indexmap::IndexMap;
use reqdiff_core::{ResolvedRequest, ResponseData};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Fixed local address of the indirect transport
pub const PROXY_URL: &str = "http://127.0.0.1:8787/proxy";

/// Why a request produced no response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the timeout
    #[error("timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// DNS or TCP failure before any response
    #[error("connection failed: {reason}")]
    Connect { reason: String },

    /// Request could not be built
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Any other transport failure
    #[error("request failed: {reason}")]
    Request { reason: String },

    /// The proxy was unreachable or replied with something unusable
    #[error("proxy error: {reason}")]
    Proxy { reason: String },
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        let reason = error_chain(&err);
        if err.is_timeout() {
            TransportError::Timeout { after: timeout }
        } else if err.is_connect() {
            TransportError::Connect { reason }
        } else if err.is_builder() {
            TransportError::InvalidRequest { reason }
        } else {
            TransportError::Request { reason }
        }
    }
}

/// Perform one HTTP call within a timeout
///
/// Any response that arrives is `Ok`, whatever its status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &ResolvedRequest,
        timeout: Duration,
    ) -> Result<ResponseData, TransportError>;
}

/// Direct transport backed by a shared reqwest client
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::InvalidRequest {
                reason: error_chain(&e),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ResolvedRequest,
        timeout: Duration,
    ) -> Result<ResponseData, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            TransportError::InvalidRequest {
                reason: format!("invalid method '{}'", request.method),
            }
        })?;

        let mut builder = self.client.request(method, &request.url).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;
        read_response(response, timeout).await
    }
}

async fn read_response(response: Response, timeout: Duration) -> Result<ResponseData, TransportError> {
    let status = response.status();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let body = response
        .text()
        .await
        .map_err(|e| TransportError::from_reqwest(e, timeout))?;

    Ok(ResponseData {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

#[derive(Serialize)]
struct ProxyEnvelope<'a> {
    method: &'a str,
    url: &'a str,
    headers: &'a IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

#[derive(Deserialize)]
struct ProxyReply {
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    body: String,
}

/// Indirect transport: hands the request to a local forwarding proxy
///
/// The request is POSTed as a JSON envelope; the proxy answers with the
/// target's status, headers and body in another envelope.
#[derive(Clone)]
pub struct ProxyTransport {
    client: Client,
    endpoint: String,
}

impl ProxyTransport {
    /// Proxy at the fixed [`PROXY_URL`]
    pub fn new(client: Client) -> Self {
        Self::at(client, PROXY_URL)
    }

    pub fn at(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn send(
        &self,
        request: &ResolvedRequest,
        timeout: Duration,
    ) -> Result<ResponseData, TransportError> {
        let envelope = ProxyEnvelope {
            method: &request.method,
            url: &request.url,
            headers: &request.headers,
            body: request.body.as_deref(),
        };
        trace!(endpoint = %self.endpoint, url = %request.url, "Forwarding through proxy");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Proxy {
                reason: format!("proxy answered {status}: {text}"),
            });
        }

        let reply: ProxyReply = response.json().await.map_err(|e| TransportError::Proxy {
            reason: format!("malformed proxy reply: {}", error_chain(&e)),
        })?;

        Ok(ResponseData {
            status: reply.status,
            reason: reply.status_text,
            headers: reply.headers.into_iter().collect(),
            body: reply.body,
        })
    }
}

/// Render an error with its sources, outermost first
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "outer")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "dns lookup failed"));
        assert_eq!(error_chain(&err), "outer: dns lookup failed");
    }

    #[test]
    fn test_timeout_message() {
        let err = TransportError::Timeout {
            after: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "timed out after 2000ms");
    }

    #[test]
    fn test_proxy_envelope_shape() {
        let mut headers = IndexMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        let envelope = ProxyEnvelope {
            method: "GET",
            url: "http://a.test/x",
            headers: &headers,
            body: None,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "method": "GET",
                "url": "http://a.test/x",
                "headers": {"Accept": "application/json"}
            })
        );
    }

    #[test]
    fn test_invalid_method_is_rejected_before_sending() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let transport = HttpTransport::new().unwrap();
        let request = ResolvedRequest {
            method: "BAD METHOD".to_string(),
            url: "http://127.0.0.1:1/".to_string(),
            headers: IndexMap::new(),
            body: None,
        };
        let err = rt
            .block_on(transport.send(&request, Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest { .. }));
    }
}
