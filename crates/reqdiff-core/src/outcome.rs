//! Terminal results of dispatched requests

use crate::host::HostSpec;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Everything captured from a response that arrived, whatever its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseData {
    pub status: u16,
    /// Reason phrase, empty when the status has none
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseData {
    /// Check if the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value, matching the name case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Success or failure of one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeResult {
    /// A response arrived; 4xx and 5xx included
    Success(ResponseData),
    /// Transport error, DNS failure or timeout
    Failure { reason: String },
}

/// The outcome of one (template, host) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub host: HostSpec,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub result: OutcomeResult,
}

impl ExecutionOutcome {
    pub fn success(host: HostSpec, elapsed: Duration, response: ResponseData) -> Self {
        Self {
            host,
            elapsed,
            result: OutcomeResult::Success(response),
        }
    }

    pub fn failure(host: HostSpec, elapsed: Duration, reason: impl Into<String>) -> Self {
        Self {
            host,
            elapsed,
            result: OutcomeResult::Failure {
                reason: reason.into(),
            },
        }
    }

    pub fn response(&self) -> Option<&ResponseData> {
        match &self.result {
            OutcomeResult::Success(response) => Some(response),
            OutcomeResult::Failure { .. } => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.result {
            OutcomeResult::Failure { reason } => Some(reason),
            OutcomeResult::Success(_) => None,
        }
    }

    /// Short status label: `200 OK` or `failed: <reason>`
    pub fn status_label(&self) -> String {
        match &self.result {
            OutcomeResult::Success(response) if response.reason.is_empty() => {
                response.status.to_string()
            }
            OutcomeResult::Success(response) => format!("{} {}", response.status, response.reason),
            OutcomeResult::Failure { reason } => format!("failed: {reason}"),
        }
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
