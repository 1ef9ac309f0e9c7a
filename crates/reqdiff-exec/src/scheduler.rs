//! Fans templates across hosts and collects one outcome per pair

use crate::transport::{Transport, TransportError};
use futures::future::join_all;
use reqdiff_core::resolve::{self, ResolvedRequest};
use reqdiff_core::{ExecutionOutcome, HostSpec, RequestTemplate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Timeout applied to every dispatch unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of the matrix is in flight at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Every (template, host) pair dispatched together
    #[default]
    AllAtOnce,
    /// One template at a time, its hosts dispatched together
    PerTemplate,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown execution mode '{0}', expected 'all-at-once' or 'per-template'")]
pub struct ParseModeError(String);

impl FromStr for ExecutionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all-at-once" | "all" => Ok(ExecutionMode::AllAtOnce),
            "per-template" | "sequential" => Ok(ExecutionMode::PerTemplate),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::AllAtOnce => write!(f, "all-at-once"),
            ExecutionMode::PerTemplate => write!(f, "per-template"),
        }
    }
}

/// Signal sent as each pair finishes
#[derive(Debug, Clone)]
pub struct PairCompleted {
    pub template_index: usize,
    pub host_index: usize,
    pub outcome: ExecutionOutcome,
}

/// Executes resolved requests through an injected transport
///
/// With a fallback transport configured, a failed direct call is retried
/// exactly once through the fallback before being reported as failed.
#[derive(Clone)]
pub struct Scheduler {
    transport: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
    timeout: Duration,
    progress: Option<mpsc::UnboundedSender<PairCompleted>>,
}

impl Scheduler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            fallback: None,
            timeout: DEFAULT_TIMEOUT,
            progress: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Transport>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Report every finished pair on `sender`; aggregation is unaffected
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<PairCompleted>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Dispatch one request and record how it ended
    ///
    /// Every received status is a success; only transport failures and
    /// timeouts become failure outcomes. Elapsed time covers the fallback
    /// attempt when one is made.
    pub async fn run_one(&self, host: &HostSpec, request: &ResolvedRequest) -> ExecutionOutcome {
        let start = Instant::now();
        debug!(method = %request.method, url = %request.url, "Dispatching request");

        let direct_error = match self.attempt(self.transport.as_ref(), request).await {
            Ok(response) => {
                let elapsed = start.elapsed();
                debug!(url = %request.url, status = response.status, ?elapsed, "Request completed");
                return ExecutionOutcome::success(host.clone(), elapsed, response);
            }
            Err(error) => error,
        };

        let Some(fallback) = &self.fallback else {
            warn!(url = %request.url, error = %direct_error, "Request failed");
            return ExecutionOutcome::failure(host.clone(), start.elapsed(), direct_error.to_string());
        };

        warn!(url = %request.url, error = %direct_error, "Direct request failed, retrying through fallback");
        match self.attempt(fallback.as_ref(), request).await {
            Ok(response) => ExecutionOutcome::success(host.clone(), start.elapsed(), response),
            Err(fallback_error) => {
                warn!(url = %request.url, error = %fallback_error, "Fallback request failed");
                ExecutionOutcome::failure(
                    host.clone(),
                    start.elapsed(),
                    format!("{direct_error}; fallback: {fallback_error}"),
                )
            }
        }
    }

    async fn attempt(
        &self,
        transport: &dyn Transport,
        request: &ResolvedRequest,
    ) -> Result<reqdiff_core::ResponseData, TransportError> {
        match tokio::time::timeout(self.timeout, transport.send(request, self.timeout)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                after: self.timeout,
            }),
        }
    }

    /// Run every template against every host
    ///
    /// The result has one entry per template, in template order, each with
    /// one outcome per host, in host order. Both modes produce the same
    /// grouping; they differ only in how many requests overlap.
    pub async fn run_matrix(
        &self,
        templates: &[RequestTemplate],
        hosts: &[HostSpec],
        mode: ExecutionMode,
    ) -> Vec<Vec<ExecutionOutcome>> {
        info!(
            templates = templates.len(),
            hosts = hosts.len(),
            %mode,
            "Running request matrix"
        );

        if hosts.is_empty() {
            return templates.iter().map(|_| Vec::new()).collect();
        }

        match mode {
            ExecutionMode::AllAtOnce => {
                let pairs: Vec<(usize, usize, ResolvedRequest)> = templates
                    .iter()
                    .enumerate()
                    .flat_map(|(t, template)| {
                        resolve::batch_resolve(template, hosts)
                            .into_iter()
                            .enumerate()
                            .map(move |(h, request)| (t, h, request))
                    })
                    .collect();

                let outcomes = join_all(
                    pairs
                        .into_iter()
                        .map(|(t, h, request)| self.dispatch(t, h, &hosts[h], request)),
                )
                .await;

                let mut outcomes = outcomes.into_iter();
                templates
                    .iter()
                    .map(|_| outcomes.by_ref().take(hosts.len()).collect())
                    .collect()
            }
            ExecutionMode::PerTemplate => {
                let mut grouped = Vec::with_capacity(templates.len());
                for (t, template) in templates.iter().enumerate() {
                    grouped.push(self.run_template(t, template, hosts).await);
                }
                grouped
            }
        }
    }

    /// Re-run one template against the given hosts, all hosts at once
    ///
    /// `template_index` is the template's position in the original run and
    /// tags the progress signals.
    pub async fn run_single(
        &self,
        template_index: usize,
        template: &RequestTemplate,
        hosts: &[HostSpec],
    ) -> Vec<ExecutionOutcome> {
        info!(template_index, url = %template.url, hosts = hosts.len(), "Re-running single template");
        self.run_template(template_index, template, hosts).await
    }

    async fn run_template(
        &self,
        template_index: usize,
        template: &RequestTemplate,
        hosts: &[HostSpec],
    ) -> Vec<ExecutionOutcome> {
        let requests = resolve::batch_resolve(template, hosts);
        join_all(
            requests
                .into_iter()
                .zip(hosts)
                .enumerate()
                .map(|(h, (request, host))| self.dispatch(template_index, h, host, request)),
        )
        .await
    }

    async fn dispatch(
        &self,
        template_index: usize,
        host_index: usize,
        host: &HostSpec,
        request: ResolvedRequest,
    ) -> ExecutionOutcome {
        let outcome = self.run_one(host, &request).await;
        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = progress.send(PairCompleted {
                template_index,
                host_index,
                outcome: outcome.clone(),
            });
        }
        outcome
    }
}
