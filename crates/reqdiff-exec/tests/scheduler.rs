//! Scheduler behaviour against a scripted transport

use async_trait::async_trait;
use reqdiff_core::{command, host, ResolvedRequest, ResponseData};
use reqdiff_exec::{ExecutionMode, Scheduler, Transport, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Answers based on the URL:
/// - `/fail` refuses to connect
/// - `/slow` never answers within a minute
/// - `/missing` answers 404
/// - anything else answers 200 echoing the URL
#[derive(Default)]
struct ScriptedTransport {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &ResolvedRequest,
        _timeout: Duration,
    ) -> Result<ResponseData, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = if request.url.ends_with("/slow") {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(10)
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.url.ends_with("/fail") {
            return Err(TransportError::Connect {
                reason: "connection refused".to_string(),
            });
        }
        let status = if request.url.ends_with("/missing") { 404 } else { 200 };
        Ok(ResponseData {
            status,
            reason: String::new(),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: request.url.clone(),
        })
    }
}

/// Always answers 200 with a fixed body
struct StaticTransport(&'static str);

#[async_trait]
impl Transport for StaticTransport {
    async fn send(
        &self,
        _request: &ResolvedRequest,
        _timeout: Duration,
    ) -> Result<ResponseData, TransportError> {
        Ok(ResponseData {
            status: 200,
            reason: "OK".to_string(),
            headers: Vec::new(),
            body: self.0.to_string(),
        })
    }
}

/// Always refuses
struct RefusingTransport;

#[async_trait]
impl Transport for RefusingTransport {
    async fn send(
        &self,
        _request: &ResolvedRequest,
        _timeout: Duration,
    ) -> Result<ResponseData, TransportError> {
        Err(TransportError::Proxy {
            reason: "proxy unreachable".to_string(),
        })
    }
}

fn templates(paths: &[&str]) -> Vec<command::RequestTemplate> {
    paths
        .iter()
        .map(|path| command::parse(&format!("curl {{host}}{path}")))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_per_template_overlaps_at_most_one_template() {
    let transport = Arc::new(ScriptedTransport::default());
    let scheduler = Scheduler::new(transport.clone());
    let hosts = host::parse_many(["a.test", "b.test", "c.test"]);

    let results = scheduler
        .run_matrix(&templates(&["/one", "/two"]), &hosts, ExecutionMode::PerTemplate)
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(transport.calls(), 6);
    assert!(transport.max_in_flight() <= hosts.len());
}

#[tokio::test(start_paused = true)]
async fn test_all_at_once_overlaps_every_pair() {
    let transport = Arc::new(ScriptedTransport::default());
    let scheduler = Scheduler::new(transport.clone());
    let hosts = host::parse_many(["a.test", "b.test", "c.test"]);

    scheduler
        .run_matrix(&templates(&["/one", "/two"]), &hosts, ExecutionMode::AllAtOnce)
        .await;

    assert_eq!(transport.max_in_flight(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_modes_group_outcomes_identically() {
    let hosts = host::parse_many(["a.test", "b.test"]);
    let templates = templates(&["/one", "/missing", "/fail"]);

    let mut bodies = Vec::new();
    for mode in [ExecutionMode::AllAtOnce, ExecutionMode::PerTemplate] {
        let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()));
        let results = scheduler.run_matrix(&templates, &hosts, mode).await;
        let labels: Vec<Vec<String>> = results
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|o| match o.response() {
                        Some(r) => format!("{} {}", r.status, r.body),
                        None => "failed".to_string(),
                    })
                    .collect()
            })
            .collect();
        bodies.push(labels);
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(
        bodies[0][0],
        vec!["200 http://a.test/one", "200 http://b.test/one"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_abort_siblings() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()));
    let hosts = host::parse_many(["a.test"]);

    let results = scheduler
        .run_matrix(&templates(&["/fail", "/ok"]), &hosts, ExecutionMode::AllAtOnce)
        .await;

    assert!(results[0][0].failure_reason().unwrap().contains("connection refused"));
    assert_eq!(results[1][0].status(), Some(200));
}

#[tokio::test(start_paused = true)]
async fn test_client_error_status_is_success() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()));
    let hosts = host::parse_many(["a.test"]);

    let outcomes = scheduler
        .run_single(0, &templates(&["/missing"])[0], &hosts)
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status(), Some(404));
    assert!(outcomes[0].failure_reason().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_keep_host_order() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()));
    let hosts = host::parse_many(["z.test", "a.test", "m.test"]);

    let outcomes = scheduler.run_single(0, &templates(&["/x"])[0], &hosts).await;

    let order: Vec<&str> = outcomes.iter().map(|o| o.host.hostname()).collect();
    assert_eq!(order, vec!["z.test", "a.test", "m.test"]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_hosts_give_empty_groups() {
    let transport = Arc::new(ScriptedTransport::default());
    let scheduler = Scheduler::new(transport.clone());

    let results = scheduler
        .run_matrix(&templates(&["/a", "/b"]), &[], ExecutionMode::AllAtOnce)
        .await;

    assert_eq!(results, vec![Vec::new(), Vec::new()]);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_becomes_failure() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()))
        .with_timeout(Duration::from_secs(1));
    let hosts = host::parse_many(["a.test"]);

    let outcomes = scheduler.run_single(0, &templates(&["/slow"])[0], &hosts).await;

    assert_eq!(outcomes[0].failure_reason(), Some("timed out after 1000ms"));
    assert!(outcomes[0].elapsed >= Duration::from_secs(1));
    assert!(outcomes[0].elapsed < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_rescues_failed_direct_call() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()))
        .with_fallback(Arc::new(StaticTransport("via proxy")));
    let hosts = host::parse_many(["a.test"]);

    let outcomes = scheduler.run_single(0, &templates(&["/fail"])[0], &hosts).await;

    assert_eq!(outcomes[0].response().unwrap().body, "via proxy");
}

#[tokio::test(start_paused = true)]
async fn test_fallback_not_used_when_direct_succeeds() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()))
        .with_fallback(Arc::new(StaticTransport("via proxy")));
    let hosts = host::parse_many(["a.test"]);

    let outcomes = scheduler.run_single(0, &templates(&["/ok"])[0], &hosts).await;

    assert_eq!(outcomes[0].response().unwrap().body, "http://a.test/ok");
}

#[tokio::test(start_paused = true)]
async fn test_both_failures_are_reported() {
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default()))
        .with_fallback(Arc::new(RefusingTransport));
    let hosts = host::parse_many(["a.test"]);

    let outcomes = scheduler.run_single(0, &templates(&["/fail"])[0], &hosts).await;

    let reason = outcomes[0].failure_reason().unwrap();
    assert!(reason.contains("connection refused"), "{reason}");
    assert!(reason.contains("proxy unreachable"), "{reason}");
}

#[tokio::test(start_paused = true)]
async fn test_progress_reports_every_pair() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default())).with_progress(tx);
    let hosts = host::parse_many(["a.test", "b.test"]);

    scheduler
        .run_matrix(&templates(&["/one", "/two", "/fail"]), &hosts, ExecutionMode::PerTemplate)
        .await;
    drop(scheduler);

    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        seen.push((event.template_index, event.host_index));
    }
    seen.sort();
    assert_eq!(seen, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
}

#[tokio::test(start_paused = true)]
async fn test_single_rerun_reports_its_template_index() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(Arc::new(ScriptedTransport::default())).with_progress(tx);
    let hosts = host::parse_many(["a.test", "b.test"]);

    scheduler.run_single(3, &templates(&["/again"])[0], &hosts).await;
    drop(scheduler);

    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        seen.push((event.template_index, event.host_index));
    }
    seen.sort();
    assert_eq!(seen, vec![(3, 0), (3, 1)]);
}
