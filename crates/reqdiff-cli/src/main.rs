//! reqdiff command-line runner
//!
//! Runs the commands of a YAML run file against its hosts and prints the
//! outcomes, or lines up two hosts' responses for one command.

mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqdiff_compare::{prepare_comparison, suggest_next_segments};
use reqdiff_config::{load_run_file, RunConfig, RunFile};
use reqdiff_core::{command, HostSpec, RequestTemplate};
use reqdiff_exec::{HttpTransport, PairCompleted, ProxyTransport, Scheduler};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "reqdiff")]
#[command(about = "Run the same HTTP requests against several hosts and compare the responses")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every command against every host
    Run {
        /// YAML run file
        file: PathBuf,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two hosts' responses to one command
    Compare {
        /// YAML run file
        file: PathBuf,

        /// Command number, starting at 1
        #[arg(long, default_value_t = 1)]
        command: usize,

        /// Reference host number, starting at 1
        #[arg(long, default_value_t = 1)]
        reference: usize,

        /// Host number to compare against the reference
        #[arg(long, default_value_t = 2)]
        against: usize,

        /// Path expression narrowing both payloads, e.g. `$.items[*].id`
        #[arg(long, default_value = "")]
        scope: String,

        /// Prefix each printed line with the path that produced it
        #[arg(long)]
        annotate: bool,
    },

    /// Suggest path segments below a prefix, across every host's response
    Paths {
        /// YAML run file
        file: PathBuf,

        /// Command number, starting at 1
        #[arg(long, default_value_t = 1)]
        command: usize,

        /// Path to list segments under
        #[arg(long, default_value = "$")]
        prefix: String,

        /// Only segments starting with this text
        #[arg(long, default_value = "")]
        partial: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, json } => run(file, json).await,
        Command::Compare {
            file,
            command,
            reference,
            against,
            scope,
            annotate,
        } => compare(file, command, reference, against, &scope, annotate).await,
        Command::Paths {
            file,
            command,
            prefix,
            partial,
        } => paths(file, command, &prefix, &partial).await,
    }
}

struct Session {
    run: RunFile,
    config: RunConfig,
    hosts: Vec<HostSpec>,
    scheduler: Scheduler,
}

fn open_session(file: &Path, progress: Option<mpsc::UnboundedSender<PairCompleted>>) -> Result<Session> {
    let run = load_run_file(file).with_context(|| format!("loading {}", file.display()))?;
    let config = run.apply_to(RunConfig::from_env()?);
    let hosts = run.host_specs();
    info!(
        hosts = hosts.len(),
        commands = run.commands.len(),
        mode = %config.mode,
        timeout_secs = config.timeout.as_secs(),
        proxy_fallback = config.proxy_fallback,
        "Loaded run file"
    );

    let client = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;
    let mut scheduler = Scheduler::new(Arc::new(HttpTransport::with_client(client.clone())))
        .with_timeout(config.timeout);
    if config.proxy_fallback {
        scheduler = scheduler.with_fallback(Arc::new(ProxyTransport::new(client)));
    }
    if let Some(progress) = progress {
        scheduler = scheduler.with_progress(progress);
    }

    Ok(Session {
        run,
        config,
        hosts,
        scheduler,
    })
}

async fn run(file: PathBuf, json: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = open_session(&file, Some(tx))?;

    let mut templates = Vec::new();
    let mut sources = Vec::new();
    for (i, text) in session.run.commands.iter().enumerate() {
        match command::validate(text) {
            Ok(()) => {
                if !command::has_placeholder(text) {
                    if let Some(suggestion) = command::auto_detect_placeholder(text) {
                        report::suggestion(i + 1, &suggestion);
                    }
                }
                templates.push(command::parse(text));
                sources.push(i + 1);
            }
            Err(e) => {
                warn!(command = i + 1, error = %e, "Skipping invalid command");
                report::invalid(i + 1, text, &e);
            }
        }
    }
    if templates.is_empty() {
        bail!("no valid commands to run");
    }

    let mode = session.config.mode;
    let total = templates.len() * session.hosts.len();
    let watcher = tokio::spawn(async move {
        let mut done = 0;
        while let Some(pair) = rx.recv().await {
            done += 1;
            debug!(
                template = pair.template_index,
                host = %pair.outcome.host,
                status = %pair.outcome.status_label(),
                "{done}/{total} finished"
            );
        }
    });

    let results = session.scheduler.run_matrix(&templates, &session.hosts, mode).await;
    drop(session);
    watcher.await.context("progress watcher")?;

    if json {
        let document: Vec<Value> = sources
            .iter()
            .zip(&templates)
            .zip(&results)
            .map(|((number, template), outcomes)| {
                serde_json::json!({
                    "command": number,
                    "source": template.source,
                    "outcomes": outcomes,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        for ((number, template), outcomes) in sources.iter().zip(&templates).zip(&results) {
            report::outcomes(*number, template, outcomes);
        }
    }
    Ok(())
}

fn pick_template(run: &RunFile, number: usize) -> Result<RequestTemplate> {
    let Some(text) = number.checked_sub(1).and_then(|i| run.commands.get(i)) else {
        bail!("command {number} does not exist (run file has {})", run.commands.len());
    };
    command::validate(text).with_context(|| format!("command {number} is invalid"))?;
    Ok(command::parse(text))
}

fn pick_host(hosts: &[HostSpec], number: usize, role: &str) -> Result<HostSpec> {
    match number.checked_sub(1).and_then(|i| hosts.get(i)) {
        Some(host) => Ok(host.clone()),
        None => bail!("{role} host {number} does not exist (run file has {})", hosts.len()),
    }
}

async fn compare(
    file: PathBuf,
    command: usize,
    reference: usize,
    against: usize,
    scope: &str,
    annotate: bool,
) -> Result<()> {
    let session = open_session(&file, None)?;
    let template = pick_template(&session.run, command)?;
    let pair = [
        pick_host(&session.hosts, reference, "reference")?,
        pick_host(&session.hosts, against, "comparison")?,
    ];

    let outcomes = session.scheduler.run_single(command - 1, &template, &pair).await;
    let prepared = prepare_comparison(&outcomes[0], &outcomes[1], &session.run.options, scope)?;

    report::comparison(&outcomes[0], &outcomes[1], &prepared, annotate.then_some(scope));
    Ok(())
}

async fn paths(file: PathBuf, command: usize, prefix: &str, partial: &str) -> Result<()> {
    let session = open_session(&file, None)?;
    let template = pick_template(&session.run, command)?;

    let outcomes = session.scheduler.run_single(command - 1, &template, &session.hosts).await;
    let samples: Vec<Value> = outcomes
        .iter()
        .filter_map(|o| o.response())
        .filter_map(|r| serde_json::from_str(&r.body).ok())
        .collect();
    if samples.is_empty() {
        bail!("no host returned a JSON body for command {command}");
    }

    for segment in suggest_next_segments(&samples, prefix, partial) {
        println!("{segment}");
    }
    Ok(())
}
