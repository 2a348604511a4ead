//! analytics-worker: runs analytics against a fixture-seeded store.
//!
//! Loads a YAML fixture (graph, series, workflows and analytic
//! definitions), then either evaluates every analytic once or keeps polling
//! the schedule until Ctrl-C. Each `(entity, execution time)` result is
//! printed to stdout as one JSON line.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use vigil_core::{format_millis, now_millis, parse_timestamp, Config};
use vigil_notify::{Channel, ChatNotifier, Dispatcher, LogNotifier, SmsNotifier};
use vigil_rules::algorithms::AlgorithmRegistry;
use vigil_rules::context::Collaborators;
use vigil_rules::fixture::AnalyticsFixture;
use vigil_rules::runner::{Runner, UnitReport};
use vigil_rules::scheduler::AnalyticScheduler;
use vigil_rules::schema::{AnalyticDefinition, AnalyticPlan};

// ── CLI ─────────────────────────────────────────────────────────────

/// Analytics worker: catch-up evaluation of building analytics.
#[derive(Parser, Debug)]
#[command(name = "analytics-worker", version, about)]
struct Cli {
    /// YAML fixture holding the store seed and the analytics.
    #[arg(long, env = "VIGIL_FIXTURE")]
    fixture: PathBuf,

    /// Replay every tick since this instant (epoch ms or RFC 3339).
    #[arg(long)]
    since: Option<String>,

    /// Keep polling the schedule until Ctrl-C.
    #[arg(long)]
    watch: bool,

    /// Poll interval in seconds (overrides VIGIL_POLL_INTERVAL_SECS).
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Entities evaluated concurrently (overrides VIGIL_CONCURRENCY).
    #[arg(long)]
    concurrency: Option<usize>,
}

// ── Notifiers ───────────────────────────────────────────────────────

/// Real gateways when configured, a tracing-only notifier otherwise.
fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let mut dispatcher = Dispatcher::empty();

    match &config.sms.gateway_url {
        Some(url) => dispatcher.register(
            Channel::Sms,
            Box::new(SmsNotifier::from_config(
                url.clone(),
                config.sms.api_key.clone(),
                config.sms.sender.clone(),
            )?),
        ),
        None => dispatcher.register(Channel::Sms, Box::new(LogNotifier::new("sms-log"))),
    }
    match &config.chat.webhook_url {
        Some(url) => dispatcher.register(Channel::Chat, Box::new(ChatNotifier::from_config(url.clone())?)),
        None => dispatcher.register(Channel::Chat, Box::new(LogNotifier::new("chat-log"))),
    }
    Ok(dispatcher)
}

fn print_reports(reports: &[UnitReport]) -> anyhow::Result<()> {
    for report in reports {
        println!("{}", serde_json::to_string(report)?);
    }
    Ok(())
}

// ── Passes ──────────────────────────────────────────────────────────

/// Run every pending batch and advance the book for the completed ones.
async fn run_due(
    runner: &Runner,
    scheduler: &mut AnalyticScheduler,
    plans: &HashMap<String, AnalyticPlan>,
) -> anyhow::Result<()> {
    let now = now_millis();
    for batch in scheduler.due(now) {
        let Some(plan) = plans.get(&batch.analytic_id) else {
            continue;
        };
        if batch.times.is_empty() {
            scheduler.record_execution(&batch.analytic_id, batch.complete_at);
            continue;
        }
        match runner.run(plan, &batch.times).await {
            Ok(reports) => {
                print_reports(&reports)?;
                scheduler.record_execution(&batch.analytic_id, batch.complete_at);
                info!(
                    analytic = %batch.analytic_id,
                    times = batch.times.len(),
                    completed_at = %format_millis(batch.complete_at),
                    "batch complete"
                );
            }
            Err(e) => error!(analytic = %batch.analytic_id, error = %e, "batch failed"),
        }
    }
    Ok(())
}

/// Evaluate every analytic once at the current instant.
async fn run_once(runner: &Runner, plans: &HashMap<String, AnalyticPlan>) -> anyhow::Result<()> {
    let now = now_millis();
    let mut ids: Vec<&String> = plans.keys().collect();
    ids.sort();
    for id in ids {
        match runner.run(&plans[id], &[now]).await {
            Ok(reports) => print_reports(&reports)?,
            Err(e) => error!(analytic = %id, error = %e, "analytic failed"),
        }
    }
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vigil_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(concurrency) = cli.concurrency {
        config.engine.concurrency = concurrency.max(1);
    }
    if let Some(secs) = cli.poll_interval {
        config.worker.poll_interval_secs = secs.max(1);
    }
    config.log_summary();

    let registry = Arc::new(AlgorithmRegistry::with_builtins());
    let fixture = AnalyticsFixture::from_path(&cli.fixture)?;
    let (store, plans) = fixture.load(&registry)?;
    info!(path = %cli.fixture.display(), analytics = plans.len(), "fixture loaded");

    let collab = Collaborators::from_store(Arc::new(store), build_dispatcher(&config)?);
    let runner = Runner::new(collab, registry, config.engine.clone());

    let definitions: Vec<AnalyticDefinition> = plans.iter().map(|p| p.definition.clone()).collect();
    let plans: HashMap<String, AnalyticPlan> =
        plans.into_iter().map(|p| (p.id().to_string(), p)).collect();

    let since = cli.since.as_deref().map(parse_timestamp).transpose()?;
    let mut scheduler = AnalyticScheduler::new(config.engine.max_ticks);
    scheduler.sync(&definitions, now_millis());
    if let Some(since) = since {
        for id in plans.keys() {
            scheduler.set_last_executed(id, since);
        }
        info!(since = %format_millis(since), "replaying missed executions");
    }

    if !cli.watch {
        match since {
            Some(_) => run_due(&runner, &mut scheduler, &plans).await?,
            None => run_once(&runner, &plans).await?,
        }
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.worker.poll_interval_secs));
    info!(poll_secs = config.worker.poll_interval_secs, "analytics-worker polling");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_due(&runner, &mut scheduler, &plans).await {
                    warn!(error = %e, "polling pass failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("analytics-worker shutting down");
                break;
            }
        }
    }
    Ok(())
}
