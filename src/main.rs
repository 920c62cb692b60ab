use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use breakdown_agent::metrics::{category, name, trigger, unit};
use breakdown_agent::{
    Agent, AgentConfig, BreakdownNode, ErrorReporter, IntervalScheduler, Metric, MetricType,
    ReportHook,
};

mod workload;

/// How long the simulated application runs.
const RUN_SECS: u64 = 20;
const CONCURRENCY: u32 = 8;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── 1. Load configuration ────────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => match AgentConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(%path, error = %e, "cannot load agent config");
                std::process::exit(1);
            }
        },
        None => {
            let mut config = AgentConfig::new("breakdown-demo");
            config.report_interval_secs = 5;
            config
        }
    };
    info!(
        app = %config.app_name,
        env = %config.app_environment,
        host = %config.host_name,
        "agent configured"
    );

    // ── 2. Wire agent, reporter and scheduler ────────────────────
    let period = Duration::from_secs(config.report_interval_secs);
    let agent = Arc::new(Agent::new(config));
    let errors = Arc::new(ErrorReporter::new(agent.clone()));
    errors.start();

    let scheduler = IntervalScheduler::new(errors.clone() as Arc<dyn ReportHook>, period);
    scheduler.start();

    // ── 3. Stand-in transport: print whatever gets queued ────────
    let shipper = {
        let agent = agent.clone();
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(Duration::from_secs(1)));
            while ticks.next().await.is_some() {
                ship(&agent);
            }
        })
    };

    // ── 4. Run the simulated application ─────────────────────────
    let latency = Arc::new(BreakdownNode::new(name::HTTP_TRANSACTION_BREAKDOWN));
    let mut raised_errors = Metric::new(
        &agent,
        MetricType::Counter,
        category::RUNTIME,
        "Raised errors",
        unit::NONE,
    );
    raised_errors.create_measurement(trigger::TIMER, 0.0, 0, None);

    let running = Arc::new(AtomicBool::new(true));
    let raised = workload::run(
        running,
        errors.clone(),
        latency.clone(),
        CONCURRENCY,
        RUN_SECS,
    )
    .await;

    // ── 5. Final flush ───────────────────────────────────────────
    scheduler.stop();
    errors.stop();
    scheduler.trigger_anomaly();

    let latency = Arc::try_unwrap(latency).unwrap_or_else(|shared| BreakdownNode::clone(&shared));
    latency.evaluate_p95();
    let slowest = latency.max_child().map(|c| c.measurement()).unwrap_or(0.0);
    let mut latency_metric = Metric::new(
        &agent,
        MetricType::Profile,
        category::HTTP_TRACE,
        name::HTTP_TRANSACTION_BREAKDOWN,
        unit::MILLISECOND,
    );
    latency_metric.create_measurement(trigger::TIMER, slowest, RUN_SECS, Some(latency));

    raised_errors.create_measurement(trigger::TIMER, raised as f64, RUN_SECS, None);

    for metric in [&latency_metric, &raised_errors] {
        if let Err(e) = agent
            .queue()
            .add_message(breakdown_agent::queue::KIND_METRIC, metric.to_envelope())
        {
            error!(error = %e, "cannot queue final metric");
        }
    }

    ship(&agent);
    shipper.abort();
    info!(raised, "done");
}

/// Drains the outbound queue to stdout, one JSON message per line.
fn ship(agent: &Agent) {
    for message in agent.queue().drain() {
        match serde_json::to_string(&message) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "cannot serialize message"),
        }
    }
}
