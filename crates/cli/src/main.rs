//! DefectRelay CLI
//!
//! Replays a file of completed-test outcome events into the enabled tracker
//! backends: one dispatch per event, exactly as the teardown hook would have
//! issued it. Reporting failures are logged, never fatal; the exit code only
//! reflects startup problems.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relay_common::{ArtifactLocator, RelayConfig};
use relay_dispatch::{Orchestrator, OutcomeEvent};
use relay_trackers::{KanbanClient, TrackerAdapter, WorkflowClient};

#[derive(Parser)]
#[command(name = "defect-relay")]
#[command(about = "Report automated-test outcomes into defect trackers")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Outcome events file (JSON array of completed tests)
    #[arg(short, long)]
    events: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("DefectRelay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::load(&cli.config)?;
    let adapters = build_adapters(&config);
    if adapters.is_empty() {
        anyhow::bail!("no tracker backend is enabled and configured; nothing to report to");
    }

    let events: Vec<OutcomeEvent> =
        serde_json::from_str(&std::fs::read_to_string(&cli.events)?)?;
    info!(
        "dispatching {} outcome event(s) to {} backend(s)",
        events.len(),
        adapters.len()
    );

    let orchestrator = Orchestrator::new(
        config.environment.clone(),
        adapters,
        ArtifactLocator::new(&config.evidence),
    );

    let mut skipped = 0;
    for event in &events {
        for report in orchestrator.dispatch(event).await {
            match (&report.action, &report.error) {
                (Some(action), _) => info!(
                    "✓ {} [{}] {} (record {:?}, {} attachment(s))",
                    event.display_name, report.backend, action, report.record_id, report.attachments
                ),
                (None, Some(err)) => {
                    skipped += 1;
                    error!("✗ {} [{}] skipped: {}", event.display_name, report.backend, err);
                }
                (None, None) => {}
            }
        }
    }

    if skipped > 0 {
        warn!("{} backend report(s) were skipped; see the log above", skipped);
    }
    Ok(())
}

/// Build an adapter per enabled backend. A backend whose configuration is
/// incomplete is disabled on its own; the others stay usable.
fn build_adapters(config: &RelayConfig) -> Vec<Arc<dyn TrackerAdapter>> {
    let timeout = Duration::from_secs(config.http.timeout_secs);
    let mut adapters: Vec<Arc<dyn TrackerAdapter>> = Vec::new();

    if config.kanban.enabled {
        match KanbanClient::new(&config.kanban, timeout) {
            Ok(client) => adapters.push(Arc::new(client)),
            Err(err) => error!("kanban backend disabled: {}", err),
        }
    }
    if config.workflow.enabled {
        match WorkflowClient::new(&config.workflow, timeout) {
            Ok(client) => adapters.push(Arc::new(client)),
            Err(err) => error!("workflow backend disabled: {}", err),
        }
    }
    adapters
}
