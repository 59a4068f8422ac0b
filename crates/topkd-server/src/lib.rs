// topkd-server - Process wiring for the aggregation service
//
// Two long-lived entry points (continuous aggregation + HTTP query
// surface, one-shot checkpoint creation) plus a mock-data generator for
// local development.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use topkd_aggregation::{
    AggregationState, Aggregator, AggregatorModel, Commands, EventLogReader, Queries,
};
use topkd_checkpoint::{CheckPointer, CheckPointerModel};
use topkd_config::RuntimeConfig;
use topkd_core::{new_top_k_items, Counters};

pub mod handlers;
pub mod init;
pub mod jsonl_log;
pub mod seed;

use handlers::AppState;
use jsonl_log::JsonlEventLog;

fn build_reader(config: &RuntimeConfig) -> Arc<dyn EventLogReader> {
    Arc::new(JsonlEventLog::new(
        &config.event_log.path,
        config.event_log.poll_interval(),
    ))
}

fn build_commands(config: &RuntimeConfig, reader: Arc<dyn EventLogReader>) -> Result<Commands> {
    let storage = init::init_storage(&config.storage)?;
    let aggregator = Aggregator::new(
        AggregatorModel::new(reader.clone()),
        config.aggregator.flush_interval(),
        config.aggregator.verbose,
    );
    let check_pointer = CheckPointer::new(CheckPointerModel::new(Arc::new(storage)));
    Ok(Commands::new(
        reader,
        aggregator,
        check_pointer,
        config.aggregator.top_k_size,
    ))
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Run the continuous aggregator alongside the HTTP query surface until
/// a shutdown signal arrives.
pub async fn run_server(config: RuntimeConfig) -> Result<()> {
    config.validate()?;

    let reader = build_reader(&config);
    let mut commands = build_commands(&config, reader)?;

    let all_time_items = new_top_k_items(config.aggregator.top_k_size);
    let queries = Arc::new(Queries::new(all_time_items.clone()));
    let mut state = AggregationState::new(Counters::new(), all_time_items);

    let cancel = CancellationToken::new();
    let aggregation_cancel = cancel.clone();
    let aggregation = tokio::spawn(async move {
        commands
            .start_aggregator(aggregation_cancel, &mut state)
            .await
    });

    let app = handlers::router(AppState { queries });
    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!("Listening on {}", config.server.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    // HTTP is down; stop the aggregation loop. Unflushed increments are
    // recomputed from the event log on the next start.
    cancel.cancel();
    aggregation
        .await
        .context("aggregation task panicked")?
        .context("aggregation failed")?;

    info!("Service stopped");
    Ok(())
}

/// Aggregate everything new on the event log and write a checkpoint.
pub async fn run_check_point(config: RuntimeConfig) -> Result<()> {
    config.validate()?;

    let reader = build_reader(&config);
    let mut commands = build_commands(&config, reader)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    commands
        .create_check_point(cancel)
        .await
        .context("checkpoint creation failed")?;
    Ok(())
}

/// Generate random item events onto the local event log.
pub async fn run_seed_events(config: RuntimeConfig, count: usize, distinct: usize) -> Result<()> {
    let log = JsonlEventLog::new(&config.event_log.path, config.event_log.poll_interval());
    seed::seed_events(&log, count, distinct)
}
