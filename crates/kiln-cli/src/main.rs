//! The `kiln` binary: configuration surface, tracing bootstrap, snapshot
//! lifecycle, and the Discord gateway loop.

mod cli_args;
mod system_primer;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use kiln_ai::GoogleClient;
use kiln_discord_runtime::{run_discord_runtime, DiscordRuntimeConfig};
use kiln_memory::{ConversationSnapshotStore, ConversationStore};
use kiln_safety::ActivityTracker;
use kiln_session::SupportSessionRuntime;

use cli_args::Cli;

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let system_primer = system_primer::resolve(cli.system_primer_file.as_deref())?;
    let client = Arc::new(GoogleClient::new(cli.google_config())?);
    let snapshot = ConversationSnapshotStore::new(cli.state_dir.join("conversations.json"));
    info!(path = %snapshot.path().display(), "using conversation snapshot");

    let mut runtime = SupportSessionRuntime::new(
        cli.session_config(system_primer),
        ConversationStore::new(cli.memory_config()),
        ActivityTracker::new(cli.rate_limit_config()),
        snapshot,
        client,
    );
    let restored = runtime
        .load_persisted()
        .context("failed to restore conversation snapshot")?;
    info!(restored, "conversation snapshot loaded");

    let runtime = Arc::new(AsyncMutex::new(runtime));
    let save_task = tokio::spawn(periodic_snapshot_task(
        runtime.clone(),
        Duration::from_millis(cli.save_interval_ms),
    ));

    let gateway = run_discord_runtime(
        DiscordRuntimeConfig {
            token: cli.discord_token.clone(),
        },
        runtime.clone(),
    );
    tokio::pin!(gateway);

    let result = tokio::select! {
        result = &mut gateway => result,
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    save_task.abort();
    // Final flush is best-effort: a failed write must not turn a clean
    // shutdown into a crash.
    match runtime.lock().await.flush_snapshot() {
        Ok(()) => info!("conversation snapshot flushed before exit"),
        Err(error) => warn!(%error, "final snapshot flush failed"),
    }

    result
}

async fn periodic_snapshot_task(
    runtime: Arc<AsyncMutex<SupportSessionRuntime>>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so saves start one full
    // interval after startup.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let runtime = runtime.lock().await;
        match runtime.flush_snapshot() {
            Ok(()) => debug!(
                conversations = runtime.conversation_count(),
                "periodic snapshot saved"
            ),
            Err(error) => warn!(%error, "periodic snapshot write failed"),
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(error) => {
            warn!(%error, "failed to install SIGTERM handler, watching ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
