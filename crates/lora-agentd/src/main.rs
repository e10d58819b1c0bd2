//! `lora-agentd`: submits LoRA training jobs and reconciles their status
//! against the job-execution service.
//!
//! Task rows live in a process-local [`MemoryTaskStore`]. `DATABASE_URL` is
//! only forwarded to the artifact retrieval service, which therefore cannot
//! see or update these rows: tasks stop at `RUN_BEFORE` and are lost on
//! restart. Moving to `RUNNING`/`COMPLETED` needs a shared store behind
//! [`TaskStore`].
use std::sync::Arc;

use lora_api::{HttpApi, SubmitterAdapter};
use lora_core::{
    MemoryTaskStore, ReconciliationScheduler, StatusReconciler, TaskStore, TrainingSubmitter,
};
use lora_observe::logger_init;
use lora_prometheus::PrometheusMetrics;
use lora_toolkit::{ArtifactFetchTrigger, ToolkitClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod metrics;
mod settings;

use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Settings + logger
    let settings = Settings::from_env()?;
    logger_init(&settings.logger)?;
    info!(
        toolkit = %settings.toolkit.base_url,
        fetch = %settings.fetch.service_url,
        interval = ?settings.scheduler.interval,
        "lora-agentd starting"
    );

    // 2) Collaborators; one connection pool for both remote services
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
    warn!("task rows are kept in memory; the retrieval service cannot update them");
    let client = ToolkitClient::new(&settings.toolkit)?;
    let trigger = Arc::new(ArtifactFetchTrigger::new(client.http(), settings.fetch.clone()));
    let client = Arc::new(client);

    // 3) Reconciliation loop
    let reconciler =
        StatusReconciler::new(Arc::clone(&client), trigger).with_metrics(metrics.clone());
    let scheduler =
        ReconciliationScheduler::new(Arc::clone(&store), reconciler, settings.scheduler.clone())
            .with_metrics(metrics.clone());

    let cancel = CancellationToken::new();
    let monitor = tokio::spawn(scheduler.run(cancel.clone()));

    // 4) HTTP surface
    let submitter =
        Arc::new(TrainingSubmitter::new(client, Arc::clone(&store)).with_metrics(metrics.clone()));
    let app = HttpApi::new(Arc::new(SubmitterAdapter::new(submitter, store)))
        .router()
        .merge(metrics::router(metrics));

    let listener = TcpListener::bind(settings.listen_addr).await?;
    info!(addr = %settings.listen_addr, "http api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // 5) Drain
    cancel.cancel();
    if let Err(e) = monitor.await {
        warn!(error = %e, "reconciliation loop ended abnormally");
    }
    info!("lora-agentd stopped");
    Ok(())
}

/// Resolves on Ctrl+C, SIGTERM, or when `cancel` fires elsewhere.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received"),
        _ = terminate => info!("SIGTERM received"),
        _ = cancel.cancelled() => {}
    }
    info!("shutting down");
}
