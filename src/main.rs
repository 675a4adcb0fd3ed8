use anyhow::Result;
use dockhours::config::{AppConfig, RuntimeKind};
use dockhours::document_file::{DocumentFile, Loader};
use dockhours::runtime::{DockerRuntime, MemoryRuntime, Runtime};
use dockhours::scheduler::{PollingScheduler, SchedulerConfig};
use dockhours::store::DocumentStore;
use dockhours::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = AppConfig::load()?;
    let timezone = app_config.timezone()?;

    let data_file = Arc::new(DocumentFile::new(&app_config.storage.data_file));
    let doc = data_file
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("load {}: {}", app_config.storage.data_file, e))?;
    tracing::info!(
        containers = doc.containers.len(),
        groups = doc.groups.len(),
        schedules = doc.schedules.len(),
        version = doc.metadata.last_update,
        "data file loaded"
    );
    let store = Arc::new(DocumentStore::new(doc));

    let runtime: Arc<dyn Runtime> = match app_config.runtime.kind {
        RuntimeKind::Docker => Arc::new(DockerRuntime::connect()?),
        RuntimeKind::Memory => Arc::new(MemoryRuntime::new(app_config.runtime.containers.clone())),
    };

    let root = CancellationToken::new();
    let persistence = persistence_worker::spawn(
        store.clone(),
        data_file.clone(),
        persistence_worker::PersistenceConfig {
            flush_interval_ms: app_config.storage.flush_interval_ms,
        },
        &root,
    );
    let reconciler = match reconciler::spawn(
        store.clone(),
        data_file.clone(),
        reconciler::ReconcilerConfig {
            data_file: data_file.path().to_path_buf(),
            debounce_ms: app_config.storage.watch_debounce_ms,
        },
        &root,
    ) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "data file watch unavailable; external edits will not be reloaded");
            None
        }
    };
    let scheduler = app_config.scheduler.enabled.then(|| {
        scheduler::spawn(
            Arc::new(PollingScheduler::new(store.clone(), runtime.clone(), timezone)),
            SchedulerConfig {
                poll_interval_secs: app_config.scheduler.poll_interval_secs,
            },
            &root,
        )
    });

    let app = routes::app(store, runtime);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    tracing::info!("Received shutdown signal");

    let handles: Vec<task::TaskHandle> = [scheduler, reconciler]
        .into_iter()
        .flatten()
        .collect();
    for h in &handles {
        h.request_stop();
    }
    for h in handles {
        h.wait_drained().await;
    }
    // Last, so the final flush sees every change the other loops made.
    persistence.request_stop();
    persistence.wait_drained().await;

    server_result?;
    Ok(())
}
