// Background flush of the document store to the data file.
// Flushes on every tick when dirty, and once more after stop is requested.
// Failed writes leave the store dirty so the next tick retries them.

use crate::document_file::Saver;
use crate::error::Result;
use crate::store::PersistableStore;
use crate::task::TaskHandle;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub flush_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to write.
    Clean,
    /// Snapshot written with this version.
    Flushed { version: i64 },
}

/// Writes the current snapshot if the store is dirty.
pub async fn flush_if_dirty(store: &dyn PersistableStore, saver: &dyn Saver) -> Result<FlushOutcome> {
    if !store.is_dirty() {
        return Ok(FlushOutcome::Clean);
    }
    let (mut doc, seq) = store.snapshot_for_flush();
    let version = chrono::Utc::now()
        .timestamp_millis()
        .max(doc.metadata.last_update.saturating_add(1));
    doc.metadata.last_update = version;
    saver.save(&doc).await?;
    store.mark_flushed(seq, version);
    tracing::debug!(operation = "flush", version, "document flushed");
    Ok(FlushOutcome::Flushed { version })
}

pub fn spawn(
    store: Arc<dyn PersistableStore>,
    saver: Arc<dyn Saver>,
    config: PersistenceConfig,
    parent: &CancellationToken,
) -> TaskHandle {
    TaskHandle::spawn("persistence", parent, move |token| {
        run(store, saver, config, token)
    })
}

async fn run(
    store: Arc<dyn PersistableStore>,
    saver: Arc<dyn Saver>,
    config: PersistenceConfig,
    token: CancellationToken,
) {
    let mut tick = interval(Duration::from_millis(config.flush_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {
                if let Err(e) = flush_if_dirty(store.as_ref(), saver.as_ref()).await {
                    tracing::warn!(error = %e, operation = "flush", "flush failed; will retry next tick");
                }
            }
        }
    }

    // Not raced against the token: the last dirty state must reach disk.
    match flush_if_dirty(store.as_ref(), saver.as_ref()).await {
        Ok(FlushOutcome::Flushed { version }) => {
            tracing::info!(version, "final flush complete");
        }
        Ok(FlushOutcome::Clean) => {}
        Err(e) => {
            tracing::error!(error = %e, operation = "final_flush", "final flush failed; unsaved changes lost");
        }
    }
    tracing::debug!("Persistence worker shutting down");
}
