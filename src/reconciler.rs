// Folds out-of-process edits of the data file back into the store.
//
// The parent directory is watched (editors and our own saver replace the file
// by rename, which changes the inode), events are filtered to the file's base
// name, and bursts are coalesced by a restartable quiet-period timer. When the
// timer fires the disk copy is loaded and merged whole-document:
//
//   disk older than cache          -> ignore
//   cache has unflushed changes    -> ignore (the next flush overwrites disk)
//   same version, same content     -> ignore
//   otherwise                      -> replace the cache

use crate::document_file::Loader;
use crate::error::{Error, Result};
use crate::models::DataDocument;
use crate::store::PersistableStore;
use crate::task::TaskHandle;
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub data_file: PathBuf,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    DiskStale,
    LocalDirty,
    Unchanged,
    Replaced,
}

/// Decision for a freshly loaded disk document against the current store state.
pub fn decide(disk: &DataDocument, store: &dyn PersistableStore) -> ReconcileOutcome {
    let disk_version = disk.metadata.last_update;
    let cache_version = store.last_update();
    if disk_version < cache_version {
        ReconcileOutcome::DiskStale
    } else if store.is_dirty() {
        ReconcileOutcome::LocalDirty
    } else if disk_version == cache_version && store.snapshot().content_eq(disk) {
        ReconcileOutcome::Unchanged
    } else {
        ReconcileOutcome::Replaced
    }
}

/// Loads the disk document and merges it into `store`.
pub async fn reconcile(
    store: &dyn PersistableStore,
    loader: &dyn Loader,
) -> Result<ReconcileOutcome> {
    let disk = loader.load().await?;
    let outcome = decide(&disk, store);
    if outcome != ReconcileOutcome::Replaced {
        return Ok(outcome);
    }
    // A mutation may have landed since `decide`; the store re-checks dirty under its lock.
    if !store.replace_unless_dirty(&disk) {
        return Ok(ReconcileOutcome::LocalDirty);
    }
    Ok(ReconcileOutcome::Replaced)
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    let content_event = match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    };
    content_event
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn watch_dir(data_file: &Path) -> PathBuf {
    match data_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Starts watching the data file's directory. Watch setup failures are returned
/// to the caller; everything after that is logged and retried on the next event.
pub fn spawn(
    store: Arc<dyn PersistableStore>,
    loader: Arc<dyn Loader>,
    config: ReconcilerConfig,
    parent: &CancellationToken,
) -> Result<TaskHandle> {
    let file_name = config
        .data_file
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| {
            Error::Validation(format!("data file {:?} has no file name", config.data_file))
        })?;
    let dir = watch_dir(&config.data_file);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_relevant(&event, &file_name) {
                let _ = event_tx.send(());
            }
        }
        Err(e) => tracing::warn!(error = %e, "data file watch error"),
    })
    .map_err(|e| Error::io(&dir, std::io::Error::other(e)))?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| Error::io(&dir, std::io::Error::other(e)))?;
    tracing::info!(dir = %dir.display(), file = %config.data_file.display(), "watching data file");

    let debounce = Duration::from_millis(config.debounce_ms);
    Ok(TaskHandle::spawn("reconciler", parent, move |token| async move {
        // Dropping the watcher ends the OS watch, so it lives as long as the loop.
        let _watcher = watcher;
        run(store, loader, event_rx, debounce, token).await;
    }))
}

async fn run(
    store: Arc<dyn PersistableStore>,
    loader: Arc<dyn Loader>,
    mut event_rx: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
    token: CancellationToken,
) {
    let quiet = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(quiet);
    let mut armed = false;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = event_rx.recv() => {
                if event.is_none() {
                    break;
                }
                quiet.as_mut().reset(Instant::now() + debounce);
                armed = true;
            }
            () = &mut quiet, if armed => {
                armed = false;
                match reconcile(store.as_ref(), loader.as_ref()).await {
                    Ok(ReconcileOutcome::Replaced) => {
                        tracing::info!(version = store.last_update(), "reloaded data file after external change");
                    }
                    Ok(outcome) => {
                        tracing::debug!(?outcome, "data file change ignored");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, operation = "reconcile", "failed to reload data file");
                    }
                }
            }
        }
    }
    tracing::debug!("Reconciler shutting down");
}
