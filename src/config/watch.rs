//! Config file hot reload
//!
//! Watches the directory holding the config file (editors often replace the
//! file instead of writing in place) and reloads the store when the file
//! itself is created or modified.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ConfigStore;

/// Editors emit bursts of events per save; collapse them.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Spawn a task that reloads `store` whenever its file changes.
///
/// The watcher lives inside the task and is dropped when `shutdown` fires.
pub fn spawn_config_watcher(
    store: Arc<ConfigStore>,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>, notify::Error> {
    let (tx, mut rx) = mpsc::channel::<()>(16);

    let file_name = store.path().file_name().map(|n| n.to_os_string());
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            Ok(event) if is_config_change(&event, file_name.as_deref()) => {
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Config watcher error"),
        }
    })?;

    let dir = match store.path().parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(path = %store.path().display(), "Watching config file for changes");

    Ok(tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Config watcher shutting down");
                    break;
                }
                event = rx.recv() => {
                    if event.is_none() {
                        break;
                    }
                    tokio::time::sleep(DEBOUNCE).await;
                    while rx.try_recv().is_ok() {}

                    info!("Config file changed, reloading");
                    if let Err(e) = store.reload() {
                        warn!(error = %e, "Config reload failed, keeping previous configuration");
                    }
                }
            }
        }
    }))
}

fn is_config_change(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    match file_name {
        Some(name) => event.paths.iter().any(|p| p.file_name() == Some(name)),
        None => false,
    }
}
