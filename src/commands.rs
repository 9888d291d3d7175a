//! Tauri commands exposing the orchestrator to webview observers.
//!
//! Register the orchestrator as managed state and the commands with
//! `tauri::generate_handler!`:
//!
//! ```ignore
//! tauri::Builder::default()
//!     .manage(orchestrator)
//!     .invoke_handler(tauri::generate_handler![
//!         link_downloader::commands::start_bulk_download,
//!         link_downloader::commands::get_download_status,
//!         link_downloader::commands::cancel_downloads,
//!         link_downloader::commands::ping_background,
//!         link_downloader::commands::dispatch_message,
//!     ])
//! ```

use serde_json::Value;
use tauri::State;

use crate::{
    orchestrator::DownloadOrchestrator,
    protocol,
    types::{BatchStatus, DownloadItem},
};

/// Admit a batch; errors with the rejection message if one is running.
#[tauri::command]
pub async fn start_bulk_download(
    orchestrator: State<'_, DownloadOrchestrator>,
    files: Vec<DownloadItem>,
    delay: u64,
) -> Result<(), String> {
    orchestrator
        .start_batch(files, delay)
        .map_err(|e| e.to_string())
}

/// Snapshot of the current batch.
#[tauri::command]
pub fn get_download_status(orchestrator: State<'_, DownloadOrchestrator>) -> BatchStatus {
    orchestrator.status()
}

/// Request cancellation of the active batch.
#[tauri::command]
pub fn cancel_downloads(orchestrator: State<'_, DownloadOrchestrator>) {
    orchestrator.cancel();
}

/// Liveness check.
#[tauri::command]
pub fn ping_background() -> String {
    "Background orchestrator is alive".to_string()
}

/// Raw message entry point, accepting the same `{action, ...}` objects as
/// [`protocol::handle_message`].
#[tauri::command]
pub async fn dispatch_message(
    orchestrator: State<'_, DownloadOrchestrator>,
    message: Value,
) -> Result<Value, String> {
    Ok(protocol::handle_message(&orchestrator, &message).to_value())
}
