use serde::{Deserialize, Serialize};

/// Emitted once when a batch is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStartedEvent {
    pub total: usize,
    pub delay: u64,
}

/// Emitted after each attempted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgressEvent {
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
    pub percentage: u8,
}

/// Emitted when a batch runs to the end without being cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadCompleteEvent {
    pub completed: usize,
    pub failed: usize,
}

/// Emitted when a batch stops early because of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadCancelledEvent {
    pub completed: usize,
    pub remaining: usize,
}

/// Envelope broadcast to observers.
///
/// Serializes with an `action` tag, e.g.
/// `{"action":"downloadProgress","completed":1,"total":3,...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum DownloadEvent {
    DownloadStarted(BatchStartedEvent),
    DownloadProgress(DownloadProgressEvent),
    DownloadComplete(DownloadCompleteEvent),
    DownloadCancelled(DownloadCancelledEvent),
}

impl DownloadEvent {
    /// Event name used when emitting through Tauri.
    pub fn name(&self) -> &'static str {
        match self {
            DownloadEvent::DownloadStarted(_) => "downloads:started",
            DownloadEvent::DownloadProgress(_) => "downloads:progress",
            DownloadEvent::DownloadComplete(_) => "downloads:complete",
            DownloadEvent::DownloadCancelled(_) => "downloads:cancelled",
        }
    }

    pub(crate) fn progress(completed: usize, total: usize, remaining: usize) -> Self {
        DownloadEvent::DownloadProgress(DownloadProgressEvent {
            completed,
            total,
            remaining,
            percentage: crate::types::percentage(completed, total),
        })
    }
}
