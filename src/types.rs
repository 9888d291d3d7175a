use serde::{Deserialize, Serialize};

/// A single file to download: where it lives and what to save it as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub url: String,
    pub file_name: String,
}

impl DownloadItem {
    /// Build an item from a URL and a suggested file name.
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

/// Opaque handle returned by a [`DownloadHost`](crate::host::DownloadHost)
/// once a download has been submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadId(pub String);

impl DownloadId {
    /// Generate a fresh random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the orchestrator state, shaped for an observer that has just
/// attached and needs to rebuild its view.
///
/// `completed + failed + remaining == total` holds for every snapshot taken
/// while a batch is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub in_progress: bool,
    /// Head of the pending queue, if any.
    pub current: Option<DownloadItem>,
    pub remaining: usize,
    pub completed: usize,
    /// Not part of the wire shape observers expect; kept for local callers.
    #[serde(skip)]
    pub failed: usize,
    pub total: usize,
    /// Inter-item delay in milliseconds.
    pub delay: u64,
}

impl BatchStatus {
    /// The idle snapshot: nothing running, all counters zero.
    pub fn idle() -> Self {
        Self {
            in_progress: false,
            current: None,
            remaining: 0,
            completed: 0,
            failed: 0,
            total: 0,
            delay: 0,
        }
    }
}

/// Rounded completion percentage in `0..=100`. Zero when `total` is zero.
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_item_wire_shape() {
        let item = DownloadItem::new("https://example.com/a.pdf", "a.pdf");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["url"], "https://example.com/a.pdf");
        assert_eq!(json["fileName"], "a.pdf");
    }

    #[test]
    fn test_status_omits_failed_count() {
        let json = serde_json::to_value(BatchStatus::idle()).unwrap();
        assert_eq!(json["inProgress"], false);
        assert!(json["current"].is_null());
        assert!(json.get("failed").is_none());
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
    }
}
