use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use link_downloader::*;
use serde_json::json;

/// Pretends to submit downloads, taking a little while for each.
struct SlowHost;

#[async_trait]
impl DownloadHost for SlowHost {
    async fn initiate(&self, item: &DownloadItem) -> Result<DownloadId, HostError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("Submitted {}", item.file_name);
        Ok(DownloadId::generate())
    }
}

#[tokio::main]
async fn main() {
    let orchestrator = DownloadOrchestrator::new(Arc::new(SlowHost), OrchestratorConfig::default());
    let (_id, mut events) = orchestrator.subscribe();

    let files: Vec<_> = (1..=5)
        .map(|i| json!({"url": format!("https://example.com/part{}.rar", i), "fileName": format!("part{}.rar", i)}))
        .collect();

    let response = handle_message(
        &orchestrator,
        &json!({"action": "startBulkDownload", "files": files, "delay": 1000}),
    );
    println!("start -> {}", response.to_value());

    // Close the "popup", then reopen it a bit later and catch up from status.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let status = handle_message(&orchestrator, &json!({"action": "getDownloadStatus"}));
    println!("status -> {}", status.to_value());

    let cancel = handle_message(&orchestrator, &json!({"action": "cancelDownloads"}));
    println!("cancel -> {}", cancel.to_value());

    while let Some(event) = events.recv().await {
        println!("event -> {}", serde_json::to_string(&event).unwrap_or_default());
        if let DownloadEvent::DownloadCancelled(c) = event {
            println!("Stopped with {} done, {} left", c.completed, c.remaining);
            break;
        }
    }
}
