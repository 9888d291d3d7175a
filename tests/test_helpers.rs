#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use link_downloader::*;
use tokio::sync::mpsc::UnboundedReceiver;

/// Host that records every call and rejects URLs that don't parse.
pub struct MockHost {
    calls: Mutex<Vec<DownloadItem>>,
    latency: Duration,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            latency,
        })
    }

    pub fn calls(&self) -> Vec<DownloadItem> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadHost for MockHost {
    async fn initiate(&self, item: &DownloadItem) -> Result<DownloadId, HostError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().unwrap().push(item.clone());
        url::Url::parse(&item.url).map_err(|e| HostError::InvalidUrl {
            url: item.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(DownloadId::generate())
    }
}

pub fn orchestrator(host: Arc<MockHost>) -> DownloadOrchestrator {
    DownloadOrchestrator::new(host, OrchestratorConfig::default())
}

pub fn items(n: usize) -> Vec<DownloadItem> {
    (0..n)
        .map(|i| {
            DownloadItem::new(
                format!("https://files.example.com/file{}.zip", i),
                format!("file{}.zip", i),
            )
        })
        .collect()
}

/// Receive events until a completion or cancellation arrives (inclusive).
pub async fn collect_until_done(rx: &mut UnboundedReceiver<DownloadEvent>) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = matches!(
            event,
            DownloadEvent::DownloadComplete(_) | DownloadEvent::DownloadCancelled(_)
        );
        events.push(event);
        if done {
            break;
        }
    }
    events
}

pub fn progress_count(events: &[DownloadEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, DownloadEvent::DownloadProgress(_)))
        .count()
}
