use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use tokio::sync::mpsc;

use crate::{error::SinkError, events::DownloadEvent};

/// Something that can receive broadcast [`DownloadEvent`]s.
///
/// Observers are transient (a popup window, an IPC port). Returning
/// [`SinkError::Closed`] removes the sink from the set; any other error is
/// logged and the sink stays attached.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &DownloadEvent) -> Result<(), SinkError>;
}

/// Handle returned by [`Broadcaster::attach`], used to detach later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// The set of currently connected observers.
///
/// Publishing tries every sink independently. No observer at all is fine,
/// events are simply dropped; there is no buffering and no replay.
#[derive(Default)]
pub struct Broadcaster {
    next_id: AtomicU64,
    sinks: Mutex<Vec<(ObserverId, Arc<dyn EventSink>)>>,
}

impl Broadcaster {
    /// An empty observer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer. It receives every event published from now on.
    pub fn attach(&self, sink: Arc<dyn EventSink>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.sinks.lock() {
            Ok(mut sinks) => sinks.push((id, sink)),
            Err(e) => tracing::warn!(error = %e, "Observer set poisoned, observer not attached"),
        }
        id
    }

    /// Attach a channel-backed observer and hand back its receiving end.
    pub fn subscribe(&self) -> (ObserverId, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.attach(Arc::new(ChannelSink::new(tx)));
        (id, rx)
    }

    /// Detach an observer. Unknown IDs are ignored.
    pub fn detach(&self, id: ObserverId) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.retain(|(sink_id, _)| *sink_id != id);
        }
    }

    /// Number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.sinks.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Best-effort delivery to every attached observer.
    pub fn publish(&self, event: &DownloadEvent) {
        // Deliver outside the lock so a slow sink cannot block attach/detach.
        let snapshot: Vec<(ObserverId, Arc<dyn EventSink>)> = match self.sinks.lock() {
            Ok(sinks) => sinks.clone(),
            Err(_) => return,
        };

        if snapshot.is_empty() {
            tracing::trace!(event = event.name(), "No observers attached, event dropped");
            return;
        }

        let mut closed = Vec::new();
        for (id, sink) in &snapshot {
            match sink.deliver(event) {
                Ok(()) => {}
                Err(SinkError::Closed) => closed.push(*id),
                Err(e) => {
                    tracing::debug!(event = event.name(), error = %e, "Could not notify observer")
                }
            }
        }

        if !closed.is_empty() {
            tracing::debug!(count = closed.len(), "Dropping disconnected observers");
            if let Ok(mut sinks) = self.sinks.lock() {
                sinks.retain(|(id, _)| !closed.contains(id));
            }
        }
    }
}

/// Observer backed by an unbounded Tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl ChannelSink {
    /// Wrap the sending half of a channel.
    pub fn new(tx: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: &DownloadEvent) -> Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Emits each event to every webview of a Tauri app.
impl<R: tauri::Runtime> EventSink for tauri::AppHandle<R> {
    fn deliver(&self, event: &DownloadEvent) -> Result<(), SinkError> {
        use tauri::Emitter;

        let result = match event {
            DownloadEvent::DownloadStarted(payload) => self.emit(event.name(), payload.clone()),
            DownloadEvent::DownloadProgress(payload) => self.emit(event.name(), payload.clone()),
            DownloadEvent::DownloadComplete(payload) => self.emit(event.name(), payload.clone()),
            DownloadEvent::DownloadCancelled(payload) => self.emit(event.name(), payload.clone()),
        };
        result.map_err(|e| SinkError::Emit(e.to_string()))
    }
}
