use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::OrchestratorConfig,
    error::OrchestratorError,
    events::{BatchStartedEvent, DownloadCancelledEvent, DownloadCompleteEvent, DownloadEvent},
    host::DownloadHost,
    observer::{Broadcaster, EventSink, ObserverId},
    types::{BatchStatus, DownloadItem},
};

/// The single batch record. Idle when `in_progress` is false and every
/// counter is zero.
#[derive(Default)]
struct BatchState {
    in_progress: bool,
    pending: VecDeque<DownloadItem>,
    total: usize,
    completed: usize,
    failed: usize,
    delay_ms: u64,
    cancel: CancellationToken,
    /// Bumped on every admission and reset; stale tasks compare against it
    /// before touching the record.
    generation: u64,
    started_at: Option<DateTime<Utc>>,
}

impl BatchState {
    fn to_status(&self) -> BatchStatus {
        BatchStatus {
            in_progress: self.in_progress,
            current: self.pending.front().cloned(),
            remaining: self.pending.len(),
            completed: self.completed,
            failed: self.failed,
            total: self.total,
            delay: self.delay_ms,
        }
    }
}

struct Inner {
    config: OrchestratorConfig,
    host: Arc<dyn DownloadHost>,
    observers: Broadcaster,
    state: Mutex<BatchState>,
}

/// Sequential download runner with a single-batch admission gate.
///
/// One batch runs at a time. Items are handed to the [`DownloadHost`] strictly
/// in order with an optional delay between consecutive starts. Progress goes
/// out to whatever observers happen to be attached; an observer that joins
/// late calls [`status()`](Self::status) to catch up.
///
/// Cloning is cheap and every clone drives the same state. Create one per
/// process and share it (e.g. through Tauri's managed state).
///
/// # Example
///
/// ```ignore
/// let host = HttpDownloadHost::new(HttpHostConfig::default())?;
/// let orchestrator = DownloadOrchestrator::new(Arc::new(host), OrchestratorConfig::default());
/// let (_id, mut events) = orchestrator.subscribe();
///
/// orchestrator.start_batch(vec![DownloadItem::new(url, "a.pdf")], 1000)?;
/// while let Some(event) = events.recv().await { /* ... */ }
/// ```
#[derive(Clone)]
pub struct DownloadOrchestrator {
    inner: Arc<Inner>,
}

impl DownloadOrchestrator {
    /// Create an idle orchestrator submitting downloads through `host`.
    pub fn new(host: Arc<dyn DownloadHost>, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                host,
                observers: Broadcaster::new(),
                state: Mutex::new(BatchState::default()),
            }),
        }
    }

    /// Admit a batch and start working through it in the background.
    ///
    /// Returns as soon as the batch is admitted. Fails with
    /// [`OrchestratorError::AlreadyInProgress`] while another batch is active,
    /// leaving that batch untouched. Must be called from within a Tokio
    /// runtime.
    pub fn start_batch(
        &self,
        items: Vec<DownloadItem>,
        delay_ms: u64,
    ) -> Result<(), OrchestratorError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| OrchestratorError::Other(format!("No Tokio runtime: {}", e)))?;

        let (generation, cancel) = {
            let mut state = self.inner.lock_state();
            if state.in_progress {
                tracing::warn!(
                    completed = state.completed,
                    total = state.total,
                    "Rejected batch: download already in progress"
                );
                return Err(OrchestratorError::AlreadyInProgress);
            }

            state.generation += 1;
            state.in_progress = true;
            state.pending = items.iter().cloned().collect();
            state.total = items.len();
            state.completed = 0;
            state.failed = 0;
            state.delay_ms = delay_ms;
            state.cancel = CancellationToken::new();
            state.started_at = Some(Utc::now());
            (state.generation, state.cancel.clone())
        };

        tracing::info!(
            total = items.len(),
            delay_ms,
            batch = generation,
            "Starting bulk download"
        );
        self.inner
            .observers
            .publish(&DownloadEvent::DownloadStarted(BatchStartedEvent {
                total: items.len(),
                delay: delay_ms,
            }));

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            inner
                .run_batch(generation, items, Duration::from_millis(delay_ms), cancel)
                .await;
        });
        Ok(())
    }

    /// Request cancellation of the active batch.
    ///
    /// Returns immediately; the batch stops at its next check point and
    /// reports through a cancellation event. An in-flight host call is not
    /// aborted. No-op when idle or already cancelled.
    pub fn cancel(&self) {
        let state = self.inner.lock_state();
        if state.in_progress && !state.cancel.is_cancelled() {
            tracing::info!(
                completed = state.completed,
                total = state.total,
                remaining = state.pending.len(),
                "Cancelling pending downloads"
            );
            state.cancel.cancel();
        } else {
            tracing::debug!("Cancel requested with no active batch");
        }
    }

    /// Current state, for observers reconstructing their view.
    pub fn status(&self) -> BatchStatus {
        self.inner.lock_state().to_status()
    }

    /// Whether a batch is currently running.
    pub fn is_busy(&self) -> bool {
        self.inner.lock_state().in_progress
    }

    /// Return to idle immediately, cancelling any active batch.
    ///
    /// Call on host lifecycle signals (app start, extension install). The
    /// running task, if any, stops at its next check point and no longer
    /// touches the state.
    pub fn reset(&self) {
        let mut state = self.inner.lock_state();
        state.cancel.cancel();
        let generation = state.generation + 1;
        *state = BatchState {
            generation,
            ..BatchState::default()
        };
        tracing::info!("Download state reset");
    }

    /// Attach an observer for broadcast events.
    pub fn attach(&self, sink: Arc<dyn EventSink>) -> ObserverId {
        self.inner.observers.attach(sink)
    }

    /// Attach a channel observer and return its receiver.
    pub fn subscribe(&self) -> (ObserverId, mpsc::UnboundedReceiver<DownloadEvent>) {
        self.inner.observers.subscribe()
    }

    /// Stop delivering events to an observer.
    pub fn detach(&self, id: ObserverId) {
        self.inner.observers.detach(id);
    }

    /// The observer set events are broadcast to.
    pub fn observers(&self) -> &Broadcaster {
        &self.inner.observers
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the state if it still belongs to `generation`.
    fn update<T>(&self, generation: u64, f: impl FnOnce(&mut BatchState) -> T) -> Option<T> {
        let mut state = self.lock_state();
        if state.generation == generation {
            Some(f(&mut state))
        } else {
            None
        }
    }

    async fn run_batch(
        &self,
        generation: u64,
        items: Vec<DownloadItem>,
        delay: Duration,
        cancel: CancellationToken,
    ) {
        let total = items.len();

        for (i, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(index = i + 1, total, "Downloads cancelled before next file");
                break;
            }

            tracing::debug!(index = i + 1, total, file_name = %item.file_name, "Downloading file");
            let succeeded = match AssertUnwindSafe(self.host.initiate(item))
                .catch_unwind()
                .await
            {
                Ok(Ok(id)) => {
                    tracing::debug!(index = i + 1, download_id = %id, "Download started");
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        index = i + 1,
                        url = %item.url,
                        error = %e,
                        "Download failed to start"
                    );
                    false
                }
                Err(_) => {
                    tracing::error!(index = i + 1, url = %item.url, "Download host panicked");
                    false
                }
            };

            let counts = self.update(generation, |state| {
                if succeeded {
                    state.completed += 1;
                } else {
                    state.failed += 1;
                }
                state.pending.pop_front();
                (state.completed, state.pending.len())
            });
            let Some((completed, remaining)) = counts else {
                tracing::debug!(batch = generation, "Batch superseded by reset");
                return;
            };

            if cancel.is_cancelled() {
                tracing::info!(index = i + 1, total, completed, "Downloads cancelled after file");
                break;
            }

            self.observers
                .publish(&DownloadEvent::progress(completed, total, remaining));

            if i + 1 < total && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Delay interrupted by cancellation");
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.finish(generation, cancel.is_cancelled()).await;
    }

    async fn finish(&self, generation: u64, cancelled: bool) {
        let summary = self.update(generation, |state| {
            state.in_progress = false;
            state.pending.clear();
            (state.completed, state.failed, state.total, state.started_at)
        });
        let Some((completed, failed, total, started_at)) = summary else {
            return;
        };

        let elapsed_ms = started_at
            .map(|t| (Utc::now() - t).num_milliseconds())
            .unwrap_or(0);

        let event = if cancelled {
            let remaining = total.saturating_sub(completed);
            tracing::info!(completed, remaining, elapsed_ms, "Bulk download cancelled");
            DownloadEvent::DownloadCancelled(DownloadCancelledEvent {
                completed,
                remaining,
            })
        } else {
            tracing::info!(completed, failed, elapsed_ms, "Bulk download completed");
            DownloadEvent::DownloadComplete(DownloadCompleteEvent { completed, failed })
        };
        self.observers.publish(&event);

        // Final counters stay readable for late status queries.
        tokio::time::sleep(self.config.grace_window).await;
        let cleared = self.update(generation, |state| {
            *state = BatchState {
                generation,
                ..BatchState::default()
            };
        });
        if cleared.is_some() {
            tracing::debug!(batch = generation, "Grace window elapsed, state idle");
        }
    }
}
