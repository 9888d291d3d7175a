//! # Link Downloader
//!
//! Sequential link downloader for Tauri applications: find the downloadable
//! links on a page, then fetch a selection of them one at a time with a
//! configurable delay, while any number of windows come and go watching the
//! progress.
//!
//! ## Features
//!
//! - Single-batch admission gate (a second batch is rejected, never queued)
//! - Strictly ordered, one-at-a-time downloads with an inter-item delay
//! - Cooperative cancellation, effective immediately during a delay
//! - Best-effort progress events to transient observers (channels, Tauri windows)
//! - Status snapshots for observers that attach mid-batch, kept readable for a
//!   grace window after the batch ends
//! - JSON control protocol and Tauri commands
//! - Link classification by file extension and `data:` MIME type
//!
//! ## Quick Start
//!
//! 1. Pick a [`DownloadHost`] (e.g. [`HttpDownloadHost`]) or implement your own
//! 2. Create one [`DownloadOrchestrator`] and register it in Tauri state
//! 3. Attach observers with [`DownloadOrchestrator::attach()`] or
//!    [`DownloadOrchestrator::subscribe()`]
//! 4. Start batches with [`DownloadOrchestrator::start_batch()`] or through
//!    the [`protocol`] / [`commands`] surfaces
//!
//! See the `demos/` directory for complete usage examples.

pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod observer;
pub mod orchestrator;
pub mod protocol;
pub mod types;

pub use classifier::{Anchor, FileCategory, FileLink, LinkClassification};
pub use config::{HttpHostConfig, OrchestratorConfig, OrchestratorConfigBuilder};
pub use error::{HostError, OrchestratorError, SinkError};
pub use events::DownloadEvent;
pub use host::{DownloadHost, HttpDownloadHost};
pub use observer::{Broadcaster, ChannelSink, EventSink, ObserverId};
pub use orchestrator::DownloadOrchestrator;
pub use protocol::{handle_message, Ack, ControlRequest, ControlResponse};
pub use types::{BatchStatus, DownloadId, DownloadItem};
