use std::path::PathBuf;
use std::time::Duration;

/// How long final counters stay readable after a batch ends.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(5000);

/// Configuration for the download orchestrator.
///
/// Use [`OrchestratorConfig::builder()`] or [`OrchestratorConfig::default()`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time the last batch's counters remain visible through status queries
    /// before the state resets to idle.
    pub grace_window: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
        }
    }
}

impl OrchestratorConfig {
    /// Start from the defaults.
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }
}

/// Builder for [`OrchestratorConfig`].
#[derive(Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Set how long final counters survive after a batch ends.
    pub fn with_grace_window(mut self, window: Duration) -> Self {
        self.config.grace_window = window;
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

/// Configuration for [`HttpDownloadHost`](crate::host::HttpDownloadHost).
#[derive(Debug, Clone)]
pub struct HttpHostConfig {
    /// Directory downloaded files are written into. Created on demand.
    pub download_dir: PathBuf,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for HttpHostConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            user_agent: format!("link-downloader/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpHostConfig {
    /// Start from the defaults.
    pub fn builder() -> HttpHostConfigBuilder {
        HttpHostConfigBuilder::default()
    }
}

/// Builder for [`HttpHostConfig`].
#[derive(Default)]
pub struct HttpHostConfigBuilder {
    config: HttpHostConfig,
}

impl HttpHostConfigBuilder {
    /// Directory files are written into (created on first download).
    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.config.download_dir = dir;
        self
    }

    /// `User-Agent` sent with every request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> HttpHostConfig {
        self.config
    }
}
