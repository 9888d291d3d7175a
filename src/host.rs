use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use url::Url;

use crate::{
    config::HttpHostConfig,
    error::HostError,
    types::{DownloadId, DownloadItem},
};

/// The host's download-initiation call.
///
/// `initiate` resolves once the download has been *submitted*, not once the
/// transfer finishes. An `Err` marks the item as failed; the batch goes on.
#[async_trait]
pub trait DownloadHost: Send + Sync {
    /// Submit one download and return its host-assigned ID.
    async fn initiate(&self, item: &DownloadItem) -> Result<DownloadId, HostError>;
}

/// A [`DownloadHost`] that fetches `http(s)` URLs with `reqwest` and decodes
/// `data:` URIs inline, writing into a download directory.
///
/// HTTP transfers run as background tasks; [`initiate`](DownloadHost::initiate)
/// returns as soon as the destination file is reserved and the transfer is
/// spawned. Transfer errors are logged and do not reach the orchestrator; the
/// incomplete file is removed.
pub struct HttpDownloadHost {
    config: HttpHostConfig,
    client: reqwest::Client,
    transfers: Mutex<Vec<(DownloadId, JoinHandle<()>)>>,
}

impl HttpDownloadHost {
    /// Build a host with its own `reqwest` client.
    pub fn new(config: HttpHostConfig) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            config,
            client,
            transfers: Mutex::new(Vec::new()),
        })
    }

    /// Directory downloads are written into.
    pub fn download_dir(&self) -> &Path {
        &self.config.download_dir
    }

    /// Wait for every background transfer spawned so far to finish.
    pub async fn wait_idle(&self) {
        let handles: Vec<(DownloadId, JoinHandle<()>)> = match self.transfers.lock() {
            Ok(mut transfers) => transfers.drain(..).collect(),
            Err(_) => return,
        };
        for (id, handle) in handles {
            if let Err(e) = handle.await {
                tracing::warn!(download_id = %id, error = %e, "Transfer task panicked");
            }
        }
    }

    fn spawn_transfer(&self, id: DownloadId, url: Url, file: tokio::fs::File, path: PathBuf) {
        let client = self.client.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            match transfer(&client, url.clone(), file).await {
                Ok(bytes) => tracing::info!(
                    download_id = %task_id,
                    url = %url,
                    path = %path.display(),
                    bytes,
                    "Transfer finished"
                ),
                Err(e) => {
                    tracing::warn!(
                        download_id = %task_id,
                        url = %url,
                        error = %format!("{:#}", e),
                        "Transfer failed"
                    );
                    // Drop the empty or partial file so the name is free again.
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::debug!(
                            path = %path.display(),
                            error = %e,
                            "Could not remove incomplete download"
                        );
                    }
                }
            }
        });

        if let Ok(mut transfers) = self.transfers.lock() {
            transfers.retain(|(_, h)| !h.is_finished());
            transfers.push((id, handle));
        }
    }
}

#[async_trait]
impl DownloadHost for HttpDownloadHost {
    async fn initiate(&self, item: &DownloadItem) -> Result<DownloadId, HostError> {
        let url = Url::parse(&item.url).map_err(|e| HostError::InvalidUrl {
            url: item.url.clone(),
            reason: e.to_string(),
        })?;

        let scheme = url.scheme().to_string();
        if !matches!(scheme.as_str(), "http" | "https" | "data") {
            return Err(HostError::UnsupportedScheme(scheme));
        }

        let file_name = sanitize_file_name(&item.file_name)
            .or_else(|| file_name_from_url(&url))
            .ok_or_else(|| HostError::InvalidFileName(item.file_name.clone()))?;

        let payload = if scheme == "data" {
            Some(decode_data_url(&item.url)?)
        } else {
            None
        };

        tokio::fs::create_dir_all(&self.config.download_dir).await?;
        let (mut file, path) = create_unique(&self.config.download_dir.join(&file_name)).await?;
        let id = DownloadId::generate();

        if let Some(bytes) = payload {
            file.write_all(&bytes).await?;
            file.flush().await?;
            tracing::debug!(download_id = %id, path = %path.display(), "Wrote data URI");
            return Ok(id);
        }

        tracing::debug!(download_id = %id, url = %url, path = %path.display(), "Transfer submitted");
        self.spawn_transfer(id.clone(), url, file, path);
        Ok(id)
    }
}

async fn transfer(client: &reqwest::Client, url: Url, mut file: tokio::fs::File) -> anyhow::Result<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Request failed")?
        .error_for_status()
        .context("Server returned an error status")?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read response body")?;
        file.write_all(&chunk)
            .await
            .context("Failed to write to destination file")?;
        written += chunk.len() as u64;
    }
    file.flush().await.context("Failed to flush destination file")?;
    Ok(written)
}

/// Reduce a requested name to a single safe path component.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    let cleaned: String = last
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    Some(cleaned)
}

fn file_name_from_url(url: &Url) -> Option<String> {
    if url.scheme() == "data" {
        return Some("download".to_string());
    }
    let segment = url.path_segments()?.last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    sanitize_file_name(&decoded)
}

/// Create a new file at `path`, or at `report (1).pdf`, `report (2).pdf` ...
/// when the name is taken. Returns the open file and the path it got.
pub async fn create_unique(path: &Path) -> io::Result<(tokio::fs::File, PathBuf)> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("download");
    let extension = path.extension().and_then(|e| e.to_str());

    let mut candidate = path.to_path_buf();
    let mut n = 0u32;
    loop {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
        n += 1;
        candidate = match extension {
            Some(ext) => parent.join(format!("{} ({}).{}", stem, n, ext)),
            None => parent.join(format!("{} ({})", stem, n)),
        };
    }
}

/// Decode the payload of a `data:` URI (base64 or percent-encoded).
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, HostError> {
    let invalid = |reason: &str| HostError::InvalidUrl {
        url: truncate(data_url, 64),
        reason: reason.to_string(),
    };

    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| invalid("not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator"))?;

    if header.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| invalid(&format!("bad base64 payload: {}", e)))
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
