//! Link classification: decides which hyperlinks point at downloadable files.
//!
//! Everything here is pure; the page-scanning side feeds in anchors and gets
//! back [`FileLink`]s ready to turn into [`DownloadItem`]s.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::DownloadItem;

/// Extensions recognized as downloadable files.
pub const FILE_EXTENSIONS: &[&str] = &[
    // Documents
    "pdf", "doc", "docx", "txt", "rtf", "odt", "pages", "xls", "xlsx", "csv", "ods", "numbers",
    "ppt", "pptx", "odp", "key",
    // Archives
    "zip", "rar", "7z", "tar", "gz", "bz2", "xz", "dmg", "pkg",
    // Media
    "mp3", "wav", "flac", "aac", "ogg", "m4a", "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm",
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "tiff",
    // Code & data
    "json", "xml", "sql", "db", "sqlite", "js", "html", "css", "py", "java", "cpp", "c", "h",
    // Executables & installers
    "exe", "msi", "deb", "rpm", "app", "apk",
    // Other
    "iso", "img", "bin", "log", "conf", "cfg",
];

/// MIME types of `data:` URIs mapped to a file extension.
pub const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/gzip", "gz"),
    ("application/x-7z-compressed", "7z"),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("text/plain", "txt"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/xml", "xml"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/svg+xml", "svg"),
    ("image/webp", "webp"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tiff"),
    ("audio/mpeg", "mp3"),
    ("audio/wav", "wav"),
    ("audio/ogg", "ogg"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

const CONTEXT_CHARS: usize = 100;

/// Coarse grouping used for filtering scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Document,
    Archive,
    Media,
    Code,
    Other,
}

impl FileCategory {
    /// Bucket an extension for the popup's type filter.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "pages" | "xls" | "xlsx" | "csv"
            | "ods" | "numbers" | "ppt" | "pptx" | "odp" | "key" => Self::Document,
            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "dmg" | "pkg" => Self::Archive,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "mp4" | "avi" | "mkv" | "mov"
            | "wmv" | "flv" | "webm" | "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp"
            | "tiff" => Self::Media,
            "json" | "xml" | "sql" | "db" | "sqlite" | "js" | "html" | "css" | "py" | "java"
            | "cpp" | "c" | "h" | "exe" | "msi" | "deb" | "rpm" | "app" | "apk" | "iso" | "img"
            | "bin" | "log" | "conf" | "cfg" => Self::Code,
            _ => Self::Other,
        }
    }
}

/// Verdict for a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkClassification {
    pub is_downloadable: bool,
    pub extension: Option<String>,
    pub inferred_file_name: Option<String>,
}

/// An anchor as seen on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// Resolved (absolute) `href`.
    pub href: String,
    /// The anchor's text content.
    pub text: String,
    /// Text content of the anchor's parent element.
    pub parent_text: String,
}

/// A downloadable link found by [`scan_links`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLink {
    pub url: String,
    pub file_name: String,
    pub link_text: String,
    pub extension: String,
    pub file_size: Option<String>,
    pub context: String,
    /// Position of the anchor among all anchors on the page.
    pub index: usize,
}

impl FileLink {
    /// Category of this link's extension.
    pub fn category(&self) -> FileCategory {
        FileCategory::from_extension(&self.extension)
    }

    /// The `{url, fileName}` pair handed to a batch.
    pub fn to_download_item(&self) -> DownloadItem {
        DownloadItem::new(self.url.clone(), self.file_name.clone())
    }
}

/// Lowercased file extension of a URL.
///
/// For `http(s)` and similar URLs this is the extension of the last path
/// segment; for `data:` URIs it comes from the MIME type.
pub fn file_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() == "data" {
        return data_mime_type(url)
            .and_then(|mime| mime_extension(&mime))
            .map(str::to_string);
    }

    let last_segment = parsed.path().rsplit('/').next()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Whether the URL's extension is on the downloadable list.
pub fn is_downloadable(url: &str) -> bool {
    file_extension(url)
        .map(|ext| FILE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Classify a URL found at position `index` on the page.
pub fn classify(url: &str, index: usize) -> LinkClassification {
    let extension = file_extension(url);
    let is_downloadable = extension
        .as_deref()
        .map(|ext| FILE_EXTENSIONS.contains(&ext))
        .unwrap_or(false);
    let inferred_file_name = extension
        .as_deref()
        .filter(|_| is_downloadable)
        .map(|ext| infer_file_name(url, index, ext));

    LinkClassification {
        is_downloadable,
        extension,
        inferred_file_name,
    }
}

/// Last path segment of the URL without query or fragment, falling back to
/// `file_<index>.<ext>`.
pub fn infer_file_name(url: &str, index: usize, extension: &str) -> String {
    let fallback = || format!("file_{}.{}", index, extension);
    if url.starts_with("data:") {
        return fallback();
    }

    let last = url.rsplit('/').next().unwrap_or("");
    let name = last.split(['?', '#']).next().unwrap_or("");
    if name.is_empty() {
        fallback()
    } else {
        name.to_string()
    }
}

/// Size hint embedded in link text, e.g. `"Manual (2.5 MB)"` -> `"2.5 MB"`.
pub fn file_size_from_text(text: &str) -> Option<String> {
    static SIZE_RE: OnceLock<Regex> = OnceLock::new();
    let re = SIZE_RE.get_or_init(|| {
        Regex::new(r"(?i)\(([0-9.]+\s*(?:KB|MB|GB|TB))\)").expect("size pattern is valid")
    });
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pick out the downloadable anchors of a page.
pub fn scan_links(anchors: &[Anchor]) -> Vec<FileLink> {
    anchors
        .iter()
        .enumerate()
        .filter_map(|(index, anchor)| {
            let classification = classify(&anchor.href, index);
            if !classification.is_downloadable {
                return None;
            }
            let extension = classification.extension?;
            let file_name = classification.inferred_file_name?;

            let trimmed = anchor.text.trim();
            let link_text = if trimmed.is_empty() {
                file_name.clone()
            } else {
                trimmed.to_string()
            };

            Some(FileLink {
                url: anchor.href.clone(),
                file_name,
                link_text,
                extension,
                file_size: file_size_from_text(&anchor.text),
                context: anchor.parent_text.trim().chars().take(CONTEXT_CHARS).collect(),
                index,
            })
        })
        .collect()
}

/// Keep only links of the given category.
pub fn filter_by_category(links: &[FileLink], category: FileCategory) -> Vec<FileLink> {
    links
        .iter()
        .filter(|link| link.category() == category)
        .cloned()
        .collect()
}

fn data_mime_type(url: &str) -> Option<String> {
    let rest = url.strip_prefix("data:")?;
    let end = rest.find([';', ',']).unwrap_or(rest.len());
    let mime = rest[..end].trim();
    if mime.is_empty() {
        None
    } else {
        Some(mime.to_ascii_lowercase())
    }
}

fn mime_extension(mime: &str) -> Option<&'static str> {
    MIME_EXTENSIONS
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
}
