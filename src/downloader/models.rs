// Common data models for downloader

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::FetchError;

/// Default wait between playlist items
pub const DEFAULT_DELAY: Duration = Duration::from_secs(60);

/// One run of the `download` command. Built once from CLI input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Applied only between consecutive playlist items
    pub delay: Duration,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A single downloadable video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
}

impl VideoRef {
    /// Reference a video by id through the canonical watch URL
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            url: format!("https://www.youtube.com/watch?v={}", id),
            id,
            title: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    /// Title if known, otherwise the id
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// Network-free result of looking at a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Single(VideoRef),
    Playlist { list_id: String, url: String },
}

impl Classification {
    pub fn is_playlist(&self) -> bool {
        matches!(self, Self::Playlist { .. })
    }
}

/// What a request resolves to: one video or an ordered list of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    Single(VideoRef),
    Playlist { list_id: String, items: Vec<VideoRef> },
}

impl DownloadTarget {
    /// Items in download order
    pub fn items(&self) -> &[VideoRef] {
        match self {
            Self::Single(item) => std::slice::from_ref(item),
            Self::Playlist { items, .. } => items,
        }
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, Self::Playlist { .. })
    }
}

/// Result of attempting one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Position of the item in its target
    pub index: usize,
    pub item: VideoRef,
    pub result: Result<PathBuf, FetchError>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }
}

/// Download progress information
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: f32,
    /// Size of the file being fetched, when yt-dlp reports it
    pub total_bytes: Option<u64>,
    pub status: String,
}

impl DownloadProgress {
    pub fn new(percent: f32, status: impl Into<String>) -> Self {
        Self {
            percent,
            total_bytes: None,
            status: status.into(),
        }
    }

    /// Bytes done so far, derived from percent and total size
    pub fn downloaded_bytes(&self) -> Option<u64> {
        self.total_bytes
            .map(|total| (total as f64 * f64::from(self.percent.clamp(0.0, 100.0)) / 100.0) as u64)
    }
}

/// Settings for the yt-dlp fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Explicit yt-dlp binary; searched for when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Proxy URL handed to yt-dlp (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Socket timeout in seconds
    pub socket_timeout: Option<u32>,

    /// Upper bound for metadata queries (title lookup, playlist listing)
    pub info_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            proxy: None,
            socket_timeout: Some(30),
            info_timeout: Duration::from_secs(120),
        }
    }
}
