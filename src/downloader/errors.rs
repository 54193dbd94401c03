// Error types for the downloader

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors. Any of these ends the run before the first item is attempted.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL is neither a single-video nor a playlist link
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Output directory cannot be created or written to
    #[error("Output directory {} is not usable: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// yt-dlp (or another required tool) is missing
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Playlist entries could not be listed
    #[error("Could not list playlist {url}: {source}")]
    PlaylistResolution {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("No videos found in playlist: {0}")]
    EmptyPlaylist(String),
}

impl DownloadError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-item failures. Recorded in the item's outcome, the run goes on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network timeout while connecting to YouTube
    #[error("Network timeout: YouTube is not responding")]
    NetworkTimeout,

    /// YouTube blocked the request (429, bot detection, etc.)
    #[error("YouTube is throttling requests from this IP address; try a longer --delay or a proxy")]
    BlockedByYouTube,

    /// Video is private, deleted or otherwise not served
    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    /// yt-dlp or ffmpeg not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Classify raw yt-dlp stderr
impl From<String> for FetchError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if (lower.contains("timeout") || lower.contains("timed out")) && lower.contains("youtube.com") {
            return Self::BlockedByYouTube;
        }

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout;
        }

        if lower.contains("429") || lower.contains("sign in to confirm") || lower.contains("not a bot") {
            return Self::BlockedByYouTube;
        }

        if lower.contains("video unavailable") || lower.contains("private video") || lower.contains("has been removed") {
            return Self::VideoUnavailable(first_error_line(&s));
        }

        if lower.contains("ffmpeg not found") || lower.contains("ffprobe and ffmpeg not found") {
            return Self::ToolNotFound("ffmpeg is required to convert audio to mp3".to_string());
        }

        if lower.contains("command not found") || lower.contains("no such file") {
            return Self::ToolNotFound(first_error_line(&s));
        }

        if lower.contains("json") {
            return Self::ParseError(first_error_line(&s));
        }

        Self::Unknown(first_error_line(&s))
    }
}

/// Pick the most useful line out of a multi-line stderr dump.
fn first_error_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| s.lines().map(str::trim).rev().find(|l| !l.is_empty()))
        .unwrap_or("no error output")
        .to_string()
}
