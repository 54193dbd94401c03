// Command-line surface

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::downloader::{DownloadRequest, FetcherConfig};

/// Download YouTube videos and playlists as MP3 files.
#[derive(Debug, Parser)]
#[command(name = "youtube-mp3", version, about)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download audio from a YouTube video or playlist
    Download(DownloadArgs),
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// YouTube video or playlist URL
    #[arg(long)]
    pub url: String,

    /// Directory to save the downloaded files (created if missing)
    #[arg(long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Delay in seconds between playlist downloads
    #[arg(long, value_name = "SECONDS", default_value_t = 60)]
    pub delay: u64,

    /// Proxy handed to yt-dlp (e.g. socks5://127.0.0.1:1080)
    #[arg(long, env = "YTDLP_PROXY")]
    pub proxy: Option<String>,

    /// yt-dlp socket timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub socket_timeout: u32,

    /// Path to the yt-dlp binary (searched in PATH by default)
    #[arg(long, env = "YTDLP_PATH", value_name = "PATH")]
    pub ytdlp_path: Option<PathBuf>,
}

impl DownloadArgs {
    /// Build the request; `cwd` is used when no output directory was given
    pub fn to_request(&self, cwd: PathBuf) -> DownloadRequest {
        DownloadRequest::new(self.url.clone(), self.output_dir.clone().unwrap_or(cwd))
            .with_delay(Duration::from_secs(self.delay))
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            ytdlp_path: self.ytdlp_path.clone(),
            proxy: self.proxy.clone(),
            socket_timeout: Some(self.socket_timeout),
            ..Default::default()
        }
    }
}

impl Cli {
    /// Default log filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
