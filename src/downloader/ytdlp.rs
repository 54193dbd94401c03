// yt-dlp backed media fetcher
//
// Every item costs two yt-dlp runs: a `--dump-json` query for the title, then
// the audio download itself with mp3 conversion (ffmpeg does the encoding).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::errors::FetchError;
use super::models::{DownloadProgress, FetcherConfig, VideoRef};
use super::progress::parse_ytdlp_progress;
use super::tools::{self, ToolType};
use super::traits::{MediaFetcher, ProgressSink};
use super::utils::{get_proxy_args, get_timeout_args, run_output_with_timeout, sanitize_filename, spawn_error};

/// Subset of `yt-dlp --dump-json` output we care about
#[derive(Debug, Deserialize)]
struct VideoJson {
    id: Option<String>,
    title: Option<String>,
}

pub struct YtDlpFetcher {
    ytdlp_path: Option<PathBuf>,
    config: FetcherConfig,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        let ytdlp_path = tools::locate(ToolType::YtDlp, config.ytdlp_path.as_deref());
        Self { ytdlp_path, config }
    }

    fn binary(&self) -> Result<&Path, FetchError> {
        self.ytdlp_path.as_deref().ok_or_else(|| {
            FetchError::ToolNotFound(format!(
                "yt-dlp is not installed or not in PATH; {}",
                ToolType::YtDlp.install_hint()
            ))
        })
    }

    fn network_args(&self) -> Vec<String> {
        let mut args = get_timeout_args(&self.config);
        args.extend(get_proxy_args(&self.config));
        args
    }

    pub(crate) fn info_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.network_args());
        args.push(url.to_string());
        args
    }

    pub(crate) fn playlist_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.network_args());
        args.push(url.to_string());
        args
    }

    pub(crate) fn download_args(&self, url: &str, output_dir: &Path, stem: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "bestaudio".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
            "-P".to_string(),
            output_dir.display().to_string(),
            "-o".to_string(),
            // `%` starts a template field
            format!("{}.%(ext)s", stem.replace('%', "%%")),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
        ];
        args.extend(self.network_args());
        args.push(url.to_string());
        args
    }

    async fn get_video_info(&self, url: &str) -> Result<VideoJson, FetchError> {
        let binary = self.binary()?;
        let args = self.info_args(url);
        debug!("[yt-dlp] {} {}", binary.display(), args.join(" "));

        let output = run_output_with_timeout(binary, &args, self.config.info_timeout).await?;
        if !output.status.success() {
            return Err(FetchError::from(String::from_utf8_lossy(&output.stderr).to_string()));
        }

        parse_video_info(&output.stdout)
    }

    /// Run the download, forwarding parsed progress lines to `progress`
    async fn run_download(&self, args: Vec<String>, progress: &dyn ProgressSink) -> Result<(), FetchError> {
        let binary = self.binary()?;
        debug!("[yt-dlp] {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(binary, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::ExecutionError("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        // Titles in paths are not always UTF-8, so read raw lines
        let mut reader = BufReader::new(stdout);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .await
                .map_err(|e| FetchError::ExecutionError(format!("Failed to read yt-dlp output: {}", e)))?;
            if read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(event) = parse_ytdlp_progress(line) {
                progress.emit(event);
            }
            debug!("[yt-dlp] {}", line);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FetchError::ExecutionError(format!("Process error: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else if stderr_output.trim().is_empty() {
            Err(FetchError::ExecutionError(format!("yt-dlp exited with {}", status)))
        } else {
            Err(FetchError::from(stderr_output))
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn check_available(&self) -> Result<(), FetchError> {
        let binary = self.binary()?;
        let version = tools::get_version(binary, ToolType::YtDlp).await.ok_or_else(|| {
            FetchError::ToolNotFound(format!(
                "{} does not run; {}",
                binary.display(),
                ToolType::YtDlp.install_hint()
            ))
        })?;
        info!("Using yt-dlp {} ({})", version, binary.display());

        let ffmpeg = tools::get_tool_info(ToolType::Ffmpeg, None).await;
        if !ffmpeg.is_available {
            warn!(
                "ffmpeg was not found; yt-dlp needs it to convert audio to mp3 ({})",
                ToolType::Ffmpeg.install_hint()
            );
        }

        Ok(())
    }

    async fn resolve_playlist(&self, url: &str) -> Result<Vec<VideoRef>, FetchError> {
        let binary = self.binary()?;
        let args = self.playlist_args(url);
        debug!("[yt-dlp] {} {}", binary.display(), args.join(" "));

        let output = run_output_with_timeout(binary, &args, self.config.info_timeout).await?;
        if !output.status.success() {
            return Err(FetchError::from(String::from_utf8_lossy(&output.stderr).to_string()));
        }

        Ok(parse_playlist_entries(&output.stdout))
    }

    async fn fetch(
        &self,
        item: &VideoRef,
        output_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, FetchError> {
        let info = self.get_video_info(&item.url).await?;

        let title = info
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| item.title.clone())
            .unwrap_or_else(|| {
                let id = info.id.as_deref().unwrap_or(&item.id);
                format!("youtube_video_{}", id)
            });
        let stem = sanitize_filename(&title);
        let output_path = output_dir.join(format!("{}.mp3", stem));

        info!("Downloading: {}", title);

        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            info!("File already exists: {}", output_path.display());
            progress.emit(DownloadProgress::new(100.0, "File already exists"));
            return Ok(output_path);
        }

        progress.emit(DownloadProgress::new(0.0, "Starting download..."));
        self.run_download(self.download_args(&item.url, output_dir, &stem), progress)
            .await?;

        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(FetchError::ExecutionError(format!(
                "yt-dlp finished but {} was not written",
                output_path.display()
            )));
        }

        progress.emit(DownloadProgress::new(100.0, "Download complete"));
        info!("Downloaded: {}.mp3", stem);
        Ok(output_path)
    }
}

fn parse_video_info(stdout: &[u8]) -> Result<VideoJson, FetchError> {
    serde_json::from_slice(stdout).map_err(|e| FetchError::ParseError(format!("Invalid video JSON: {}", e)))
}

/// One JSON object per line; broken lines and entries without an id are skipped
fn parse_playlist_entries(stdout: &[u8]) -> Vec<VideoRef> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<VideoJson>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("[yt-dlp] skipping undecodable playlist line: {}", e);
                None
            }
        })
        .filter_map(|entry| {
            let id = entry.id.filter(|id| !id.is_empty())?;
            Some(VideoRef::from_id(id).with_title(entry.title))
        })
        .collect()
}
