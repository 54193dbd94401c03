// Helper functions for the yt-dlp fetcher

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::errors::{DownloadError, FetchError};
use super::models::FetcherConfig;

lazy_static! {
    static ref INVALID_FILENAME_CHARS: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
}

/// Remove characters that are not allowed in file names
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned = INVALID_FILENAME_CHARS.replace_all(filename, "");
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "unknown_title".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Run a command to completion with a time limit, capturing stdout and stderr
pub async fn run_output_with_timeout<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    limit: Duration,
) -> Result<std::process::Output, FetchError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| FetchError::ExecutionError(format!("Failed to capture stdout from {}", program.display())))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| FetchError::ExecutionError(format!("Failed to capture stderr from {}", program.display())))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(limit, child.wait()).await {
        Ok(status) => {
            let status = status.map_err(|e| {
                FetchError::ExecutionError(format!("Failed to wait for {}: {}", program.display(), e))
            })?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(FetchError::NetworkTimeout)
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, FetchError> {
    task.await
        .map_err(|e| FetchError::ExecutionError(format!("{} reader failed: {}", name, e)))?
        .map_err(|e| FetchError::ExecutionError(format!("Failed to read {}: {}", name, e)))
}

pub(crate) fn spawn_error(program: &Path, e: std::io::Error) -> FetchError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FetchError::ToolNotFound(program.display().to_string())
    } else {
        FetchError::ExecutionError(format!("Failed to start {}: {}", program.display(), e))
    }
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(config: &FetcherConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(config: &FetcherConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(timeout) = config.socket_timeout {
        args.push("--socket-timeout".to_string());
        args.push(timeout.to_string());
    }

    args
}

const WRITE_PROBE: &str = ".youtube-mp3-write-probe";

/// Create `dir` if needed and make sure files can be written into it
pub async fn ensure_writable_dir(dir: &Path) -> Result<(), DownloadError> {
    let to_error = |source: std::io::Error| DownloadError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(to_error)?;

    let metadata = tokio::fs::metadata(dir).await.map_err(to_error)?;
    if !metadata.is_dir() {
        return Err(to_error(std::io::Error::new(
            std::io::ErrorKind::Other,
            "path exists and is not a directory",
        )));
    }

    let probe = dir.join(WRITE_PROBE);
    tokio::fs::write(&probe, b"").await.map_err(to_error)?;
    tokio::fs::remove_file(&probe).await.map_err(to_error)?;

    Ok(())
}
