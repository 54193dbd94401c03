// External tool discovery (yt-dlp, ffmpeg)

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::utils::run_output_with_timeout;

const VERSION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }

    pub fn install_hint(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "install it with: pip install yt-dlp",
            ToolType::Ffmpeg => "install it with your package manager (e.g. brew install ffmpeg)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

/// Find a tool binary: explicit path first, then PATH, then common install locations
pub fn locate(tool: ToolType, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let binary_name = tool.as_str();

    if let Ok(path) = which::which(binary_name) {
        return Some(path);
    }

    let mut common_paths = vec![
        PathBuf::from("/opt/homebrew/bin").join(binary_name), // Homebrew on Apple Silicon
        PathBuf::from("/usr/local/bin").join(binary_name),    // Homebrew on Intel Mac
        PathBuf::from("/usr/bin").join(binary_name),
    ];
    // pip install --user
    if let Some(home) = dirs::home_dir() {
        common_paths.push(home.join(".local").join("bin").join(binary_name));
    }

    common_paths.into_iter().find(|p| p.is_file())
}

/// First line of `<tool> --version`, if the tool runs
pub async fn get_version(path: &Path, tool: ToolType) -> Option<String> {
    match run_output_with_timeout(path, &[tool.version_arg()], VERSION_TIMEOUT).await {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        Ok(output) => {
            debug!(
                "[Tools] {} exited with {}: {}",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Err(e) => {
            debug!("[Tools] {} failed to run: {}", path.display(), e);
            None
        }
    }
}

pub async fn get_tool_info(tool: ToolType, explicit: Option<&Path>) -> ToolInfo {
    let path = locate(tool, explicit);
    let version = match &path {
        Some(p) => get_version(p, tool).await,
        None => None,
    };

    ToolInfo {
        tool_type: tool,
        is_available: version.is_some(),
        version,
        path,
    }
}
