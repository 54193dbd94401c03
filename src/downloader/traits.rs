// Seams between the orchestrator and the outside world

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::errors::FetchError;
use super::models::{DownloadProgress, VideoRef};

/// Receives progress events while an item is being fetched
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: DownloadProgress);
}

/// Retrieves audio for one item and writes it as MP3
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Name of the fetcher (for logging)
    fn name(&self) -> &'static str;

    /// Check that the underlying tooling can run
    async fn check_available(&self) -> Result<(), FetchError> {
        Ok(())
    }

    /// List the videos of a playlist, in playlist order
    async fn resolve_playlist(&self, url: &str) -> Result<Vec<VideoRef>, FetchError>;

    /// Download one item into `output_dir`, returning the written file
    async fn fetch(
        &self,
        item: &VideoRef,
        output_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, FetchError>;
}

/// The wait between playlist items
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

const COUNTDOWN_STEP: Duration = Duration::from_secs(10);

/// Sleeps on the Tokio timer, logging the remaining time every ten seconds
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        info!("Waiting {} seconds before next download...", duration.as_secs());

        let mut remaining = duration;
        while !remaining.is_zero() {
            // Align steps on multiples of ten so the log reads 60, 50, 40...
            let rem_to_step = Duration::from_secs(remaining.as_secs() % COUNTDOWN_STEP.as_secs())
                + Duration::from_nanos(u64::from(remaining.subsec_nanos()));
            let step = if rem_to_step.is_zero() {
                COUNTDOWN_STEP.min(remaining)
            } else {
                rem_to_step
            };

            tokio::time::sleep(step).await;
            remaining -= step;

            if !remaining.is_zero() {
                info!("Waiting {} more seconds...", remaining.as_secs());
            }
        }
    }
}
