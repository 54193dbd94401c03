// Downloader module: URL classification, yt-dlp fetching, sequencing, reporting

pub mod classifier;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod reporter;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod ytdlp;

pub use classifier::classify;
pub use errors::{DownloadError, FetchError};
pub use models::{
    Classification, DownloadOutcome, DownloadProgress, DownloadRequest, DownloadTarget, FetcherConfig, VideoRef,
};
pub use orchestrator::Orchestrator;
pub use reporter::{ConsoleReporter, Reporter, RunSummary, SilentReporter};
pub use traits::{Delay, MediaFetcher, ProgressSink, TokioDelay};
pub use ytdlp::YtDlpFetcher;
