// Orchestrator: classify, pre-flight, then fetch items one by one

use tracing::{error, info, warn};

use super::classifier::classify;
use super::errors::{DownloadError, FetchError};
use super::models::{Classification, DownloadOutcome, DownloadProgress, DownloadRequest, DownloadTarget};
use super::reporter::Reporter;
use super::traits::{Delay, MediaFetcher, ProgressSink};
use super::utils::ensure_writable_dir;

/// Forwards fetcher progress to the reporter
struct ReporterSink<'a>(&'a dyn Reporter);

impl ProgressSink for ReporterSink<'_> {
    fn emit(&self, progress: DownloadProgress) {
        self.0.on_progress(&progress);
    }
}

pub struct Orchestrator {
    fetcher: Box<dyn MediaFetcher>,
    delay: Box<dyn Delay>,
    reporter: Box<dyn Reporter>,
}

impl Orchestrator {
    pub fn new(fetcher: Box<dyn MediaFetcher>, delay: Box<dyn Delay>, reporter: Box<dyn Reporter>) -> Self {
        Self {
            fetcher,
            delay,
            reporter,
        }
    }

    /// Resolve the request into its target. Everything that can fail here is fatal.
    pub async fn prepare(&self, request: &DownloadRequest) -> Result<DownloadTarget, DownloadError> {
        let classification = classify(&request.url)?;
        match &classification {
            Classification::Single(_) => info!("Detected single video URL"),
            Classification::Playlist { .. } => info!("Detected playlist URL"),
        }

        ensure_writable_dir(&request.output_dir).await?;

        self.fetcher
            .check_available()
            .await
            .map_err(|e| match e {
                FetchError::ToolNotFound(msg) => DownloadError::ToolNotFound(msg),
                other => DownloadError::ToolNotFound(other.to_string()),
            })?;

        match classification {
            Classification::Single(item) => Ok(DownloadTarget::Single(item)),
            Classification::Playlist { list_id, url } => {
                let items = self
                    .fetcher
                    .resolve_playlist(&url)
                    .await
                    .map_err(|source| DownloadError::PlaylistResolution {
                        url: url.clone(),
                        source,
                    })?;

                if items.is_empty() {
                    return Err(DownloadError::EmptyPlaylist(url));
                }

                info!("Playlist: {}", url);
                info!("Number of videos: {}", items.len());
                Ok(DownloadTarget::Playlist { list_id, items })
            }
        }
    }

    /// Download every item of the request.
    ///
    /// Item failures are recorded in the returned outcomes and never abort the
    /// loop; only pre-flight problems come back as `Err`.
    pub async fn run(&self, request: &DownloadRequest) -> Result<Vec<DownloadOutcome>, DownloadError> {
        let target = self.prepare(request).await?;
        self.reporter.on_target(&target);
        Ok(self.download_all(&target, request).await)
    }

    async fn download_all(&self, target: &DownloadTarget, request: &DownloadRequest) -> Vec<DownloadOutcome> {
        let items = target.items();
        let total = items.len();
        let sink = ReporterSink(self.reporter.as_ref());
        let mut outcomes = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                if !request.delay.is_zero() {
                    self.reporter.on_waiting(request.delay);
                }
                self.delay.wait(request.delay).await;
            }

            info!("Processing video {}/{}: {}", index + 1, total, item.label());
            self.reporter.on_item_started(index, total, item);

            let result = self.fetcher.fetch(item, &request.output_dir, &sink).await;
            if let Err(e) = &result {
                error!("Error downloading {} with {}: {}", item.url, self.fetcher.name(), e);
            }

            let outcome = DownloadOutcome {
                index,
                item: item.clone(),
                result,
            };
            self.reporter.on_item_finished(total, &outcome);
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed == 0 {
            if target.is_playlist() {
                info!("Playlist download completed!");
            }
        } else {
            warn!("{} of {} downloads failed", failed, total);
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::VideoRef;
    use crate::downloader::reporter::SilentReporter;
    use crate::downloader::traits::TokioDelay;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Check,
        Resolve(String),
        Fetch(String),
        Wait(Duration),
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    struct FakeFetcher {
        log: Log,
        playlist: Vec<&'static str>,
        failing: HashSet<&'static str>,
        available: bool,
        fetch_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
    }

    impl FakeFetcher {
        fn new(log: &Log, playlist: Vec<&'static str>) -> Self {
            Self {
                log: log.clone(),
                playlist,
                failing: HashSet::new(),
                available: true,
                fetch_times: Arc::default(),
            }
        }

        fn failing(mut self, ids: &[&'static str]) -> Self {
            self.failing.extend(ids);
            self
        }
    }

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn check_available(&self) -> Result<(), FetchError> {
            self.log.lock().unwrap().push(Event::Check);
            if self.available {
                Ok(())
            } else {
                Err(FetchError::ToolNotFound("yt-dlp".to_string()))
            }
        }

        async fn resolve_playlist(&self, url: &str) -> Result<Vec<VideoRef>, FetchError> {
            self.log.lock().unwrap().push(Event::Resolve(url.to_string()));
            Ok(self.playlist.iter().map(|id| VideoRef::from_id(*id)).collect())
        }

        async fn fetch(
            &self,
            item: &VideoRef,
            output_dir: &Path,
            progress: &dyn ProgressSink,
        ) -> Result<PathBuf, FetchError> {
            self.log.lock().unwrap().push(Event::Fetch(item.id.clone()));
            self.fetch_times.lock().unwrap().push(tokio::time::Instant::now());
            progress.emit(DownloadProgress::new(100.0, "done"));

            if self.failing.contains(item.id.as_str()) {
                Err(FetchError::VideoUnavailable(item.id.clone()))
            } else {
                Ok(output_dir.join(format!("{}.mp3", item.id)))
            }
        }
    }

    struct RecordingDelay(Log);

    #[async_trait]
    impl Delay for RecordingDelay {
        async fn wait(&self, duration: Duration) {
            self.0.lock().unwrap().push(Event::Wait(duration));
        }
    }

    #[derive(Default)]
    struct CountingReporter {
        progress: Mutex<usize>,
        finished: Mutex<Vec<usize>>,
    }

    impl Reporter for Arc<CountingReporter> {
        fn on_progress(&self, _progress: &DownloadProgress) {
            *self.progress.lock().unwrap() += 1;
        }

        fn on_item_finished(&self, _total: usize, outcome: &DownloadOutcome) {
            self.finished.lock().unwrap().push(outcome.index);
        }
    }

    fn orchestrator(fetcher: FakeFetcher, log: &Log) -> Orchestrator {
        Orchestrator::new(
            Box::new(fetcher),
            Box::new(RecordingDelay(log.clone())),
            Box::new(SilentReporter),
        )
    }

    fn fetches(log: &Log) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Fetch(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn waits(log: &Log) -> usize {
        log.lock().unwrap().iter().filter(|e| matches!(e, Event::Wait(_))).count()
    }

    const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=xyz";

    #[tokio::test]
    async fn single_video_fetches_once_without_delay() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec![]), &log);

        let request = DownloadRequest::new("https://www.youtube.com/watch?v=abc", temp.path());
        let outcomes = runner.run(&request).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].path(), Some(temp.path().join("abc.mp3").as_path()));
        assert_eq!(fetches(&log), vec!["abc"]);
        assert_eq!(waits(&log), 0);
        assert!(!log.lock().unwrap().iter().any(|e| matches!(e, Event::Resolve(_))));
    }

    #[tokio::test]
    async fn playlist_waits_only_between_items() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec!["a", "b", "c"]), &log);

        let request = DownloadRequest::new(PLAYLIST_URL, temp.path()).with_delay(Duration::from_secs(5));
        let outcomes = runner.run(&request).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        let five = Duration::from_secs(5);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::Check,
                Event::Resolve(PLAYLIST_URL.to_string()),
                Event::Fetch("a".to_string()),
                Event::Wait(five),
                Event::Fetch("b".to_string()),
                Event::Wait(five),
                Event::Fetch("c".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_item_does_not_stop_the_playlist() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let fetcher = FakeFetcher::new(&log, vec!["a", "b", "c"]).failing(&["b"]);
        let runner = orchestrator(fetcher, &log);

        let request = DownloadRequest::new(PLAYLIST_URL, temp.path()).with_delay(Duration::from_secs(1));
        let outcomes = runner.run(&request).await.unwrap();

        assert_eq!(fetches(&log), vec!["a", "b", "c"]);
        assert_eq!(waits(&log), 2);

        let ids: Vec<&str> = outcomes.iter().map(|o| o.item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let indexes: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].error(), Some(&FetchError::VideoUnavailable("b".to_string())));
        assert!(outcomes[2].is_success());
    }

    #[tokio::test]
    async fn every_item_failing_still_attempts_all() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let fetcher = FakeFetcher::new(&log, vec!["a", "b", "c", "d"]).failing(&["a", "b", "c", "d"]);
        let runner = orchestrator(fetcher, &log);

        let request = DownloadRequest::new(PLAYLIST_URL, temp.path());
        let outcomes = runner.run(&request).await.unwrap();

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| !o.is_success()));
        assert_eq!(fetches(&log).len(), 4);
        assert_eq!(waits(&log), 3);
    }

    #[tokio::test]
    async fn zero_delay_still_waits_between_items() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec!["a", "b", "c"]), &log);

        let request = DownloadRequest::new(PLAYLIST_URL, temp.path()).with_delay(Duration::ZERO);
        runner.run(&request).await.unwrap();

        assert_eq!(fetches(&log), vec!["a", "b", "c"]);
        assert_eq!(waits(&log), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::Check,
                Event::Resolve(PLAYLIST_URL.to_string()),
                Event::Fetch("a".to_string()),
                Event::Wait(Duration::ZERO),
                Event::Fetch("b".to_string()),
                Event::Wait(Duration::ZERO),
                Event::Fetch("c".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_url_fails_before_any_work() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("never-created");
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec!["a"]), &log);

        let request = DownloadRequest::new("https://example.com/not-youtube", &out);
        let err = runner.run(&request).await.unwrap_err();

        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
        assert!(log.lock().unwrap().is_empty());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn unusable_output_dir_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a-file");
        std::fs::write(&file, b"").unwrap();
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec![]), &log);

        let request = DownloadRequest::new("https://youtu.be/abc", &file);
        let err = runner.run(&request).await.unwrap_err();

        assert!(matches!(err, DownloadError::OutputDirectory { .. }));
        assert!(fetches(&log).is_empty());
    }

    #[tokio::test]
    async fn missing_output_dir_is_created() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("music").join("new");
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec![]), &log);

        runner.run(&DownloadRequest::new("https://youtu.be/abc", &out)).await.unwrap();
        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn unavailable_tool_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let mut fetcher = FakeFetcher::new(&log, vec!["a"]);
        fetcher.available = false;
        let runner = orchestrator(fetcher, &log);

        let err = runner.run(&DownloadRequest::new(PLAYLIST_URL, temp.path())).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
        assert_eq!(*log.lock().unwrap(), vec![Event::Check]);
    }

    #[tokio::test]
    async fn empty_playlist_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let runner = orchestrator(FakeFetcher::new(&log, vec![]), &log);

        let err = runner.run(&DownloadRequest::new(PLAYLIST_URL, temp.path())).await.unwrap_err();
        assert!(matches!(err, DownloadError::EmptyPlaylist(_)));
        assert!(fetches(&log).is_empty());
    }

    #[tokio::test]
    async fn same_request_into_other_dir_behaves_the_same() {
        let mut runs = Vec::new();
        for _ in 0..2 {
            let temp = tempfile::tempdir().unwrap();
            let log = Log::default();
            let runner = orchestrator(FakeFetcher::new(&log, vec!["a", "b"]), &log);
            let request = DownloadRequest::new(PLAYLIST_URL, temp.path()).with_delay(Duration::ZERO);

            let target = runner.prepare(&request).await.unwrap();
            let outcomes = runner.run(&request).await.unwrap();
            runs.push((target.is_playlist(), target.items().to_vec(), outcomes.len()));
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn reporter_sees_progress_and_outcomes_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let reporter = Arc::new(CountingReporter::default());
        let runner = Orchestrator::new(
            Box::new(FakeFetcher::new(&log, vec!["a", "b", "c"])),
            Box::new(RecordingDelay(log.clone())),
            Box::new(reporter.clone()),
        );

        runner
            .run(&DownloadRequest::new(PLAYLIST_URL, temp.path()))
            .await
            .unwrap();

        assert_eq!(*reporter.progress.lock().unwrap(), 3);
        assert_eq!(*reporter.finished.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn playlist_fetches_are_spaced_by_the_delay() {
        let temp = tempfile::tempdir().unwrap();
        let log = Log::default();
        let fetcher = FakeFetcher::new(&log, vec!["a", "b", "c"]);
        let times = fetcher.fetch_times.clone();
        let runner = Orchestrator::new(Box::new(fetcher), Box::new(TokioDelay), Box::new(SilentReporter));

        let start = tokio::time::Instant::now();
        let request = DownloadRequest::new(PLAYLIST_URL, temp.path()).with_delay(Duration::from_secs(5));
        runner.run(&request).await.unwrap();

        let offsets: Vec<Duration> = times.lock().unwrap().iter().map(|t| *t - start).collect();
        assert_eq!(offsets.len(), 3);
        assert!(offsets[0] < Duration::from_secs(1));
        assert!(offsets[1] >= Duration::from_secs(5));
        assert!(offsets[2] >= Duration::from_secs(10));
        assert!(offsets[2] - offsets[1] >= Duration::from_secs(5));
    }
}
