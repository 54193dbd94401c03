// Console reporting: progress bar while fetching, summary at the end

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use super::models::{DownloadOutcome, DownloadProgress, DownloadTarget, VideoRef};

const BAR_WIDTH: usize = 30;

/// Observer of a download run
pub trait Reporter: Send + Sync {
    fn on_target(&self, _target: &DownloadTarget) {}

    fn on_item_started(&self, _index: usize, _total: usize, _item: &VideoRef) {}

    fn on_progress(&self, _progress: &DownloadProgress) {}

    fn on_item_finished(&self, _total: usize, _outcome: &DownloadOutcome) {}

    fn on_waiting(&self, _delay: Duration) {}
}

/// Reporter that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Renders a one-line progress bar on stderr and per-item results on stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    // Whether a bar is currently drawn and needs clearing
    bar_active: Mutex<bool>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear_bar(&self) {
        if let Ok(mut active) = self.bar_active.lock() {
            if *active {
                let mut err = io::stderr().lock();
                let _ = write!(err, "\r\x1b[2K");
                let _ = err.flush();
                *active = false;
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_target(&self, target: &DownloadTarget) {
        if let DownloadTarget::Playlist { list_id, items } = target {
            println!("Playlist {}: {} videos", list_id, items.len());
        }
    }

    fn on_item_started(&self, index: usize, total: usize, item: &VideoRef) {
        self.clear_bar();
        println!("[{}/{}] {}", index + 1, total, item.label());
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        let line = render_bar(progress, BAR_WIDTH);
        if let Ok(mut active) = self.bar_active.lock() {
            let mut err = io::stderr().lock();
            let _ = write!(err, "\r\x1b[2K{}", line);
            let _ = err.flush();
            *active = true;
        }
    }

    fn on_item_finished(&self, total: usize, outcome: &DownloadOutcome) {
        self.clear_bar();
        println!("{}", outcome_line(total, outcome));
    }

    fn on_waiting(&self, delay: Duration) {
        self.clear_bar();
        println!("Waiting {}s before the next download...", delay.as_secs());
    }
}

/// `[#########---------]  45.0% [1.4MiB/3.1MiB] <status>`
pub fn render_bar(progress: &DownloadProgress, width: usize) -> String {
    let percent = progress.percent.clamp(0.0, 100.0);
    let filled = ((f64::from(percent) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    let bytes = match (progress.downloaded_bytes(), progress.total_bytes) {
        (Some(done), Some(total)) => format!("{}/{} ", format_bytes(done), format_bytes(total)),
        _ => String::new(),
    };
    format!(
        "[{}{}] {:5.1}% {}{}",
        "#".repeat(filled),
        "-".repeat(width - filled),
        percent,
        bytes,
        progress.status
    )
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", value, UNITS[unit])
}

fn outcome_line(total: usize, outcome: &DownloadOutcome) -> String {
    let position = format!("[{}/{}]", outcome.index + 1, total);
    match &outcome.result {
        Ok(path) => format!("✔ {} {} -> {}", position, outcome.item.label(), path.display()),
        Err(e) => format!("✘ {} {} failed: {}", position, outcome.item.label(), e),
    }
}

/// Aggregate counts over a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// 0 when every item succeeded, 1 otherwise
    pub fn exit_status(&self) -> u8 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Summary text: one line per item followed by the totals
pub fn format_summary(outcomes: &[DownloadOutcome]) -> String {
    let summary = RunSummary::from_outcomes(outcomes);
    let mut out = String::from("Summary:\n");
    for outcome in outcomes {
        out.push_str("  ");
        out.push_str(&outcome_line(outcomes.len(), outcome));
        out.push('\n');
    }
    out.push_str(&format!(
        "{} succeeded, {} failed ({} total)",
        summary.succeeded,
        summary.failed,
        summary.total()
    ));
    out
}

pub fn print_summary(outcomes: &[DownloadOutcome]) -> RunSummary {
    println!("{}", format_summary(outcomes));
    RunSummary::from_outcomes(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::FetchError;
    use std::path::PathBuf;

    fn outcome(index: usize, ok: bool) -> DownloadOutcome {
        let item = VideoRef::from_id(format!("v{}", index));
        DownloadOutcome {
            index,
            result: if ok {
                Ok(PathBuf::from(format!("/music/v{}.mp3", index)))
            } else {
                Err(FetchError::NetworkTimeout)
            },
            item,
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        let bar = render_bar(&DownloadProgress::new(50.0, "1.00MiB"), 10);
        assert_eq!(bar, "[#####-----]  50.0% 1.00MiB");

        let bar = render_bar(&DownloadProgress::new(150.0, "done"), 4);
        assert_eq!(bar, "[####] 100.0% done");

        let bar = render_bar(&DownloadProgress::new(0.0, ""), 4);
        assert!(bar.starts_with("[----]"));
    }

    #[test]
    fn bar_shows_byte_counts_when_size_is_known() {
        let mut progress = DownloadProgress::new(50.0, "1.00MiB @ 2.00MiB/s");
        progress.total_bytes = Some(3 * 1024 * 1024);
        let bar = render_bar(&progress, 4);
        assert_eq!(bar, "[##--]  50.0% 1.5MiB/3.0MiB 1.00MiB @ 2.00MiB/s");

        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KiB");
    }

    #[test]
    fn summary_counts_failures() {
        let outcomes = vec![outcome(0, true), outcome(1, false), outcome(2, true)];
        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary, RunSummary { succeeded: 2, failed: 1 });
        assert!(!summary.all_succeeded());
        assert_eq!(summary.exit_status(), 1);

        let text = format_summary(&outcomes);
        assert!(text.contains("✘ [2/3] v1 failed: Network timeout"));
        assert!(text.contains("✔ [3/3] v2 -> /music/v2.mp3"));
        assert!(text.ends_with("2 succeeded, 1 failed (3 total)"));
    }

    #[test]
    fn clean_run_exits_zero() {
        let summary = RunSummary::from_outcomes(&[outcome(0, true)]);
        assert!(summary.all_succeeded());
        assert_eq!(summary.exit_status(), 0);
    }
}
