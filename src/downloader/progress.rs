// yt-dlp progress line parsing

use lazy_static::lazy_static;
use regex::Regex;

use super::models::DownloadProgress;

lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    // [download] 100% of    3.45MiB in 00:00:01 at 2.31MiB/s
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+(?:\.\d+)?)%\s+of\s+~?\s*(\d+(?:\.\d+)?)\s*([KMGT]?i?B)(?:\s+in\s+\S+)?(?:\s+at\s+(\S+/s))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
    ).unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref EXTRACT_RE: Regex = Regex::new(r"\[ExtractAudio\]\s+Destination:\s+(.+)").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
}

/// Turn one line of `yt-dlp --newline` output into a progress event.
/// Lines that carry no progress information yield `None`.
pub fn parse_ytdlp_progress(line: &str) -> Option<DownloadProgress> {
    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2)?.as_str();
        let unit = caps.get(3)?.as_str();
        let speed = caps.get(4).map(|m| m.as_str());
        let eta = caps.get(5).map(|m| m.as_str());
        let frag = match (caps.get(6), caps.get(7)) {
            (Some(fc), Some(ft)) => Some(format!("frag {}/{}", fc.as_str(), ft.as_str())),
            _ => None,
        };

        let mut status = format!("{}{}", size, unit);
        if let Some(speed) = speed {
            status.push_str(&format!(" @ {}", speed));
        }
        if let Some(eta) = eta {
            status.push_str(&format!(" ETA {}", eta));
        }
        if let Some(frag) = frag {
            status.push_str(&format!(" ({})", frag));
        }

        return Some(DownloadProgress {
            percent: percent.clamp(0.0, 100.0),
            total_bytes: parse_size(size, unit),
            status,
        });
    }

    if let Some(caps) = EXTRACT_RE.captures(line) {
        let filename = short_name(caps.get(1).map_or("file", |m| m.as_str()));
        return Some(DownloadProgress::new(100.0, format!("Converting to mp3: {}", filename)));
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = short_name(caps.get(1).map_or("file", |m| m.as_str()));
        return Some(DownloadProgress::new(0.0, format!("Starting: {}", filename)));
    }

    if ALREADY_RE.is_match(line) {
        return Some(DownloadProgress::new(100.0, "File already downloaded"));
    }

    None
}

/// Convert "3.45" + "MiB" into bytes
fn parse_size(value: &str, unit: &str) -> Option<u64> {
    let value: f64 = value.parse().ok()?;
    let multiplier: f64 = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };
    Some((value * multiplier).round() as u64)
}

// Just the file name, capped at 50 chars
fn short_name(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    name.chars().take(50).collect()
}
