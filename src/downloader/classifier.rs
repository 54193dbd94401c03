// URL classification: single video vs playlist, decided from URL shape alone

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::errors::DownloadError;
use super::models::{Classification, VideoRef};

lazy_static! {
    static ref ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

const SHORT_HOST: &str = "youtu.be";

/// Path prefixes that carry a video id as the next segment
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v"];

/// Classify `raw` as a single video or a playlist.
///
/// A `list` query parameter wins over `v`, so `watch?v=..&list=..` is a playlist.
pub fn classify(raw: &str) -> Result<Classification, DownloadError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| DownloadError::invalid_url(trimmed, format!("not a URL ({})", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_url(
            trimmed,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| DownloadError::invalid_url(trimmed, "missing host"))?;

    let is_short = host == SHORT_HOST;
    if !is_short && !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Err(DownloadError::invalid_url(
            trimmed,
            format!("'{}' is not a YouTube host", host),
        ));
    }

    if let Some(list_id) = query_value(&url, "list") {
        if !ID_RE.is_match(&list_id) {
            return Err(DownloadError::invalid_url(trimmed, "malformed playlist id"));
        }
        return Ok(Classification::Playlist {
            list_id,
            url: trimmed.to_string(),
        });
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let video_id = if is_short {
        segments.first().map(|s| s.to_string())
    } else {
        match segments.as_slice() {
            ["watch"] => query_value(&url, "v"),
            ["playlist"] => {
                return Err(DownloadError::invalid_url(trimmed, "playlist link without a list id"));
            }
            [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => Some(id.to_string()),
            _ => None,
        }
    };

    match video_id {
        Some(id) if ID_RE.is_match(&id) => Ok(Classification::Single(VideoRef {
            id,
            url: trimmed.to_string(),
            title: None,
        })),
        Some(_) => Err(DownloadError::invalid_url(trimmed, "malformed video id")),
        None => Err(DownloadError::invalid_url(
            trimmed,
            "neither a video nor a playlist link",
        )),
    }
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}
