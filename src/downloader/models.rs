// Common data models for the download pipeline

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::JobError;

/// Kind of elementary stream offered by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Everything a [`StreamDownloader`](super::traits::StreamDownloader) needs to
/// fetch one stream. Selection never looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    /// Provider format id (e.g., "137", "140")
    pub format_id: String,
    /// Page URL the format belongs to
    pub page_url: String,
    /// Direct media URL, when the provider exposes one
    pub direct_url: Option<String>,
    /// Headers the provider requires for `direct_url`
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

/// A video representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStream {
    pub handle: StreamHandle,
    /// File extension (mp4, webm)
    pub container: String,
    /// Vertical resolution in pixels
    pub resolution: Option<u32>,
    pub fps: Option<u32>,
    /// Whether the stream already carries muxed audio
    pub progressive: bool,
}

impl VideoStream {
    /// Resolution used for ranking; unknown counts as 0
    pub fn effective_resolution(&self) -> u32 {
        self.resolution.unwrap_or(0)
    }
}

/// An audio representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    pub handle: StreamHandle,
    /// File extension (m4a, webm)
    pub container: String,
    /// Bitrate as reported by the provider, e.g. "128kbps"
    pub abr: String,
}

impl AudioStream {
    /// Parsed bitrate in kbps, 0 when the raw value is malformed
    pub fn bitrate(&self) -> u32 {
        parse_bitrate(&self.abr)
    }
}

/// One entry of a catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamDescriptor {
    Video(VideoStream),
    Audio(AudioStream),
}

impl StreamDescriptor {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Video(_) => StreamKind::Video,
            Self::Audio(_) => StreamKind::Audio,
        }
    }

    pub fn resolution(&self) -> Option<u32> {
        match self {
            Self::Video(v) => v.resolution,
            Self::Audio(_) => None,
        }
    }

    pub fn bitrate(&self) -> Option<u32> {
        match self {
            Self::Video(_) => None,
            Self::Audio(a) => Some(a.bitrate()),
        }
    }

    pub fn is_progressive(&self) -> bool {
        matches!(self, Self::Video(v) if v.progressive)
    }

    pub fn container(&self) -> &str {
        match self {
            Self::Video(v) => &v.container,
            Self::Audio(a) => &a.container,
        }
    }

    pub fn handle(&self) -> &StreamHandle {
        match self {
            Self::Video(v) => &v.handle,
            Self::Audio(a) => &a.handle,
        }
    }

    pub fn as_video(&self) -> Option<&VideoStream> {
        match self {
            Self::Video(v) => Some(v),
            Self::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioStream> {
        match self {
            Self::Video(_) => None,
            Self::Audio(a) => Some(a),
        }
    }
}

/// Parse a "<n>kbps" bitrate string. Anything else yields 0.
pub fn parse_bitrate(abr: &str) -> u32 {
    abr.strip_suffix("kbps")
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0)
}

/// Result of asking the catalog about one media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamListing {
    pub id: String,
    pub title: String,
    pub streams: Vec<StreamDescriptor>,
}

/// A remote media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    /// Zero-based position inside its playlist
    pub playlist_index: Option<usize>,
    pub title: Option<String>,
}

impl MediaItem {
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            playlist_index: None,
            title: None,
        }
    }
}

/// Playlist entry as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub url: String,
    pub title: Option<String>,
}

/// Playlist metadata, fetched once per playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub title: String,
    pub entries: Vec<PlaylistEntry>,
}

/// Filename prefix for a playlist position: "01. " for index 0
pub fn filename_prefix(playlist_index: Option<usize>) -> String {
    playlist_index
        .map(|i| format!("{:02}. ", i + 1))
        .unwrap_or_default()
}

/// One unit of work for the batch scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Unique per job; keys the staging directory
    pub id: Uuid,
    pub item: MediaItem,
    pub output_dir: PathBuf,
    pub filename_prefix: String,
}

impl DownloadJob {
    pub fn new(item: MediaItem, output_dir: impl Into<PathBuf>) -> Self {
        let filename_prefix = filename_prefix(item.playlist_index);
        Self {
            id: Uuid::new_v4(),
            item,
            output_dir: output_dir.into(),
            filename_prefix,
        }
    }

    /// Unsanitized output name: prefix + title + extension
    pub fn output_name(&self, title: &str, container: &str) -> String {
        format!("{}{}.{}", self.filename_prefix, title, container)
    }

    /// Unsanitized staging name for one pre-remux stream
    pub fn staging_name(&self, title: &str, kind: StreamKind, container: &str) -> String {
        format!("{}{}.{}.{}", self.filename_prefix, title, kind, container)
    }

    /// Per-job staging directory under the shared temp root
    pub fn staging_dir(&self, temp_root: &Path) -> PathBuf {
        temp_root.join(self.id.to_string())
    }
}

/// A finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDownload {
    pub title: String,
    pub video: VideoStream,
    /// Present only when the video was not progressive
    pub audio: Option<AudioStream>,
    pub path: PathBuf,
}

impl CompletedDownload {
    pub fn remuxed(&self) -> bool {
        self.audio.is_some()
    }
}

/// Per-job result, stored at the job's submission position
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub position: usize,
    pub job_id: Uuid,
    pub url: String,
    pub outcome: Result<CompletedDownload, JobError>,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn completed(&self) -> Option<&CompletedDownload> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }
}
