// yt-dlp catalog and stream downloader
//
// Two invocation styles:
// - Binary: native `yt-dlp` executable (faster, no Python dependency)
// - Python: `python3 -m yt_dlp` (handy when only the pip package is installed)

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::downloader::config::ToolsConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{
    AudioStream, MediaItem, Playlist, PlaylistEntry, StreamDescriptor, StreamHandle,
    StreamListing, VideoStream,
};
use crate::downloader::traits::{RemoteCatalogProvider, StreamDownloader};
use crate::downloader::utils::{get_network_args, run_output_with_timeout, tail_lines};

/// Listing calls are short; downloads use the configured command timeout
const LISTING_TIMEOUT_SECS: u64 = 120;

/// How yt-dlp is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YtDlpCommand {
    Binary(PathBuf),
    PythonModule(PathBuf),
}

impl YtDlpCommand {
    fn program(&self) -> &Path {
        match self {
            Self::Binary(path) => path,
            Self::PythonModule(python) => python,
        }
    }

    fn base_args(&self) -> Vec<OsString> {
        match self {
            Self::Binary(_) => Vec::new(),
            Self::PythonModule(_) => vec!["-m".into(), "yt_dlp".into()],
        }
    }
}

/// Shared invocation plumbing for the catalog and the downloader
#[derive(Debug, Clone)]
struct YtDlpRunner {
    command: YtDlpCommand,
    tools: ToolsConfig,
}

impl YtDlpRunner {
    async fn run(&self, args: Vec<OsString>, timeout_secs: u64) -> Result<Vec<u8>, DownloadError> {
        let mut full_args = self.command.base_args();
        full_args.extend([
            OsString::from("--no-warnings"),
            OsString::from("--no-update"),
        ]);
        full_args.extend(get_network_args(&self.tools));
        full_args.extend(args);

        let output = run_output_with_timeout(self.command.program(), full_args, timeout_secs).await?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(stderr = %stderr, "yt-dlp exited with failure");
            if stderr.trim().is_empty() {
                return Err(DownloadError::ExecutionError(format!(
                    "yt-dlp failed with exit code: {:?}",
                    output.status.code()
                )));
            }
            Err(DownloadError::from(stderr))
        }
    }
}

/// Catalog backed by `yt-dlp --dump-json`
#[derive(Debug, Clone)]
pub struct YtDlpCatalog {
    runner: YtDlpRunner,
}

impl YtDlpCatalog {
    pub fn new(command: YtDlpCommand, tools: ToolsConfig) -> Self {
        Self {
            runner: YtDlpRunner { command, tools },
        }
    }
}

#[async_trait]
impl RemoteCatalogProvider for YtDlpCatalog {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn list_streams(&self, item: &MediaItem) -> Result<StreamListing, DownloadError> {
        let args = vec![
            OsString::from("--dump-json"),
            OsString::from("--no-playlist"),
            OsString::from(&item.url),
        ];
        let stdout = self.runner.run(args, LISTING_TIMEOUT_SECS).await?;
        parse_listing(&stdout, &item.url)
    }

    async fn fetch_playlist_meta(&self, playlist_url: &str) -> Result<Playlist, DownloadError> {
        let args = vec![
            OsString::from("--flat-playlist"),
            OsString::from("--dump-single-json"),
            OsString::from(playlist_url),
        ];
        let stdout = self.runner.run(args, LISTING_TIMEOUT_SECS).await?;
        parse_playlist(&stdout)
    }
}

/// Downloads one format id with yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpStreamDownloader {
    runner: YtDlpRunner,
}

impl YtDlpStreamDownloader {
    pub fn new(command: YtDlpCommand, tools: ToolsConfig) -> Self {
        Self {
            runner: YtDlpRunner { command, tools },
        }
    }
}

#[async_trait]
impl StreamDownloader for YtDlpStreamDownloader {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let handle = stream.handle();
        let target = dest_dir.join(file_name);
        let args = download_args(handle, &target);

        tracing::debug!(
            format_id = %handle.format_id,
            target = %target.display(),
            "Downloading stream with yt-dlp"
        );

        let stdout = self
            .runner
            .run(args, self.runner.tools.command_timeout_secs)
            .await?;

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            Ok(Some(target))
        } else {
            tracing::warn!(
                format_id = %handle.format_id,
                output = %tail_lines(&stdout, 5),
                "yt-dlp finished without writing the expected file"
            );
            Ok(None)
        }
    }
}

// yt-dlp writes to "<target>.part" and renames on success, so an aborted
// download never shows up under the final name.
fn download_args(handle: &StreamHandle, target: &Path) -> Vec<OsString> {
    // "%" would be read as an output template field
    let template = target.to_string_lossy().replace('%', "%%");

    vec![
        OsString::from("-f"),
        OsString::from(&handle.format_id),
        OsString::from("--no-playlist"),
        OsString::from("--force-overwrites"),
        OsString::from("--retries"),
        OsString::from("5"),
        OsString::from("--fragment-retries"),
        OsString::from("50"),
        OsString::from("-o"),
        OsString::from(template),
        OsString::from(&handle.page_url),
    ]
}

/// Parse `--dump-json` output into a listing
pub fn parse_listing(stdout: &[u8], fallback_url: &str) -> Result<StreamListing, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    let page_url = json["webpage_url"]
        .as_str()
        .filter(|u| !u.is_empty())
        .unwrap_or(fallback_url)
        .to_string();

    let streams = parse_formats(&json, &page_url)?;

    Ok(StreamListing {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        streams,
    })
}

fn parse_formats(
    json: &serde_json::Value,
    page_url: &str,
) -> Result<Vec<StreamDescriptor>, DownloadError> {
    let formats_array = json["formats"]
        .as_array()
        .ok_or_else(|| DownloadError::ParseError("No formats array in JSON".to_string()))?;

    let mut streams = Vec::new();

    for f in formats_array {
        let has_video = f["vcodec"].as_str().map_or(false, |v| v != "none" && !v.is_empty());
        let has_audio = f["acodec"].as_str().map_or(false, |a| a != "none" && !a.is_empty());

        // Storyboards and manifests carry neither
        if !has_video && !has_audio {
            continue;
        }

        let handle = StreamHandle {
            format_id: f["format_id"].as_str().unwrap_or("").to_string(),
            page_url: page_url.to_string(),
            direct_url: f["url"].as_str().map(|s| s.to_string()),
            http_headers: parse_headers(&f["http_headers"]),
        };
        let container = f["ext"].as_str().unwrap_or("").to_string();

        if has_video {
            streams.push(StreamDescriptor::Video(VideoStream {
                handle,
                container,
                resolution: f["height"].as_u64().map(|h| h as u32),
                fps: f["fps"].as_f64().map(|fps| fps.round() as u32),
                progressive: has_audio,
            }));
        } else {
            let abr = f["abr"]
                .as_f64()
                .map(|abr| format!("{}kbps", abr.round() as u32))
                .unwrap_or_default();
            streams.push(StreamDescriptor::Audio(AudioStream {
                handle,
                container,
                abr,
            }));
        }
    }

    Ok(streams)
}

fn parse_headers(value: &serde_json::Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|headers| {
            headers
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse `--flat-playlist --dump-single-json` output
pub fn parse_playlist(stdout: &[u8]) -> Result<Playlist, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    let entries = json["entries"]
        .as_array()
        .ok_or_else(|| DownloadError::ParseError("No entries array in playlist JSON".to_string()))?;

    let entries = entries
        .iter()
        .filter_map(|entry| {
            let url = entry["url"]
                .as_str()
                .filter(|u| u.starts_with("http"))
                .map(|u| u.to_string())
                .or_else(|| {
                    entry["id"]
                        .as_str()
                        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
                })?;
            Some(PlaylistEntry {
                url,
                title: entry["title"].as_str().map(|s| s.to_string()),
            })
        })
        .collect();

    Ok(Playlist {
        title: json["title"].as_str().unwrap_or("Untitled playlist").to_string(),
        entries,
    })
}
