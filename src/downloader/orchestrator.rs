// Downloader facade
//
// Wires configuration and collaborators into one pipeline and exposes the
// three entry points: a single URL, a playlist URL, or a mixed list of URLs
// processed as one batch. Each call processes its batch and returns; looping
// is up to the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::{DownloaderConfig, StreamBackend};
use super::errors::{ConfigError, DownloadError, JobError};
use super::extractors::{HttpStreamDownloader, YtDlpCatalog, YtDlpCommand, YtDlpStreamDownloader};
use super::fetch::FetchOrchestrator;
use super::format_selector::StreamSelector;
use super::models::{DownloadJob, DownloadResult, MediaItem};
use super::playlist::PlaylistExpander;
use super::remux::{FfmpegMuxer, Remuxer};
use super::sanitize::DefaultSanitizer;
use super::scheduler::{BatchScheduler, JobPipeline};
use super::tools::{ToolManager, ToolType};
use super::traits::{MuxingTool, PathSanitizer, RemoteCatalogProvider, StreamDownloader};

/// URLs containing this marker are expanded as playlists
const PLAYLIST_MARKER: &str = "playlist";

pub fn is_playlist_url(url: &str) -> bool {
    url.contains(PLAYLIST_MARKER)
}

/// Outcome of [`Downloader::download_urls`]
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One entry per job, in submission order
    pub results: Vec<DownloadResult>,
    /// Inputs that were not `https://` URLs
    pub rejected: Vec<String>,
    /// Playlists whose metadata could not be fetched
    pub failed_playlists: Vec<(String, JobError)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// "01. 720p 30fps" for a finished job, "01. None" for a failed one
    pub fn summary_lines(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|result| {
                let number = format!("{:02}.", result.position + 1);
                match result.completed() {
                    Some(done) => {
                        let mut line =
                            format!("{} {}p", number, done.video.effective_resolution());
                        if let Some(fps) = done.video.fps {
                            line.push_str(&format!(" {}fps", fps));
                        }
                        line
                    }
                    None => format!("{} None", number),
                }
            })
            .collect()
    }
}

pub struct Downloader {
    config: DownloaderConfig,
    expander: PlaylistExpander,
    scheduler: BatchScheduler,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(
        config: DownloaderConfig,
        catalog: Arc<dyn RemoteCatalogProvider>,
        stream_downloader: Arc<dyn StreamDownloader>,
        muxer: Arc<dyn MuxingTool>,
    ) -> Result<Self, ConfigError> {
        Self::with_sanitizer(
            config,
            catalog,
            stream_downloader,
            muxer,
            Arc::new(DefaultSanitizer),
        )
    }

    /// Validates the config and creates the output root; both failures are fatal
    pub fn with_sanitizer(
        config: DownloaderConfig,
        catalog: Arc<dyn RemoteCatalogProvider>,
        stream_downloader: Arc<dyn StreamDownloader>,
        muxer: Arc<dyn MuxingTool>,
        sanitizer: Arc<dyn PathSanitizer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.prepare_root()?;

        let cancel = CancellationToken::new();

        let pipeline = JobPipeline::new(
            Arc::clone(&catalog),
            StreamSelector::new(
                config.resolution_cap,
                config.tools.preferred_container.clone(),
            ),
            FetchOrchestrator::new(stream_downloader, Arc::clone(&sanitizer), config.temp_root()),
            Remuxer::new(muxer),
            Arc::clone(&sanitizer),
            config.retry.clone(),
            cancel.clone(),
        );
        let expander = PlaylistExpander::new(
            catalog,
            sanitizer,
            config.root_dir.clone(),
            config.retry.clone(),
            cancel.clone(),
        );

        tracing::debug!(
            root = %config.root_dir.display(),
            resolution_cap = config.resolution_cap,
            mode = ?config.batch_mode(),
            "Downloader ready"
        );

        Ok(Self {
            config,
            expander,
            scheduler: BatchScheduler::new(Arc::new(pipeline)),
            cancel,
        })
    }

    /// Build with yt-dlp and ffmpeg found on this machine
    pub fn from_system(config: DownloaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let manager = ToolManager::new();

        let command = match manager.resolve(ToolType::YtDlp, config.tools.ytdlp_path.as_deref()) {
            Ok(path) => YtDlpCommand::Binary(path),
            Err(e) => {
                let python = which::which("python3")
                    .map_err(|_| tool_missing("tools.ytdlp_path", &e))?;
                tracing::warn!(error = %e, "yt-dlp binary not found, using python3 -m yt_dlp");
                YtDlpCommand::PythonModule(python)
            }
        };
        let ffmpeg = manager
            .resolve(ToolType::Ffmpeg, config.tools.ffmpeg_path.as_deref())
            .map_err(|e| tool_missing("tools.ffmpeg_path", &e))?;

        tracing::info!(ytdlp = ?command, ffmpeg = %ffmpeg.display(), "Using external tools");

        let catalog = Arc::new(YtDlpCatalog::new(command.clone(), config.tools.clone()));
        let stream_downloader: Arc<dyn StreamDownloader> = match config.tools.stream_backend {
            StreamBackend::YtDlp => {
                Arc::new(YtDlpStreamDownloader::new(command, config.tools.clone()))
            }
            StreamBackend::Http => Arc::new(
                HttpStreamDownloader::new(
                    config.tools.proxy.as_deref(),
                    Duration::from_secs(u64::from(config.tools.socket_timeout_secs)),
                )
                .map_err(|e| ConfigError::Invalid {
                    key: "tools.proxy",
                    message: e.to_string(),
                })?,
            ),
        };
        let muxer = Arc::new(FfmpegMuxer::new(ffmpeg, config.tools.command_timeout_secs));

        Self::new(config, catalog, stream_downloader, muxer)
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Token shared by every job; cancelling it fails unfinished jobs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        tracing::info!("Cancelling downloads");
        self.cancel.cancel();
    }

    /// Download one item straight into the output root, without prefix
    pub async fn download_single(&self, url: &str) -> DownloadResult {
        let job = DownloadJob::new(MediaItem::single(url), self.config.root_dir.clone());
        let result = self.scheduler.run_one(job).await;
        self.tidy_temp_root().await;
        result
    }

    /// Download every entry of a playlist into its own folder.
    ///
    /// Only a failure to fetch the playlist metadata is returned as an error.
    pub async fn download_playlist(&self, url: &str) -> Result<Vec<DownloadResult>, JobError> {
        let jobs = self.expander.expand(url).await?;
        let results = self.scheduler.run(jobs, self.config.batch_mode()).await;
        self.tidy_temp_root().await;
        Ok(results)
    }

    /// Process a list of single and playlist URLs as one batch
    pub async fn download_urls(&self, urls: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut jobs = Vec::new();

        for url in urls {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            if !url.starts_with("https://") {
                tracing::warn!(%url, "Skipping input that is not an https:// URL");
                report.rejected.push(url.to_string());
                continue;
            }

            if is_playlist_url(url) {
                match self.expander.expand(url).await {
                    Ok(expanded) => jobs.extend(expanded),
                    Err(e) => {
                        tracing::error!(%url, error = %e, "Failed to expand playlist");
                        report.failed_playlists.push((url.to_string(), e));
                    }
                }
            } else {
                jobs.push(DownloadJob::new(
                    MediaItem::single(url),
                    self.config.root_dir.clone(),
                ));
            }
        }

        report.results = self.scheduler.run(jobs, self.config.batch_mode()).await;
        self.tidy_temp_root().await;
        report
    }

    /// Remove the shared temp folder if no job left anything in it
    async fn tidy_temp_root(&self) {
        let temp_root = self.config.temp_root();
        match tokio::fs::remove_dir(&temp_root).await {
            Ok(()) => tracing::debug!(temp = %temp_root.display(), "Removed temp folder"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::debug!(
                temp = %temp_root.display(),
                error = %e,
                "Temp folder kept"
            ),
        }
    }
}

fn tool_missing(key: &'static str, error: &DownloadError) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: error.to_string(),
    }
}
