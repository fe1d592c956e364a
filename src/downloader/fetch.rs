// FetchOrchestrator - downloads the selected streams of one job
//
// Progressive selections are written straight into the job's output
// directory under their final name. Adaptive selections stage video and
// audio side by side in the job's own staging directory, ready for remux.
// The two downloads run as separate tasks; the first failure aborts the
// other one.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;

use super::errors::JobError;
use super::format_selector::Selection;
use super::models::{DownloadJob, StreamDescriptor, StreamKind};
use super::traits::{PathSanitizer, StreamDownloader};

/// Files produced by a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifacts {
    pub video: PathBuf,
    /// Set only for adaptive (non-progressive) selections
    pub audio: Option<PathBuf>,
}

pub struct FetchOrchestrator {
    downloader: Arc<dyn StreamDownloader>,
    sanitizer: Arc<dyn PathSanitizer>,
    temp_root: PathBuf,
}

impl FetchOrchestrator {
    pub fn new(
        downloader: Arc<dyn StreamDownloader>,
        sanitizer: Arc<dyn PathSanitizer>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            sanitizer,
            temp_root: temp_root.into(),
        }
    }

    /// Where an adaptive job stages its streams
    pub fn staging_dir(&self, job: &DownloadJob) -> PathBuf {
        job.staging_dir(&self.temp_root)
    }

    pub async fn fetch(
        &self,
        job: &DownloadJob,
        title: &str,
        selection: &Selection,
    ) -> Result<FetchedArtifacts, JobError> {
        let mut tasks = JoinSet::new();
        let video = StreamDescriptor::Video(selection.video.clone());

        match &selection.audio {
            None => {
                tokio::fs::create_dir_all(&job.output_dir).await?;
                let name = self
                    .sanitizer
                    .to_file_name(&job.output_name(title, &selection.video.container));
                self.spawn_download(&mut tasks, video, job.output_dir.clone(), name);
            }
            Some(audio) => {
                let staging = self.staging_dir(job);
                tokio::fs::create_dir_all(&staging).await?;

                let video_name = self.sanitizer.to_file_name(&job.staging_name(
                    title,
                    StreamKind::Video,
                    &selection.video.container,
                ));
                let audio_name = self.sanitizer.to_file_name(&job.staging_name(
                    title,
                    StreamKind::Audio,
                    &audio.container,
                ));
                self.spawn_download(&mut tasks, video, staging.clone(), video_name);
                self.spawn_download(
                    &mut tasks,
                    StreamDescriptor::Audio(audio.clone()),
                    staging,
                    audio_name,
                );
            }
        }

        tracing::info!(
            url = %job.item.url,
            title,
            resolution = ?selection.video.resolution,
            remux = selection.needs_remux(),
            "Downloading streams"
        );

        let mut video_path = None;
        let mut audio_path = None;

        // Dropping `tasks` on the error path aborts the sibling download
        while let Some(joined) = tasks.join_next().await {
            let (kind, path) = joined.map_err(|_| JobError::Cancelled)?;
            match kind {
                StreamKind::Video => video_path = Some(path?),
                StreamKind::Audio => audio_path = Some(path?),
            }
        }

        let video = video_path.ok_or(JobError::FetchFailure {
            kind: StreamKind::Video,
            reason: "download task did not report".to_string(),
        })?;
        if selection.audio.is_some() && audio_path.is_none() {
            return Err(JobError::FetchFailure {
                kind: StreamKind::Audio,
                reason: "download task did not report".to_string(),
            });
        }

        tracing::info!(url = %job.item.url, title, "Finished downloading streams");
        Ok(FetchedArtifacts {
            video,
            audio: audio_path,
        })
    }

    fn spawn_download(
        &self,
        tasks: &mut JoinSet<(StreamKind, Result<PathBuf, JobError>)>,
        stream: StreamDescriptor,
        dest_dir: PathBuf,
        file_name: String,
    ) {
        let downloader = Arc::clone(&self.downloader);
        let kind = stream.kind();

        tasks.spawn(async move {
            let result = AssertUnwindSafe(Self::download_one(downloader, stream, dest_dir, file_name))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(JobError::FetchFailure {
                        kind,
                        reason: "download task panicked".to_string(),
                    })
                });
            (kind, result)
        });
    }

    async fn download_one(
        downloader: Arc<dyn StreamDownloader>,
        stream: StreamDescriptor,
        dest_dir: PathBuf,
        file_name: String,
    ) -> Result<PathBuf, JobError> {
        let kind = stream.kind();

        let reason = match downloader.download(&stream, &dest_dir, &file_name).await {
            Ok(Some(path)) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                return Ok(path)
            }
            Ok(Some(path)) => format!("reported artifact {} does not exist", path.display()),
            Ok(None) => "download produced no artifact".to_string(),
            Err(e) => {
                tracing::warn!(
                    downloader = downloader.name(),
                    %kind,
                    error = %e,
                    "Stream download failed"
                );
                e.to_string()
            }
        };

        // No truncated file may remain under its final name
        let target = dest_dir.join(&file_name);
        if let Err(e) = tokio::fs::remove_file(&target).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %target.display(), error = %e, "Failed to remove partial download");
            }
        }

        Err(JobError::FetchFailure { kind, reason })
    }
}
