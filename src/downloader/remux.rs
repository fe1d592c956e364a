// Remuxer - combine a video-only and an audio-only file without re-encoding

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::{DownloadError, JobError};
use super::traits::MuxingTool;
use super::utils::{run_output_with_timeout, tail_lines};

pub struct Remuxer {
    tool: Arc<dyn MuxingTool>,
}

impl Remuxer {
    pub fn new(tool: Arc<dyn MuxingTool>) -> Self {
        Self { tool }
    }

    /// Mux `video` and `audio` into `dest`, overwriting any previous file.
    /// A failed or empty output never stays behind at `dest`.
    pub async fn remux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<PathBuf, JobError> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            tokio::fs::remove_file(dest).await?;
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!(
            tool = self.tool.name(),
            dest = %dest.display(),
            "Remuxing streams"
        );

        if let Err(e) = self.tool.mux(video, audio, dest).await {
            let _ = tokio::fs::remove_file(dest).await;
            tracing::error!(tool = self.tool.name(), error = %e, "Remux failed");
            return Err(JobError::MuxFailure(e.to_string()));
        }

        match tokio::fs::metadata(dest).await {
            Ok(meta) if meta.len() > 0 => Ok(dest.to_path_buf()),
            Ok(_) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(JobError::MuxFailure(format!(
                    "{} produced an empty file",
                    self.tool.name()
                )))
            }
            Err(_) => Err(JobError::MuxFailure(format!(
                "{} produced no output",
                self.tool.name()
            ))),
        }
    }
}

/// ffmpeg stream copy
pub struct FfmpegMuxer {
    path: PathBuf,
    timeout_secs: u64,
}

impl FfmpegMuxer {
    pub fn new(path: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            path: path.into(),
            timeout_secs,
        }
    }

    fn args(video: &Path, audio: &Path, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(video.as_os_str().to_owned());
        args.push("-i".into());
        args.push(audio.as_os_str().to_owned());
        args.extend(
            ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "copy"]
                .iter()
                .map(OsString::from),
        );
        args.push(dest.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl MuxingTool for FfmpegMuxer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<(), DownloadError> {
        let output =
            run_output_with_timeout(&self.path, Self::args(video, audio, dest), self.timeout_secs)
                .await?;

        if !output.status.success() {
            return Err(DownloadError::ExecutionError(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                tail_lines(&output.stderr, 5)
            )));
        }
        Ok(())
    }
}
