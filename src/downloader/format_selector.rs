// StreamSelector - picks the streams to download
//
// Video: best resolution among preferred-container video streams under the cap.
// Audio: highest bitrate, only needed when the chosen video is not progressive.

use super::errors::JobError;
use super::models::{AudioStream, StreamDescriptor, StreamKind, VideoStream};

/// Streams chosen for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub video: VideoStream,
    /// `None` exactly when `video` is progressive
    pub audio: Option<AudioStream>,
}

impl Selection {
    pub fn needs_remux(&self) -> bool {
        self.audio.is_some()
    }
}

/// Selection rules for one configuration
#[derive(Debug, Clone)]
pub struct StreamSelector {
    resolution_cap: u32,
    container: String,
}

impl StreamSelector {
    pub fn new(resolution_cap: u32, container: impl Into<String>) -> Self {
        Self {
            resolution_cap,
            container: container.into(),
        }
    }

    /// Pick the video stream, then audio if the video lacks it
    pub fn select(&self, streams: &[StreamDescriptor]) -> Result<Selection, JobError> {
        let video = Self::select_video(streams, self.resolution_cap, &self.container)?;

        // Progressive streams already carry audio
        let audio = if video.progressive {
            None
        } else {
            Some(Self::select_audio(streams)?.clone())
        };

        Ok(Selection {
            video: video.clone(),
            audio,
        })
    }

    /// Highest-resolution `container` video stream not above `cap`
    pub fn select_video<'a>(
        streams: &'a [StreamDescriptor],
        cap: u32,
        container: &str,
    ) -> Result<&'a VideoStream, JobError> {
        streams
            .iter()
            .filter_map(StreamDescriptor::as_video)
            .filter(|v| v.container.eq_ignore_ascii_case(container))
            .filter(|v| v.effective_resolution() <= cap)
            .max_by_key(|v| v.effective_resolution())
            .ok_or(JobError::NoSuitableStream {
                kind: StreamKind::Video,
            })
    }

    /// Highest-bitrate audio stream; unparsable bitrates rank as 0
    pub fn select_audio(streams: &[StreamDescriptor]) -> Result<&AudioStream, JobError> {
        streams
            .iter()
            .filter_map(StreamDescriptor::as_audio)
            .max_by_key(|a| a.bitrate())
            .ok_or(JobError::NoSuitableStream {
                kind: StreamKind::Audio,
            })
    }
}
