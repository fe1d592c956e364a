// In-memory collaborators for pipeline tests

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::DownloadError;
use super::extractors::BlockingReason;
use super::models::{
    AudioStream, MediaItem, Playlist, StreamDescriptor, StreamHandle, StreamListing, VideoStream,
};
use super::traits::{MuxingTool, RemoteCatalogProvider, StreamDownloader};

pub fn video(format_id: &str, resolution: u32, container: &str, progressive: bool) -> StreamDescriptor {
    StreamDescriptor::Video(VideoStream {
        handle: StreamHandle {
            format_id: format_id.to_string(),
            ..StreamHandle::default()
        },
        container: container.to_string(),
        resolution: Some(resolution),
        fps: Some(30),
        progressive,
    })
}

pub fn audio(format_id: &str, abr: &str) -> StreamDescriptor {
    StreamDescriptor::Audio(AudioStream {
        handle: StreamHandle {
            format_id: format_id.to_string(),
            ..StreamHandle::default()
        },
        container: "m4a".to_string(),
        abr: abr.to_string(),
    })
}

/// One progressive mp4 at `resolution`
pub fn progressive_listing(title: &str, resolution: u32) -> StreamListing {
    StreamListing {
        id: title.to_lowercase(),
        title: title.to_string(),
        streams: vec![video("22", resolution, "mp4", true)],
    }
}

/// One adaptive mp4 at `resolution` plus audio streams `audio-0`, `audio-1`, ...
pub fn adaptive_listing(title: &str, resolution: u32, abrs: &[&str]) -> StreamListing {
    let mut streams = vec![video(&format!("video-{}", resolution), resolution, "mp4", false)];
    streams.extend(
        abrs.iter()
            .enumerate()
            .map(|(i, abr)| audio(&format!("audio-{}", i), abr)),
    );
    StreamListing {
        id: title.to_lowercase(),
        title: title.to_string(),
        streams,
    }
}

/// Replays queued responses per URL; the last one repeats
#[derive(Default)]
pub struct FakeCatalog {
    listings: Mutex<HashMap<String, VecDeque<Result<StreamListing, DownloadError>>>>,
    playlists: Mutex<HashMap<String, VecDeque<Result<Playlist, DownloadError>>>>,
    list_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, url: &str, response: Result<StreamListing, DownloadError>) -> Self {
        self.listings
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_playlist(self, url: &str, response: Result<Playlist, DownloadError>) -> Self {
        self.playlists
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn next<T: Clone>(
        queues: &Mutex<HashMap<String, VecDeque<Result<T, DownloadError>>>>,
        url: &str,
    ) -> Result<T, DownloadError> {
        let mut queues = queues.lock().unwrap();
        match queues.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Err(DownloadError::Blocked(BlockingReason::VideoUnavailable)),
        }
    }
}

#[async_trait]
impl RemoteCatalogProvider for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_streams(&self, item: &MediaItem) -> Result<StreamListing, DownloadError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.listings, &item.url)
    }

    async fn fetch_playlist_meta(&self, playlist_url: &str) -> Result<Playlist, DownloadError> {
        Self::next(&self.playlists, playlist_url)
    }
}

/// Writes "video"/"audio" bytes for each stream. Rules match a format id
/// exactly or any fragment of the target file name.
#[derive(Default)]
pub struct FakeDownloader {
    failing: Vec<String>,
    truncated: Vec<String>,
    no_artifact: Vec<String>,
    delays: Vec<(String, Duration)>,
    calls: Mutex<Vec<(String, String)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    /// Writes part of the file, then fails
    pub fn truncated_for(mut self, key: &str) -> Self {
        self.truncated.push(key.to_string());
        self
    }

    pub fn without_artifact_for(mut self, key: &str) -> Self {
        self.no_artifact.push(key.to_string());
        self
    }

    pub fn with_delay_for(mut self, key: &str, delay: Duration) -> Self {
        self.delays.push((key.to_string(), delay));
        self
    }

    /// (format id, file name) of every download started
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of downloads seen in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn matches(key: &str, stream: &StreamDescriptor, file_name: &str) -> bool {
        stream.handle().format_id == key || file_name.contains(key)
    }
}

#[async_trait]
impl StreamDownloader for FakeDownloader {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn download(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<Option<PathBuf>, DownloadError> {
        self.calls
            .lock()
            .unwrap()
            .push((stream.handle().format_id.clone(), file_name.to_string()));

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .iter()
            .find(|(key, _)| Self::matches(key, stream, file_name))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.iter().any(|k| Self::matches(k, stream, file_name)) {
            Err(DownloadError::ExecutionError("HTTP Error 500".to_string()))
        } else if self.truncated.iter().any(|k| Self::matches(k, stream, file_name)) {
            tokio::fs::write(dest_dir.join(file_name), b"trunc").await?;
            Err(DownloadError::ExecutionError("connection reset".to_string()))
        } else if self.no_artifact.iter().any(|k| Self::matches(k, stream, file_name)) {
            Ok(None)
        } else {
            let path = dest_dir.join(file_name);
            tokio::fs::write(&path, stream.kind().to_string()).await?;
            Ok(Some(path))
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Concatenates its inputs, or fails after leaving a partial file
pub struct FakeMuxer {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeMuxer {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MuxingTool for FakeMuxer {
    fn name(&self) -> &'static str {
        "fake-mux"
    }

    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<(), DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            tokio::fs::write(dest, b"partial").await?;
            return Err(DownloadError::ExecutionError("Invalid data found".to_string()));
        }
        let mut merged = tokio::fs::read(video).await?;
        merged.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(dest, merged).await?;
        Ok(())
    }
}
