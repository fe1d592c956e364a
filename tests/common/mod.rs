// Fake collaborators for facade tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use playlist_downloader_lib::downloader::extractors::BlockingReason;
use playlist_downloader_lib::downloader::{
    AudioStream, DownloadError, MediaItem, MuxingTool, Playlist, PlaylistEntry,
    RemoteCatalogProvider, StreamDescriptor, StreamDownloader, StreamHandle, StreamListing,
    VideoStream,
};

fn handle(format_id: &str) -> StreamHandle {
    StreamHandle {
        format_id: format_id.to_string(),
        page_url: String::new(),
        direct_url: None,
        http_headers: Default::default(),
    }
}

/// Adaptive 1080p/720p mp4 pair plus two audio tracks, or one progressive 720p mp4
pub fn listing(title: &str, progressive: bool) -> StreamListing {
    let mut streams = vec![StreamDescriptor::Video(VideoStream {
        handle: handle("720"),
        container: "mp4".to_string(),
        resolution: Some(720),
        fps: Some(30),
        progressive,
    })];
    if !progressive {
        streams.push(StreamDescriptor::Video(VideoStream {
            handle: handle("1080"),
            container: "mp4".to_string(),
            resolution: Some(1080),
            fps: Some(60),
            progressive: false,
        }));
        streams.push(StreamDescriptor::Audio(AudioStream {
            handle: handle("a-low"),
            container: "m4a".to_string(),
            abr: "48kbps".to_string(),
        }));
        streams.push(StreamDescriptor::Audio(AudioStream {
            handle: handle("a-high"),
            container: "m4a".to_string(),
            abr: "128kbps".to_string(),
        }));
    }
    StreamListing {
        id: title.to_lowercase(),
        title: title.to_string(),
        streams,
    }
}

#[derive(Default)]
pub struct StaticCatalog {
    pub listings: HashMap<String, StreamListing>,
    pub playlists: HashMap<String, Playlist>,
}

impl StaticCatalog {
    pub fn with_item(mut self, url: &str, title: &str, progressive: bool) -> Self {
        self.listings
            .insert(url.to_string(), listing(title, progressive));
        self
    }

    /// Playlist whose entries are `<url>/<n>`; each entry gets a listing
    pub fn with_playlist(mut self, url: &str, title: &str, items: &[(&str, bool)]) -> Self {
        let mut entries = Vec::new();
        for (i, (item_title, progressive)) in items.iter().enumerate() {
            let entry_url = format!("https://media.test/{}/{}", title.to_lowercase(), i);
            self.listings
                .insert(entry_url.clone(), listing(item_title, *progressive));
            entries.push(PlaylistEntry {
                url: entry_url,
                title: Some(item_title.to_string()),
            });
        }
        self.playlists.insert(
            url.to_string(),
            Playlist {
                title: title.to_string(),
                entries,
            },
        );
        self
    }
}

#[async_trait]
impl RemoteCatalogProvider for StaticCatalog {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn list_streams(&self, item: &MediaItem) -> Result<StreamListing, DownloadError> {
        self.listings
            .get(&item.url)
            .cloned()
            .ok_or(DownloadError::Blocked(BlockingReason::VideoUnavailable))
    }

    async fn fetch_playlist_meta(&self, playlist_url: &str) -> Result<Playlist, DownloadError> {
        self.playlists
            .get(playlist_url)
            .cloned()
            .ok_or(DownloadError::Blocked(BlockingReason::PrivateVideo))
    }
}

/// Writes the stream kind as file content, after an optional delay
#[derive(Default)]
pub struct FileDownloader {
    pub delay: Option<Duration>,
    pub started: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl StreamDownloader for FileDownloader {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn download(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let path = dest_dir.join(file_name);
        self.started.lock().unwrap().push(path.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        tokio::fs::write(&path, stream.kind().to_string()).await?;
        Ok(Some(path))
    }
}

pub struct ConcatMuxer;

#[async_trait]
impl MuxingTool for ConcatMuxer {
    fn name(&self) -> &'static str {
        "concat"
    }

    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<(), DownloadError> {
        let mut out = tokio::fs::read(video).await?;
        out.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(dest, out).await?;
        Ok(())
    }
}
