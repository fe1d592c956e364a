// Collaborator traits the pipeline is built on

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{MediaItem, Playlist, StreamDescriptor, StreamListing};

/// Source of stream listings and playlist metadata
#[async_trait]
pub trait RemoteCatalogProvider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    /// List available streams for one item.
    ///
    /// A temporary refusal is reported as an error whose
    /// [`is_transient_block`](DownloadError::is_transient_block) is true.
    async fn list_streams(&self, item: &MediaItem) -> Result<StreamListing, DownloadError>;

    /// Resolve playlist title and ordered entries
    async fn fetch_playlist_meta(&self, playlist_url: &str) -> Result<Playlist, DownloadError>;
}

/// Fetches one selected stream to disk
#[async_trait]
pub trait StreamDownloader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Download `stream` to `dest_dir/file_name`.
    ///
    /// `Ok(None)` means the download finished without leaving an artifact.
    async fn download(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<Option<PathBuf>, DownloadError>;
}

/// Stream-copy muxer (no re-encoding)
#[async_trait]
pub trait MuxingTool: Send + Sync {
    fn name(&self) -> &'static str;

    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<(), DownloadError>;
}

/// Turns arbitrary titles into safe path components
pub trait PathSanitizer: Send + Sync {
    fn to_file_name(&self, value: &str) -> String;

    fn to_folder_name(&self, value: &str) -> String;
}
