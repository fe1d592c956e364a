// Downloader module - playlist-aware selection, fetch and remux pipeline

pub mod config;
pub mod errors;
pub mod extractors;
pub mod fetch;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod playlist;
pub mod remux;
pub mod retry;
pub mod sanitize;
pub mod scheduler;
pub mod tools;
pub mod traits;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{BlockRetryConfig, DownloaderConfig, ExecutionMode, StreamBackend, ToolsConfig};
pub use errors::{ConfigError, DownloadError, JobError};
pub use fetch::{FetchOrchestrator, FetchedArtifacts};
pub use format_selector::{Selection, StreamSelector};
pub use models::{
    AudioStream, CompletedDownload, DownloadJob, DownloadResult, MediaItem, Playlist,
    PlaylistEntry, StreamDescriptor, StreamHandle, StreamKind, StreamListing, VideoStream,
};
pub use orchestrator::{is_playlist_url, BatchReport, Downloader};
pub use playlist::PlaylistExpander;
pub use remux::{FfmpegMuxer, Remuxer};
pub use sanitize::DefaultSanitizer;
pub use scheduler::{BatchMode, BatchScheduler, JobPipeline};
pub use traits::{MuxingTool, PathSanitizer, RemoteCatalogProvider, StreamDownloader};
