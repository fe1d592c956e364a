pub mod downloader;

pub use downloader::{
    BatchMode, BatchReport, ConfigError, DownloadError, DownloadResult, Downloader,
    DownloaderConfig, JobError,
};
