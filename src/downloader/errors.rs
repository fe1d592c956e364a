// Error types for the download pipeline

use std::path::PathBuf;

use thiserror::Error;

use super::extractors::diagnostics::{diagnose_error, BlockingReason};
use super::models::StreamKind;

/// Failure reported by an external collaborator (catalog, downloader, muxer)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// Network timeout while talking to the provider
    #[error("network timeout: provider is not responding")]
    NetworkTimeout,

    /// Provider refused the request (429, bot check, 403, ...)
    #[error("blocked by provider: {}", .0.description())]
    Blocked(BlockingReason),

    /// yt-dlp, ffmpeg or python not found in system
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid or unsupported URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse tool JSON output
    #[error("parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// Unknown error with details
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl DownloadError {
    /// True when the provider signalled a temporary block rather than a normal error
    pub fn is_transient_block(&self) -> bool {
        match self {
            Self::Blocked(reason) => reason.is_transient(),
            Self::NetworkTimeout => true,
            _ => false,
        }
    }
}

// Classify raw tool stderr
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        if s.contains("command not found") || s.contains("No such file or directory") {
            return Self::ToolNotFound(s);
        }

        if s.contains("Unsupported URL") || s.contains("is not a valid URL") {
            return Self::InvalidUrl(s);
        }

        match diagnose_error(&s) {
            Some(BlockingReason::NetworkTimeout) => Self::NetworkTimeout,
            Some(BlockingReason::Unknown) | None => Self::Unknown(s),
            Some(reason) => Self::Blocked(reason),
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::ToolNotFound(e.to_string())
        } else {
            Self::ExecutionError(e.to_string())
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::NetworkTimeout;
        }
        match e.status().map(|s| s.as_u16()) {
            Some(403) => Self::Blocked(BlockingReason::Http403Forbidden),
            Some(429) => Self::Blocked(BlockingReason::RateLimited),
            _ => Self::ExecutionError(e.to_string()),
        }
    }
}

/// Why a single job produced no result.
///
/// Jobs never propagate these past the batch boundary; they are stored in the
/// job's [`DownloadResult`](super::models::DownloadResult) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// No candidate survived filtering (resolution cap, container or empty audio set)
    #[error("no suitable {kind} stream")]
    NoSuitableStream { kind: StreamKind },

    /// The provider kept blocking the stream listing until the retry budget ran out
    #[error("provider still blocking after {attempts} attempts")]
    ProviderBlocked { attempts: u32 },

    /// Listing failed with a permanent error
    #[error("catalog error: {0}")]
    Catalog(DownloadError),

    /// A required download produced no artifact
    #[error("{kind} download failed: {reason}")]
    FetchFailure { kind: StreamKind, reason: String },

    /// The stream-copy mux failed or produced no usable output
    #[error("mux failed: {0}")]
    MuxFailure(String),

    /// Filesystem error outside the fetch/mux steps
    #[error("I/O error: {0}")]
    Io(String),

    /// The batch was cancelled before this job finished
    #[error("cancelled")]
    Cancelled,

    /// The job's worker task panicked
    #[error("job task failed: {0}")]
    TaskFailed(String),
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Configuration problems. These are the only errors fatal to a whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("output root {path} is unreachable: {source}")]
    UnreachableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
