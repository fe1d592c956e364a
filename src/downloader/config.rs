// Downloader configuration
//
// Every setting has a default, so an empty JSON object is a valid config file.
// The values are injected into the Downloader at construction;
// nothing in the pipeline reads global state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::scheduler::BatchMode;

/// How a batch is executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One job at a time, in order (useful when diagnosing provider blocks)
    #[default]
    Sequential,
    /// Bounded worker pool of `max_threads`
    Parallel,
}

/// Retry policy for transient provider blocks while listing streams
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockRetryConfig {
    /// Total listing attempts before giving up with `ProviderBlocked` (default: 10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts (default: 60 seconds)
    #[serde(default = "default_backoff", with = "duration_serde")]
    pub backoff: Duration,
}

impl Default for BlockRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
        }
    }
}

/// Which collaborator fetches the selected streams
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamBackend {
    /// `yt-dlp -f <format id>`
    #[default]
    YtDlp,
    /// Plain HTTP GET of the direct URL resolved by the catalog
    Http,
}

/// External tool settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Explicit yt-dlp binary; discovered when unset
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Explicit ffmpeg binary; discovered when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy: Option<String>,

    /// Path to a cookies.txt file
    #[serde(default)]
    pub cookies_path: Option<PathBuf>,

    /// yt-dlp socket timeout in seconds (default: 30)
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_secs: u32,

    /// Upper bound for a single external command (default: 1 hour)
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Container accepted for video selection (default: "mp4")
    #[serde(default = "default_container")]
    pub preferred_container: String,

    #[serde(default)]
    pub stream_backend: StreamBackend,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            proxy: None,
            cookies_path: None,
            socket_timeout_secs: default_socket_timeout(),
            command_timeout_secs: default_command_timeout(),
            preferred_container: default_container(),
            stream_backend: StreamBackend::default(),
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Where finished files (and playlist folders) go
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Maximum accepted vertical resolution (default: 1080)
    #[serde(default = "default_resolution_cap")]
    pub resolution_cap: u32,

    /// Worker pool size in parallel mode (default: 10)
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    #[serde(default)]
    pub mode: ExecutionMode,

    /// Staging folder name under `root_dir` (default: "temp")
    #[serde(default = "default_temp_folder_name")]
    pub temp_folder_name: String,

    #[serde(default)]
    pub retry: BlockRetryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            resolution_cap: default_resolution_cap(),
            max_threads: default_max_threads(),
            mode: ExecutionMode::default(),
            temp_folder_name: default_temp_folder_name(),
            retry: BlockRetryConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl DownloaderConfig {
    /// Config rooted at `root_dir`, everything else default
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges. Does not touch the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution_cap == 0 {
            return Err(ConfigError::Invalid {
                key: "resolution_cap",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.max_threads == 0 {
            return Err(ConfigError::Invalid {
                key: "max_threads",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.max_attempts",
                message: "must be greater than 0".to_string(),
            });
        }
        let temp = self.temp_folder_name.trim();
        if temp.is_empty() || temp == "." || temp == ".." || temp.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                key: "temp_folder_name",
                message: format!("`{}` is not a plain folder name", self.temp_folder_name),
            });
        }
        if self.tools.preferred_container.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "tools.preferred_container",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Create the output root. Failure here is fatal for the whole run.
    pub fn prepare_root(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.root_dir).map_err(|source| ConfigError::UnreachableRoot {
            path: self.root_dir.clone(),
            source,
        })
    }

    /// Shared staging root for pre-remux files
    pub fn temp_root(&self) -> PathBuf {
        self.root_dir.join(&self.temp_folder_name)
    }

    pub fn batch_mode(&self) -> BatchMode {
        match self.mode {
            ExecutionMode::Sequential => BatchMode::Sequential,
            ExecutionMode::Parallel => BatchMode::Parallel {
                pool_size: self.max_threads,
            },
        }
    }
}

fn default_root_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Youtube")
}

fn default_resolution_cap() -> u32 {
    1080
}

fn default_max_threads() -> usize {
    10
}

fn default_temp_folder_name() -> String {
    "temp".to_string()
}

fn default_max_attempts() -> u32 {
    10
}

fn default_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_socket_timeout() -> u32 {
    30
}

fn default_command_timeout() -> u64 {
    3600
}

fn default_container() -> String {
    "mp4".to_string()
}

/// Durations are stored as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: DownloaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.resolution_cap, 1080);
        assert_eq!(config.max_threads, 10);
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.temp_folder_name, "temp");
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.backoff, Duration::from_secs(60));
        assert_eq!(config.tools.preferred_container, "mp4");
        assert_eq!(config.tools.stream_backend, StreamBackend::YtDlp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "root_dir": "/srv/media",
            "resolution_cap": 720,
            "max_threads": 4,
            "mode": "parallel",
            "temp_folder_name": "staging",
            "retry": { "max_attempts": 3, "backoff": 5 },
            "tools": { "proxy": "socks5://127.0.0.1:1080", "stream_backend": "http" }
        }"#;
        let config: DownloaderConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.root_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.temp_root(), PathBuf::from("/srv/media/staging"));
        assert_eq!(config.batch_mode(), BatchMode::Parallel { pool_size: 4 });
        assert_eq!(config.retry.backoff, Duration::from_secs(5));
        assert_eq!(config.tools.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.tools.stream_backend, StreamBackend::Http);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = DownloaderConfig::with_root("/tmp/x");
        config.max_threads = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "max_threads", .. })
        ));

        let mut config = DownloaderConfig::with_root("/tmp/x");
        config.temp_folder_name = "../escape".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "temp_folder_name", .. })
        ));

        let mut config = DownloaderConfig::with_root("/tmp/x");
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_and_prepare_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("media");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            format!(r#"{{ "root_dir": {:?} }}"#, root.display().to_string()),
        )
        .unwrap();

        let config = DownloaderConfig::from_file(&path).unwrap();
        config.prepare_root().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_unreachable_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let config = DownloaderConfig::with_root(blocker.join("below"));
        assert!(matches!(
            config.prepare_root(),
            Err(ConfigError::UnreachableRoot { .. })
        ));
    }
}
