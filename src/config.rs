//! Server configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// External media tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// Program name or path of the ffmpeg executable
    pub binary: PathBuf,

    /// Audio encoder passed to `-acodec`
    pub audio_codec: String,

    /// Constant audio bitrate passed to `-b:a`
    pub audio_bitrate: String,

    /// How many trailing characters of stderr to keep on failure
    pub stderr_tail_chars: usize,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            audio_codec: "libmp3lame".to_string(),
            audio_bitrate: "128k".to_string(),
            stderr_tail_chars: 1500,
        }
    }
}

/// Remote input download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,

    /// Largest accepted remote body in bytes
    pub max_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_redirects: 10,
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Multipart upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Request body limit for `/trim_upload`
    pub max_body_bytes: usize,

    /// Input filename used when the client sends none
    pub default_filename: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 512 * 1024 * 1024,
            default_filename: "input.mp3".to_string(),
        }
    }
}

/// Per-request temporary directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent directory for workspaces; the system temp dir when unset
    pub root: Option<PathBuf>,

    /// Directory name prefix
    pub prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: "trim_".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub ffmpeg: FfmpegConfig,
    pub download: DownloadConfig,
    pub upload: UploadConfig,
    pub workspace: WorkspaceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            ffmpeg: FfmpegConfig::default(),
            download: DownloadConfig::default(),
            upload: UploadConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
