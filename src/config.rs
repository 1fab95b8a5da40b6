//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Deployment variables (HOST, PORT, WHISPER_API_URL)
//! 2. Environment variables (APP_SERVER__PORT, APP_CACHE__DIR, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::transcription::DEFAULT_TRANSCRIPTION_TIMEOUT;

/// Extraction provider names accepted in `extraction.provider`.
pub const PROVIDER_API: &str = "api";
pub const PROVIDER_YTDLP: &str = "yt-dlp";

/// Main application configuration that contains all settings.
///
/// ## Sections:
/// - **server**: where the HTTP surface listens
/// - **transcription**: the speech-to-text worker and its hard timeout
/// - **extraction**: which metadata provider to use and how to reach it
/// - **download**: media CDN fetch settings
/// - **cache**: where downloaded media bytes are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transcription: TranscriptionConfig,
    pub extraction: ExtractionConfig,
    pub download: DownloadConfig,
    pub cache: CacheConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (containers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Transcription worker settings.
///
/// ## Fields:
/// - `worker_url`: base URL of the worker; requests go to `{worker_url}/transcribe`
/// - `timeout_secs`: hard upper bound on one transcription call (default 120)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub worker_url: String,
    pub timeout_secs: u64,
}

/// Metadata extraction provider settings.
///
/// ## Providers:
/// - `"api"`: call the tikwm HTTP API at `api_url`
/// - `"yt-dlp"`: spawn the executable at `ytdlp_path`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub provider: String,
    pub api_url: String,
    pub ytdlp_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Media cache settings. The directory is created on first write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            transcription: TranscriptionConfig {
                worker_url: "http://localhost:8000".to_string(),
                timeout_secs: DEFAULT_TRANSCRIPTION_TIMEOUT.as_secs(),
            },
            extraction: ExtractionConfig {
                provider: PROVIDER_API.to_string(),
                api_url: "https://www.tikwm.com/api/".to_string(),
                ytdlp_path: "yt-dlp".to_string(),
                timeout_secs: 30,
            },
            download: DownloadConfig {
                timeout_secs: 30,
                user_agent: "Mozilla/5.0 (compatible; video-caption-backend/0.1)".to_string(),
            },
            cache: CacheConfig {
                dir: "cache".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_ (sections split by `__`,
    ///    since field names such as `timeout_secs` contain single underscores)
    /// 4. Apply the deployment variables HOST, PORT and WHISPER_API_URL
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_EXTRACTION__PROVIDER=yt-dlp`: Switch metadata provider
    /// - `WHISPER_API_URL=http://whisper:8000`: Point at the transcription worker
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(Self::environment());

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(worker_url) = env::var("WHISPER_API_URL") {
            settings = settings.set_override("transcription.worker_url", worker_url)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// `APP_` prefix, `__` between section and field.
    fn environment() -> config::Environment {
        config::Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Every timeout is greater than 0 (a zero bound would fail every call)
    /// - Worker URL and cache directory are not empty
    /// - The extraction provider is one we know how to build
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.transcription.worker_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Transcription worker URL cannot be empty"));
        }

        if self.transcription.timeout_secs == 0
            || self.extraction.timeout_secs == 0
            || self.download.timeout_secs == 0
        {
            return Err(anyhow::anyhow!("Timeouts must be greater than 0"));
        }

        if self.cache.dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Cache directory cannot be empty"));
        }

        match self.extraction.provider.as_str() {
            PROVIDER_API | PROVIDER_YTDLP => Ok(()),
            other => Err(anyhow::anyhow!(
                "Unknown extraction provider '{}' (expected '{}' or '{}')",
                other,
                PROVIDER_API,
                PROVIDER_YTDLP
            )),
        }
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription.timeout_secs)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download.timeout_secs)
    }
}
