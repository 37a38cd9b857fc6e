//! # Configuration Management
//!
//! Loads and manages application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! Feature-extraction parameters (MFCC coefficient count, frame count, FFT
//! size) are deliberately NOT configurable here: the classifier artifacts
//! are trained against a fixed 384-element vector, so those constants live
//! next to the extractor in `features.rs`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, models, audio,
/// limits) keeps the TOML file and the environment variable namespace
/// readable as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub audio: AudioConfig,
    pub limits: LimitsConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Classifier artifact configuration.
///
/// ## Fields:
/// - `voice_model_path`: safetensors file for the human-vs-AI classifier
/// - `language_model_path`: safetensors file for the language classifier
/// - `device`: inference device preference ("auto", "cpu", "cuda", "metal")
///
/// Both artifacts are loaded once at process start and are read-only
/// afterwards. A missing or malformed artifact is a startup failure, not a
/// per-request error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub voice_model_path: String,
    pub language_model_path: String,
    pub device: String,
}

/// Audio intake configuration.
///
/// ## Fields:
/// - `sample_rate`: target rate every clip is resampled to (16 kHz, what
///   the classifiers were trained on)
/// - `min_duration_secs` / `max_duration_secs`: accepted clip length after
///   decoding; out-of-range clips are rejected with 400
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
}

/// Request intake limits.
///
/// ## Fields:
/// - `max_upload_bytes`: size cap applied to every variant (multipart body,
///   decoded base64 payload, fetched URL body)
/// - `fetch_timeout_secs`: total timeout for the URL-fetch variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            models: ModelsConfig {
                voice_model_path: "model/voiceguard.safetensors".to_string(),
                language_model_path: "model/language.safetensors".to_string(),
                device: "auto".to_string(),
            },
            audio: AudioConfig {
                sample_rate: 16_000,
                min_duration_secs: 0.1,
                max_duration_secs: 120.0,
            },
            limits: LimitsConfig {
                max_upload_bytes: 50 * 1024 * 1024, // 50 MiB, matches the original service
                fetch_timeout_secs: 20,
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
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///    (used by deployment platforms that don't follow the APP_ prefix)
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (reserved, cannot be bound)
    /// - Sample rate is non-zero
    /// - Duration bounds are positive and ordered
    /// - Upload size cap and fetch timeout are non-zero
    ///
    /// Catching these early gives a clear startup error instead of a
    /// confusing per-request failure.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate cannot be 0"));
        }

        if self.audio.min_duration_secs <= 0.0 {
            return Err(anyhow::anyhow!("Minimum clip duration must be positive"));
        }

        if self.audio.max_duration_secs <= self.audio.min_duration_secs {
            return Err(anyhow::anyhow!(
                "Maximum clip duration ({}s) must exceed the minimum ({}s)",
                self.audio.max_duration_secs,
                self.audio.min_duration_secs
            ));
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limit must be greater than 0"));
        }

        if self.limits.fetch_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Fetch timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// Only the fields present in the JSON are changed. For example,
    /// `{"limits": {"max_upload_bytes": 10485760}}` tightens the upload cap
    /// without touching anything else. Model paths and the device preference
    /// are intentionally excluded: the classifiers are loaded once at
    /// startup, so changing those fields at runtime would desynchronize the
    /// reported config from the loaded artifacts.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(audio) = partial_config.get("audio") {
            if let Some(rate) = audio.get("sample_rate").and_then(|v| v.as_u64()) {
                self.audio.sample_rate = rate as u32;
            }
            if let Some(min) = audio.get("min_duration_secs").and_then(|v| v.as_f64()) {
                self.audio.min_duration_secs = min;
            }
            if let Some(max) = audio.get("max_duration_secs").and_then(|v| v.as_f64()) {
                self.audio.max_duration_secs = max;
            }
        }

        if let Some(limits) = partial_config.get("limits") {
            if let Some(bytes) = limits.get("max_upload_bytes").and_then(|v| v.as_u64()) {
                self.limits.max_upload_bytes = bytes as usize;
            }
            if let Some(timeout) = limits.get("fetch_timeout_secs").and_then(|v| v.as_u64()) {
                self.limits.fetch_timeout_secs = timeout;
            }
        }

        self.validate()?;
        Ok(())
    }
}
