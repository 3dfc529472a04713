//! Configuration types.
//!
//! [`PipelineConfig`] holds every knob of the extract → generate → build
//! chain and is built via [`PipelineConfigBuilder`]. [`ServerConfig`] holds
//! the web-facing settings. Both are loaded once at startup and shared
//! read-only behind an `Arc`.

use crate::backend::ModelBackend;
use crate::error::StudyDeckError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Default provider name understood by `edgequake_llm::ProviderFactory`.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default model id.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration for one extract → generate → build run.
///
/// # Example
/// ```rust
/// use studydeck::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("gemini-2.0-flash")
///     .temperature(0.4)
///     .num_cards(15)
///     .build()
///     .unwrap();
/// assert_eq!(config.num_cards, 15);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// LLM provider name (e.g. "gemini", "openai"). Default: "gemini".
    pub provider_name: String,

    /// Model identifier passed through to the provider unchanged.
    pub model: String,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn ModelBackend>>,

    /// Sampling temperature for card generation. Default: 0.7.
    pub temperature: f32,

    /// Sampling temperature for text extraction. Default: 0.1.
    ///
    /// Transcription should be faithful to the page, not creative.
    pub extraction_temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 8192.
    pub max_tokens: usize,

    /// Number of cards requested per generation. Default: 10. Range: 1–50.
    pub num_cards: usize,

    /// Longest edge (px) of an image sent for extraction. Default: 2000.
    pub max_image_pixels: u32,

    /// Retries per upstream call after the first attempt. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            backend: None,
            temperature: 0.7,
            extraction_temperature: 0.1,
            max_tokens: 8192,
            num_cards: 10,
            max_image_pixels: 2000,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ModelBackend>"))
            .field("temperature", &self.temperature)
            .field("extraction_temperature", &self.extraction_temperature)
            .field("max_tokens", &self.max_tokens)
            .field("num_cards", &self.num_cards)
            .field("max_image_pixels", &self.max_image_pixels)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn extraction_temperature(mut self, t: f32) -> Self {
        self.config.extraction_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn num_cards(mut self, n: usize) -> Self {
        self.config.num_cards = clamp_num_cards(n);
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(100);
        self
    }

    /// Clamped to [`MAX_RETRIES_LIMIT`].
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, StudyDeckError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(StudyDeckError::InvalidConfig("model name must not be empty".into()));
        }
        if c.backend.is_none() && c.provider_name.trim().is_empty() {
            return Err(StudyDeckError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(StudyDeckError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(StudyDeckError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Number of cards per request, clamped to 1–50.
pub fn clamp_num_cards(n: usize) -> usize {
    n.clamp(1, 50)
}

// ── Server ───────────────────────────────────────────────────────────────

/// Deployment environment. Development turns on debug logs and detailed
/// error pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Anything other than a production spelling is treated as development.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Basic-auth credentials gating the web UI.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Web server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// `None` disables authentication.
    pub credentials: Option<Credentials>,
    /// Maximum request body size in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            environment: Environment::default(),
            credentials: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Credentials are only enabled when both parts are present and non-empty.
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.credentials = match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Credentials {
                username: u,
                password: p,
            }),
            _ => None,
        };
        self
    }

    /// Resolve `host:port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, StudyDeckError> {
        let host = if self.host == "localhost" { "127.0.0.1" } else { self.host.as_str() };
        format!("{}:{}", host, self.port)
            .parse()
            .map_err(|e| StudyDeckError::InvalidConfig(format!("bad bind address '{}:{}': {e}", self.host, self.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_values() {
        let c = PipelineConfig::builder()
            .temperature(5.0)
            .num_cards(500)
            .max_image_pixels(3)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.num_cards, 50);
        assert_eq!(c.max_image_pixels, 100);
    }

    #[test]
    fn builder_caps_retries() {
        let c = PipelineConfig::builder().max_retries(70).build().unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES_LIMIT);
    }

    #[test]
    fn builder_rejects_empty_model() {
        let err = PipelineConfig::builder().model("  ").build().unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(PipelineConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn credentials_need_both_parts() {
        let s = ServerConfig::default().with_credentials(Some("ana".into()), None);
        assert!(s.credentials.is_none());
        let s = ServerConfig::default().with_credentials(Some("ana".into()), Some("pw".into()));
        assert_eq!(s.credentials.unwrap().username, "ana");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials { username: "ana".into(), password: "hunter2".into() };
        assert!(!format!("{c:?}").contains("hunter2"));
    }

    #[test]
    fn environment_parse() {
        assert_eq!(Environment::parse("Production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }

    #[test]
    fn socket_addr_accepts_localhost() {
        let s = ServerConfig { host: "localhost".into(), port: 8080, ..Default::default() };
        assert_eq!(s.socket_addr().unwrap().port(), 8080);
    }
}
