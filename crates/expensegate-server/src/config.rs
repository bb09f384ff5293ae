//! Server configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use expensegate_auth::config::{
    DEFAULT_EVICTION_INTERVAL, DEFAULT_LIMIT_PER_HOUR, DEFAULT_LIMIT_PER_MINUTE,
    DEFAULT_PUBLIC_PREFIXES, DEFAULT_TOKEN_TTL,
};
use expensegate_auth::{AdmissionConfig, AuthConfig, AuthError, RateLimitConfig, SecretEncoding};
use secrecy::SecretString;
use serde::Deserialize;

/// Prefix of environment overrides (`EXPENSEGATE__PORT`, `EXPENSEGATE__AUTH__SECRET`, ...)
pub const ENV_PREFIX: &str = "EXPENSEGATE";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind_address: String,
    /// Bind port
    pub port: u16,
    /// Token signing
    pub auth: AuthSettings,
    /// Per-principal limits
    pub rate_limit: RateLimitSettings,
    /// Paths exempt from rate limiting
    pub public_prefixes: Vec<String>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Token signing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC secret; required to start
    pub secret: Option<SecretString>,
    /// Whether `secret` is raw text or base64
    pub secret_encoding: SecretEncoding,
    /// Token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Clock skew tolerated on expiry, in seconds
    pub leeway_secs: u64,
}

/// Rate limit settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests admitted per minute
    pub per_minute: u32,
    /// Requests admitted per hour
    pub per_hour: u32,
    /// Seconds between idle-eviction sweeps
    pub eviction_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub structured: bool,
    /// Write daily-rotated files here instead of stderr
    pub directory: Option<PathBuf>,
    /// File name prefix for rotated logs
    pub file_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            auth: AuthSettings::default(),
            rate_limit: RateLimitSettings::default(),
            public_prefixes: DEFAULT_PUBLIC_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: None,
            secret_encoding: SecretEncoding::Raw,
            token_ttl_secs: DEFAULT_TOKEN_TTL.as_secs(),
            leeway_secs: 0,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            per_minute: DEFAULT_LIMIT_PER_MINUTE,
            per_hour: DEFAULT_LIMIT_PER_HOUR,
            eviction_interval_secs: DEFAULT_EVICTION_INTERVAL.as_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: false,
            directory: None,
            file_prefix: "expensegate".to_string(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// No signing secret was configured
    #[error("No signing secret configured (set auth.secret or {ENV_PREFIX}__AUTH__SECRET)")]
    MissingSecret,

    /// The signing secret was rejected
    #[error("Invalid signing secret: {0}")]
    InvalidSecret(#[from] AuthError),
}

impl ServerConfig {
    /// Load configuration from an optional file plus the environment
    ///
    /// The file format is auto-detected from the extension (`.toml`,
    /// `.yaml`/`.yml`, `.json`). Variables prefixed with `EXPENSEGATE__`
    /// override file settings, using `__` for nesting, e.g.
    /// `EXPENSEGATE__RATE_LIMIT__PER_MINUTE=120`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, has an unknown extension, or
    /// does not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Same as [`ServerConfig::load`] with a custom environment prefix
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::load`].
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        Self::load_from(path, environment(env_prefix))
    }

    fn load_from(path: Option<&Path>, env: config::Environment) -> Result<Self, ConfigError> {
        use config::{Config, File, FileFormat};

        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }

            let format = match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml") | Some("yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => return Err(ConfigError::UnsupportedFormat),
            };

            let name = path.to_str().ok_or(ConfigError::UnsupportedFormat)?;
            builder = builder.add_source(File::new(name, format));
        }

        let config = builder.add_source(env).build()?;

        Ok(config.try_deserialize()?)
    }

    /// Set the signing secret
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth.secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Set both window capacities
    #[must_use]
    pub fn with_limits(mut self, per_minute: u32, per_hour: u32) -> Self {
        self.rate_limit.per_minute = per_minute;
        self.rate_limit.per_hour = per_hour;
        self
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Token signing configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] when no secret is configured.
    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        let secret = self.auth.secret.clone().ok_or(ConfigError::MissingSecret)?;
        Ok(AuthConfig::new(secret)
            .with_secret_encoding(self.auth.secret_encoding)
            .with_token_ttl(Duration::from_secs(self.auth.token_ttl_secs))
            .with_leeway_secs(self.auth.leeway_secs))
    }

    /// Rate limiter configuration
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::default()
            .with_per_minute(self.rate_limit.per_minute)
            .with_per_hour(self.rate_limit.per_hour)
            .with_eviction_interval(Duration::from_secs(self.rate_limit.eviction_interval_secs))
    }

    /// Admission interceptor configuration
    pub fn admission_config(&self) -> AdmissionConfig {
        AdmissionConfig::default().with_public_prefixes(self.public_prefixes.clone())
    }
}

/// `PREFIX__SECTION__KEY` variables; `public_prefixes` is comma separated
fn environment(prefix: &str) -> config::Environment {
    config::Environment::with_prefix(prefix)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("public_prefixes")
        .try_parsing(true)
}
