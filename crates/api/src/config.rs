use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Access/refresh token signing configuration
    pub jwt: JwtAuthConfig,
    /// Auth cookie configuration
    #[serde(default)]
    pub cookies: CookieConfig,
    /// Command relay tuning
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,

    /// HMAC secret for refresh tokens; must differ from `access_secret`
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Refresh token and session lifetime in seconds (default: 604800 = 7 days)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: i64,

    /// Clock skew tolerance applied when checking `exp`
    #[serde(default)]
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub secure: bool,

    /// `Strict`, `Lax` or `None`
    #[serde(default = "default_same_site")]
    pub same_site: String,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default = "default_access_cookie_name")]
    pub access_token_name: String,

    #[serde(default = "default_refresh_cookie_name")]
    pub refresh_token_name: String,

    #[serde(default = "default_access_cookie_path")]
    pub access_token_path: String,

    #[serde(default = "default_refresh_cookie_path")]
    pub refresh_token_path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secure: true,
            same_site: default_same_site(),
            domain: None,
            access_token_name: default_access_cookie_name(),
            refresh_token_name: default_refresh_cookie_name(),
            access_token_path: default_access_cookie_path(),
            refresh_token_path: default_refresh_cookie_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Command prefixes forwarded desktop → web without reshaping
    #[serde(default = "default_passthrough_prefixes")]
    pub passthrough_prefixes: Vec<String>,

    /// Per-connection outbound queue length
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Attempts for each device presence write
    #[serde(default = "default_presence_retries")]
    pub presence_retries: u32,

    #[serde(default = "default_presence_retry_delay")]
    pub presence_retry_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            passthrough_prefixes: default_passthrough_prefixes(),
            subscriber_buffer: default_subscriber_buffer(),
            presence_retries: default_presence_retries(),
            presence_retry_delay_ms: default_presence_retry_delay(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_access_token_expiry() -> i64 {
    900
}
fn default_refresh_token_expiry() -> i64 {
    604_800
}
fn default_true() -> bool {
    true
}
fn default_same_site() -> String {
    "Lax".to_string()
}
fn default_access_cookie_name() -> String {
    "access_token".to_string()
}
fn default_refresh_cookie_name() -> String {
    "refresh_token".to_string()
}
fn default_access_cookie_path() -> String {
    "/".to_string()
}
fn default_refresh_cookie_path() -> String {
    "/auth".to_string()
}
fn default_passthrough_prefixes() -> Vec<String> {
    vec!["screen.".to_string()]
}
fn default_subscriber_buffer() -> usize {
    256
}
fn default_presence_retries() -> u32 {
    3
}
fn default_presence_retry_delay() -> u64 {
    100
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with DR__ prefix, e.g. `DR__JWT__ACCESS_SECRET`
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("DR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .with_list_parse_key("relay.passthrough_prefixes")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides, without files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 3000
            request_timeout_secs = 30

            [database]
            url = ""

            [logging]
            level = "info"
            format = "json"

            [jwt]
            access_secret = "test-access-secret"
            refresh_secret = "test-refresh-secret"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DR__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.access_secret.is_empty() || self.jwt.refresh_secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DR__JWT__ACCESS_SECRET and DR__JWT__REFRESH_SECRET must be set".to_string(),
            ));
        }

        if self.jwt.access_secret == self.jwt.refresh_secret {
            return Err(ConfigValidationError::InvalidValue(
                "jwt access_secret and refresh_secret must differ".to_string(),
            ));
        }

        if self.jwt.access_token_expiry_secs <= 0 || self.jwt.refresh_token_expiry_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            ));
        }

        if self.relay.subscriber_buffer == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "relay.subscriber_buffer must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
