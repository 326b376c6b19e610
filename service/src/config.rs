use std::{env, path::Path};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::prelude::deserialize_vec_from_string_or_vec;

use crate::http::security::{build_security_headers, SecurityHeadersError};

/// Application configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. `PORT` environment variable (maps to `server.port`)
/// 4. Environment variables with `SITE_` prefix (always wins)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP server bind address.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (debug, info, warn, error). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    /// Directory served for any path not claimed by another route.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// HTML file returned for `GET /`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
            index_file: default_index_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SecurityHeadersConfig {
    /// Apply the security header chain at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Strip `X-Powered-By` from every response (default: true).
    #[serde(default = "default_true")]
    pub hide_powered_by: bool,

    /// X-Frame-Options value: "DENY" or "SAMEORIGIN" (default: "DENY").
    #[serde(default = "default_frame_options")]
    pub frame_options: String,

    /// Send `X-XSS-Protection: 0`, turning off the legacy browser filter.
    #[serde(default = "default_true")]
    pub xss_filter: bool,

    /// Send `X-Content-Type-Options: nosniff`.
    #[serde(default = "default_true")]
    pub no_sniff: bool,

    /// Send `X-Download-Options: noopen`.
    #[serde(default = "default_true")]
    pub ie_no_open: bool,

    #[serde(default)]
    pub hsts: HstsConfig,

    /// Allow browsers to prefetch DNS for links (default: false, sends "off").
    #[serde(default)]
    pub dns_prefetch_allow: bool,

    /// Send headers that disable client and proxy caching (default: true).
    #[serde(default = "default_true")]
    pub no_cache: bool,

    #[serde(default)]
    pub csp: CspConfig,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            hide_powered_by: default_true(),
            frame_options: default_frame_options(),
            xss_filter: default_true(),
            no_sniff: default_true(),
            ie_no_open: default_true(),
            hsts: HstsConfig::default(),
            dns_prefetch_allow: false,
            no_cache: default_true(),
            csp: CspConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HstsConfig {
    /// Send `Strict-Transport-Security` (default: false). When false the
    /// header is also stripped from responses produced by nested routers.
    #[serde(default)]
    pub enabled: bool,

    /// HSTS max-age in seconds (default: 7776000 = 90 days).
    #[serde(default = "default_hsts_max_age")]
    pub max_age: u64,

    #[serde(default = "default_true")]
    pub include_subdomains: bool,

    #[serde(default)]
    pub preload: bool,
}

impl Default for HstsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_age: default_hsts_max_age(),
            include_subdomains: default_true(),
            preload: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CspConfig {
    /// Send a Content-Security-Policy header (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fill in the standard directive set for any directive not configured.
    #[serde(default = "default_true")]
    pub use_defaults: bool,

    /// Send `Content-Security-Policy-Report-Only` instead of enforcing.
    #[serde(default)]
    pub report_only: bool,

    /// Configured directives, rendered in this order ahead of the defaults.
    #[serde(default = "default_csp_directives")]
    pub directives: Vec<CspDirective>,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            use_defaults: default_true(),
            report_only: false,
            directives: default_csp_directives(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CspDirective {
    /// Directive name in header form, e.g. `script-src`.
    pub name: String,

    /// Source expressions. Accepts an array or a comma-separated string.
    /// Example: `["'self'", "trusted-cdn.com"]` or `"'self',trusted-cdn.com"`
    #[serde(default, deserialize_with = "deserialize_sources")]
    pub sources: Vec<String>,
}

impl CspDirective {
    #[must_use]
    pub fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Deserialize sources from comma-separated string or array, trimming and
/// filtering empty values.
fn deserialize_sources<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let sources: Vec<String> = deserialize_vec_from_string_or_vec(deserializer)?;
    Ok(sources
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

// These functions cannot be const because serde uses function pointers for defaults
#[allow(clippy::missing_const_for_fn)]
fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_index_file() -> String {
    "views/index.html".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

fn default_frame_options() -> String {
    "DENY".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_hsts_max_age() -> u64 {
    90 * 24 * 60 * 60
}

fn default_csp_directives() -> Vec<CspDirective> {
    vec![
        CspDirective::new("default-src", &["'self'"]),
        CspDirective::new("script-src", &["'self'", "trusted-cdn.com"]),
    ]
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    SecurityHeaders(#[from] SecurityHeadersError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources, reading `config.yaml` from the
    /// working directory.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(yaml_path.as_ref()).extract()?;

        config.validate()?;
        Ok(config)
    }

    fn figment(yaml_path: &Path) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path));

        // A blank PORT counts as unset
        if env::var("PORT").is_ok_and(|port| !port.trim().is_empty()) {
            figment = figment.merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()));
        }

        figment.merge(Env::prefixed("SITE_").split("__"))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".into()));
        }

        if self.static_files.index_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "static_files.index_file cannot be empty".into(),
            ));
        }

        // Builds the full header chain, which covers frame options and CSP.
        if self.security_headers.enabled {
            build_security_headers(&self.security_headers)?;
        }

        Ok(())
    }
}
