//! Test app builder that mirrors main.rs wiring with injectable pieces.
//!
//! Static files resolve against the crate's own `public/` and `views/`
//! directories regardless of the working directory the tests run in.

use axum::Router;
use secure_site::{
    api,
    app::AppBuilder,
    build_info::{BuildInfo, BuildInfoProvider},
    config::{Config, SecurityHeadersConfig},
};

pub const PUBLIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/public");
pub const INDEX_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/views/index.html");

/// Build info with fixed values so responses are predictable.
pub fn test_build_info() -> BuildInfo {
    BuildInfoProvider::from_lookup(|key| match key {
        "APP_VERSION" => Some("1.2.3".to_string()),
        "GIT_SHA" => Some("abc123".to_string()),
        "BUILD_TIME" => Some("2024-01-02T03:04:05Z".to_string()),
        _ => None,
    })
    .build_info()
}

pub struct TestAppBuilder {
    config: Config,
    api: Option<Router>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppBuilder {
    /// Default configuration pointed at the crate's static fixtures.
    #[must_use]
    pub fn new() -> Self {
        let mut config = Config::default();
        config.static_files.public_dir = PUBLIC_DIR.to_string();
        config.static_files.index_file = INDEX_FILE.to_string();
        Self { config, api: None }
    }

    #[must_use]
    pub fn with_security_headers(mut self, security_headers: SecurityHeadersConfig) -> Self {
        self.config.security_headers = security_headers;
        self
    }

    /// Replace the default API sub-router.
    #[must_use]
    pub fn with_api(mut self, api: Router) -> Self {
        self.api = Some(api);
        self
    }

    /// Build the router, panicking on invalid configuration.
    pub fn build(self) -> Router {
        let api = self
            .api
            .unwrap_or_else(|| api::router(test_build_info()));
        AppBuilder::new(self.config)
            .with_api(api)
            .build()
            .expect("valid test configuration")
    }
}
