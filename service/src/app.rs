//! Router assembly.
//!
//! Layout:
//! - `GET /` serves the index HTML file
//! - `/_api/*` is handed to the API sub-router with the prefix stripped
//! - every other path is looked up in the public directory
//!
//! The security header chain wraps all of it, so static files, the API and
//! 404 responses carry the same headers.

use axum::{middleware, routing::get_service, Extension, Router};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    api,
    build_info::BuildInfoProvider,
    config::Config,
    http::security::{build_security_headers, security_headers_middleware, SecurityHeadersError},
};

/// Path prefix the API sub-router is mounted under.
pub const API_PREFIX: &str = "/_api";

/// Assembles the application router from configuration, with an optional
/// replacement for the default API sub-router.
pub struct AppBuilder {
    config: Config,
    api: Option<Router>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, api: None }
    }

    /// Mount `api` under `/_api` instead of the default API router.
    #[must_use]
    pub fn with_api(mut self, api: Router) -> Self {
        self.api = Some(api);
        self
    }

    /// Build the router.
    ///
    /// # Errors
    /// Returns an error if the security header configuration is invalid.
    pub fn build(self) -> Result<Router, SecurityHeadersError> {
        let api = self
            .api
            .unwrap_or_else(|| api::router(BuildInfoProvider::from_env().build_info()));
        build_app(&self.config, api)
    }
}

/// Wire routes, static files and middleware.
///
/// # Errors
/// Returns an error if the security header configuration is invalid.
pub fn build_app(config: &Config, api: Router) -> Result<Router, SecurityHeadersError> {
    let files = &config.static_files;

    let mut app = Router::new()
        .route("/", get_service(ServeFile::new(&files.index_file)))
        .nest(API_PREFIX, api)
        .fallback_service(ServeDir::new(&files.public_dir))
        .layer(TraceLayer::new_for_http());

    if config.security_headers.enabled {
        let headers = build_security_headers(&config.security_headers)?;
        tracing::info!(rules = headers.rules().len(), "Security headers enabled");
        app = app
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(Extension(headers));
    } else {
        tracing::warn!("Security headers disabled");
    }

    Ok(app)
}
