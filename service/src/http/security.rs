//! Security headers middleware for HTTP responses.
//!
//! The header chain is an ordered list of [`HeaderRule`]s built once from
//! configuration. Every response passes through the whole chain: rules are
//! applied in order, so a later rule for the same header wins.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{
        header::{
            CACHE_CONTROL, EXPIRES, PRAGMA, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
            X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
    Extension,
};

use crate::config::{HstsConfig, SecurityHeadersConfig};
use crate::http::csp::{ContentSecurityPolicy, CspError};

pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");
pub const X_DOWNLOAD_OPTIONS: HeaderName = HeaderName::from_static("x-download-options");
pub const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");

#[derive(Debug, thiserror::Error)]
pub enum SecurityHeadersError {
    #[error("security_headers.frame_options must be 'DENY' or 'SAMEORIGIN', got: '{0}'")]
    InvalidFrameOptions(String),

    #[error("security_headers.csp: {0}")]
    Csp(#[from] CspError),
}

/// One step of the header chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// Insert the header, replacing any value already on the response.
    Set(HeaderName, HeaderValue),
    /// Drop the header from the response.
    Remove(HeaderName),
}

/// Ordered, immutable header chain shared across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityHeaders {
    rules: Vec<HeaderRule>,
}

impl SecurityHeaders {
    #[must_use]
    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    /// Run every rule, in order, against a response's headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for rule in &self.rules {
            match rule {
                HeaderRule::Set(name, value) => {
                    headers.insert(name.clone(), value.clone());
                }
                HeaderRule::Remove(name) => {
                    headers.remove(name);
                }
            }
        }
    }

    fn set(&mut self, name: HeaderName, value: HeaderValue) {
        self.rules.push(HeaderRule::Set(name, value));
    }

    fn remove(&mut self, name: HeaderName) {
        self.rules.push(HeaderRule::Remove(name));
    }
}

/// Build the header chain from configuration.
///
/// Rules are emitted in a fixed order: powered-by, frameguard, XSS filter,
/// no-sniff, IE no-open, HSTS, DNS prefetch, no-cache, CSP.
///
/// # Errors
/// Returns an error if the frame options value is not `DENY`/`SAMEORIGIN`
/// or the Content-Security-Policy is invalid.
pub fn build_security_headers(
    config: &SecurityHeadersConfig,
) -> Result<Arc<SecurityHeaders>, SecurityHeadersError> {
    let mut headers = SecurityHeaders::default();

    if config.hide_powered_by {
        headers.remove(X_POWERED_BY);
    }

    headers.set(X_FRAME_OPTIONS, frame_options_value(&config.frame_options)?);

    // "0" disables the legacy browser XSS auditor
    if config.xss_filter {
        headers.set(X_XSS_PROTECTION, HeaderValue::from_static("0"));
    }

    if config.no_sniff {
        headers.set(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }

    if config.ie_no_open {
        headers.set(X_DOWNLOAD_OPTIONS, HeaderValue::from_static("noopen"));
    }

    if config.hsts.enabled {
        headers.set(STRICT_TRANSPORT_SECURITY, hsts_value(&config.hsts));
    } else {
        headers.remove(STRICT_TRANSPORT_SECURITY);
    }

    headers.set(
        X_DNS_PREFETCH_CONTROL,
        HeaderValue::from_static(if config.dns_prefetch_allow { "on" } else { "off" }),
    );

    if config.no_cache {
        headers.set(SURROGATE_CONTROL, HeaderValue::from_static("no-store"));
        headers.set(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
        );
        headers.set(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.set(EXPIRES, HeaderValue::from_static("0"));
    }

    if config.csp.enabled {
        let policy = ContentSecurityPolicy::from_config(&config.csp)?;
        headers.set(policy.header_name(), policy.header_value()?);
    }

    Ok(Arc::new(headers))
}

fn frame_options_value(value: &str) -> Result<HeaderValue, SecurityHeadersError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "DENY" => Ok(HeaderValue::from_static("DENY")),
        "SAMEORIGIN" => Ok(HeaderValue::from_static("SAMEORIGIN")),
        _ => Err(SecurityHeadersError::InvalidFrameOptions(value.to_string())),
    }
}

fn hsts_value(config: &HstsConfig) -> HeaderValue {
    let mut value = format!("max-age={}", config.max_age);
    if config.include_subdomains {
        value.push_str("; includeSubDomains");
    }
    if config.preload {
        value.push_str("; preload");
    }
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("max-age=0"))
}

/// Middleware to apply the security header chain to all responses.
///
/// This middleware reads the pre-built [`SecurityHeaders`] from an
/// `Extension`. It should be added as the outermost layer so headers are
/// applied to all routes, including static files, nested routers and 404s.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, Router, Extension};
/// use secure_site::http::security::{build_security_headers, security_headers_middleware};
/// use secure_site::config::SecurityHeadersConfig;
///
/// let headers = build_security_headers(&SecurityHeadersConfig::default())?;
///
/// let app = Router::new()
///     // ... routes ...
///     .layer(middleware::from_fn(security_headers_middleware))
///     .layer(Extension(headers));
/// ```
pub async fn security_headers_middleware(
    Extension(headers): Extension<Arc<SecurityHeaders>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    headers.apply(response.headers_mut());
    response
}
