//! HTTP utilities and middleware.
//!
//! This module provides the response-header security chain used by the
//! application server.

pub mod csp;
pub mod security;

pub use csp::{ContentSecurityPolicy, CspError};
pub use security::{
    build_security_headers, security_headers_middleware, HeaderRule, SecurityHeaders,
    SecurityHeadersError,
};
