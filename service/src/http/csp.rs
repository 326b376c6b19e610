//! Content-Security-Policy construction and validation.
//!
//! A policy is an ordered list of directives. Configured directives come
//! first, in the order given; when `use_defaults` is set the standard
//! directive set fills in every directive that was not configured.

use std::fmt;

use axum::http::{
    header::{CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY},
    HeaderName, HeaderValue,
};

use crate::config::CspConfig;

/// Directives filled in when `use_defaults` is enabled.
const DEFAULT_DIRECTIVES: &[(&str, &[&str])] = &[
    ("default-src", &["'self'"]),
    ("base-uri", &["'self'"]),
    ("font-src", &["'self'", "https:", "data:"]),
    ("form-action", &["'self'"]),
    ("frame-ancestors", &["'self'"]),
    ("img-src", &["'self'", "data:"]),
    ("object-src", &["'none'"]),
    ("script-src", &["'self'"]),
    ("script-src-attr", &["'none'"]),
    ("style-src", &["'self'", "https:", "'unsafe-inline'"]),
    ("upgrade-insecure-requests", &[]),
];

/// Keywords that only mean something when single-quoted.
const QUOTED_KEYWORDS: &[&str] = &[
    "self",
    "none",
    "strict-dynamic",
    "report-sample",
    "inline-speculation-rules",
    "unsafe-inline",
    "unsafe-eval",
    "unsafe-hashes",
    "wasm-unsafe-eval",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CspError {
    #[error("invalid Content-Security-Policy directive name '{0}'")]
    InvalidDirectiveName(String),

    #[error("invalid value '{value}' for Content-Security-Policy directive '{directive}'")]
    InvalidDirectiveValue { directive: String, value: String },

    #[error("'{value}' in Content-Security-Policy directive '{directive}' must be quoted")]
    UnquotedKeyword { directive: String, value: String },

    #[error("Content-Security-Policy directive '{0}' is configured more than once")]
    DuplicateDirective(String),

    #[error("Content-Security-Policy needs a default-src but none was provided")]
    MissingDefaultSrc,

    #[error("Content-Security-Policy is not a valid header value")]
    InvalidHeaderValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    name: String,
    sources: Vec<String>,
}

/// A validated Content-Security-Policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: Vec<Directive>,
    report_only: bool,
}

impl ContentSecurityPolicy {
    /// Build a policy from configuration.
    ///
    /// # Errors
    /// Returns an error if a directive name or source is malformed, a
    /// directive appears twice, or the final policy has no `default-src`.
    pub fn from_config(config: &CspConfig) -> Result<Self, CspError> {
        let mut directives: Vec<Directive> = Vec::with_capacity(config.directives.len());

        for configured in &config.directives {
            let name = normalize_directive_name(&configured.name);
            if !is_valid_directive_name(&name) {
                return Err(CspError::InvalidDirectiveName(configured.name.clone()));
            }
            if directives.iter().any(|d| d.name == name) {
                return Err(CspError::DuplicateDirective(name));
            }
            let sources = configured
                .sources
                .iter()
                .map(|source| validate_source(&name, source))
                .collect::<Result<Vec<_>, _>>()?;
            directives.push(Directive { name, sources });
        }

        if config.use_defaults {
            for (name, sources) in DEFAULT_DIRECTIVES {
                if !directives.iter().any(|d| d.name == *name) {
                    directives.push(Directive {
                        name: (*name).to_string(),
                        sources: sources.iter().map(ToString::to_string).collect(),
                    });
                }
            }
        }

        if !directives.iter().any(|d| d.name == "default-src") {
            return Err(CspError::MissingDefaultSrc);
        }

        Ok(Self {
            directives,
            report_only: config.report_only,
        })
    }

    /// Header the policy is sent under.
    #[must_use]
    pub fn header_name(&self) -> HeaderName {
        if self.report_only {
            CONTENT_SECURITY_POLICY_REPORT_ONLY
        } else {
            CONTENT_SECURITY_POLICY
        }
    }

    /// Rendered policy as a header value.
    ///
    /// # Errors
    /// Returns an error if a source contains bytes not allowed in headers.
    pub fn header_value(&self) -> Result<HeaderValue, CspError> {
        HeaderValue::from_str(&self.to_string()).map_err(|_| CspError::InvalidHeaderValue)
    }

    #[cfg(test)]
    fn directive(&self, name: &str) -> Option<&[String]> {
        self.directives
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.sources.as_slice())
    }
}

impl fmt::Display for ContentSecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            f.write_str(&directive.name)?;
            for source in &directive.sources {
                write!(f, " {source}")?;
            }
        }
        Ok(())
    }
}

/// Lowercase a directive name, turning camelCase (`scriptSrc`) into the
/// dashed header form (`script-src`).
fn normalize_directive_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.trim().chars() {
        if c.is_ascii_uppercase() && prev_lower {
            normalized.push('-');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        normalized.push(c.to_ascii_lowercase());
    }
    normalized
}

fn is_valid_directive_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Check one source expression and return it trimmed.
fn validate_source(directive: &str, source: &str) -> Result<String, CspError> {
    let trimmed = source.trim();
    if trimmed.is_empty() || trimmed.contains([';', ',']) {
        return Err(CspError::InvalidDirectiveValue {
            directive: directive.to_string(),
            value: source.to_string(),
        });
    }
    if QUOTED_KEYWORDS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Err(CspError::UnquotedKeyword {
            directive: directive.to_string(),
            value: source.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
