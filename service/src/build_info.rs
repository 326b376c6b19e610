use chrono::{DateTime, Utc};
use serde::Serialize;
use std::env;

/// Build metadata reported at startup and served from `/_api/build-info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub git_sha: String,
    pub build_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct BuildInfoProvider {
    info: BuildInfo,
}

impl BuildInfoProvider {
    /// Resolve build metadata from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve build metadata through `lookup`; missing keys fall back to
    /// `dev` / `unknown`.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let version = lookup("APP_VERSION")
            .or_else(|| lookup("VERSION"))
            .unwrap_or_else(|| "dev".to_string());

        Self {
            info: BuildInfo {
                version,
                git_sha: lookup("GIT_SHA").unwrap_or_else(|| "unknown".to_string()),
                build_time: lookup("BUILD_TIME")
                    .as_deref()
                    .and_then(normalize_build_time)
                    .unwrap_or_else(|| "unknown".to_string()),
                message: lookup("BUILD_MESSAGE"),
            },
        }
    }

    #[must_use]
    pub fn build_info(&self) -> BuildInfo {
        self.info.clone()
    }
}

/// Accepts RFC 3339 with or without a trailing zone; always returns UTC.
fn normalize_build_time(value: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc3339(&format!("{value}Z")))
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
        .ok()
}
