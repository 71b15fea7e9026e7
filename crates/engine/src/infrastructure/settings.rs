//! Wait timeout configuration.
//!
//! Two knobs, both optional:
//! - `default_timeout` applies when a caller waits without its own timeout.
//! - `max_timeout` caps every wait, including ones that asked for no timeout.
//!
//! Values come from the environment in milliseconds. Unset, empty, or `0`
//! means "none".

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TIMEOUT_ENV: &str = "HUMANGATE_DEFAULT_TIMEOUT_MS";
pub const MAX_TIMEOUT_ENV: &str = "HUMANGATE_MAX_TIMEOUT_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value for {var}: '{value}' (expected milliseconds)")]
    InvalidMillis { var: &'static str, value: String },
}

/// Timeout policy shared by every store in a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitSettings {
    pub default_timeout: Option<Duration>,
    pub max_timeout: Option<Duration>,
}

impl WaitSettings {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn with_max_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout = Some(timeout);
        self
    }

    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            default_timeout: millis_var(&lookup, DEFAULT_TIMEOUT_ENV)?,
            max_timeout: millis_var(&lookup, MAX_TIMEOUT_ENV)?,
        })
    }

    /// Resolve the deadline for one wait call.
    ///
    /// `None` means wait indefinitely.
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        match (requested.or(self.default_timeout), self.max_timeout) {
            (Some(timeout), Some(max)) => Some(timeout.min(max)),
            (None, Some(max)) => Some(max),
            (timeout, None) => timeout,
        }
    }
}

/// Read an optional millisecond value. Zero disables the knob.
pub(crate) fn millis_var<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let millis: u64 = raw.parse().map_err(|_| SettingsError::InvalidMillis {
        var,
        value: raw.to_string(),
    })?;

    Ok((millis > 0).then(|| Duration::from_millis(millis)))
}
