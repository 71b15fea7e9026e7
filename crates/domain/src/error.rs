//! Error taxonomy for wait slot operations.
//!
//! Every variant names the slot kind and key so the orchestrator can log or
//! route the failure without extra context. None of these are swallowed by
//! the stores: a silent failure here shows up as a hung waiter elsewhere.

use std::time::Duration;

use thiserror::Error;

use crate::slot::WaitKind;

/// Error returned by register/resolve/wait operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// No registration exists for the key
    #[error("{kind} '{key}' not found")]
    NotFound { kind: WaitKind, key: String },

    /// The deadline passed before an answer arrived
    #[error("{kind} '{key}' timed out after {after:?}")]
    Timeout {
        kind: WaitKind,
        key: String,
        after: Duration,
    },

    /// The key is already registered (pending or resolved)
    #[error("{kind} '{key}' is already registered")]
    AlreadyRegistered { kind: WaitKind, key: String },

    /// An answer was already delivered for the key
    #[error("{kind} '{key}' is already resolved")]
    AlreadyResolved { kind: WaitKind, key: String },

    /// Another task is already waiting on the key
    #[error("{kind} '{key}' already has a waiter")]
    AlreadyWaiting { kind: WaitKind, key: String },

    /// The slot was cleaned up while a task was waiting on it
    #[error("{kind} '{key}' was cleaned up while awaited")]
    Cancelled { kind: WaitKind, key: String },
}

impl WaitError {
    pub fn not_found(kind: WaitKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn timeout(kind: WaitKind, key: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            kind,
            key: key.into(),
            after,
        }
    }

    pub fn already_registered(kind: WaitKind, key: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            kind,
            key: key.into(),
        }
    }

    pub fn already_resolved(kind: WaitKind, key: impl Into<String>) -> Self {
        Self::AlreadyResolved {
            kind,
            key: key.into(),
        }
    }

    pub fn already_waiting(kind: WaitKind, key: impl Into<String>) -> Self {
        Self::AlreadyWaiting {
            kind,
            key: key.into(),
        }
    }

    pub fn cancelled(kind: WaitKind, key: impl Into<String>) -> Self {
        Self::Cancelled {
            kind,
            key: key.into(),
        }
    }

    /// The kind of slot the failed operation targeted.
    pub fn kind(&self) -> WaitKind {
        match self {
            Self::NotFound { kind, .. }
            | Self::Timeout { kind, .. }
            | Self::AlreadyRegistered { kind, .. }
            | Self::AlreadyResolved { kind, .. }
            | Self::AlreadyWaiting { kind, .. }
            | Self::Cancelled { kind, .. } => *kind,
        }
    }

    /// The key the failed operation targeted.
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key, .. }
            | Self::Timeout { key, .. }
            | Self::AlreadyRegistered { key, .. }
            | Self::AlreadyResolved { key, .. }
            | Self::AlreadyWaiting { key, .. }
            | Self::Cancelled { key, .. } => key,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_and_key() {
        let err = WaitError::not_found(WaitKind::Approval, "invalid_plan_id");
        assert_eq!(err.to_string(), "approval 'invalid_plan_id' not found");
    }

    #[test]
    fn timeout_is_distinguishable() {
        let err = WaitError::timeout(
            WaitKind::Clarification,
            "q1",
            Duration::from_millis(100),
        );
        assert!(err.is_timeout());
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), WaitKind::Clarification);
        assert_eq!(err.key(), "q1");
    }
}
