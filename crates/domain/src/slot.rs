//! Wait slot vocabulary shared by every store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of human input a slot is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitKind {
    /// Yes/no sign-off on a plan
    Approval,
    /// Free-text answer to a question
    Clarification,
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitKind::Approval => write!(f, "approval"),
            WaitKind::Clarification => write!(f, "clarification"),
        }
    }
}

impl std::str::FromStr for WaitKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approval" => Ok(WaitKind::Approval),
            "clarification" => Ok(WaitKind::Clarification),
            _ => Err(()),
        }
    }
}

/// Observable state of a registered slot.
///
/// Absence from the store is the third state; it is expressed as `None`
/// wherever a status is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Registered, answer not yet known
    Pending,
    /// Answer stored, waiting to be collected
    Resolved,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Pending => write!(f, "pending"),
            SlotStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Snapshot of one registered slot, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSlot<K> {
    pub key: K,
    pub status: SlotStatus,
    pub registered_at: DateTime<Utc>,
    /// Whether a task is currently suspended on this slot
    pub awaited: bool,
}
