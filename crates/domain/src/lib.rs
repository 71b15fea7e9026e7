//! Humangate domain types.
//!
//! Keys, slot states, and errors shared by every wait store. This crate has no
//! runtime; the engine crate owns the actual synchronization.

pub mod error;
pub mod ids;
pub mod slot;

pub use error::WaitError;
pub use ids::{PlanId, RequestId};
pub use slot::{PendingSlot, SlotStatus, WaitKind};
