//! In-memory state storage modules.
//!
//! Stores manage runtime state that never leaves the process:
//! - `WaitStore` - Keyed one-shot wait slots for one kind of input
//! - `WaitRegistry` - Approval and clarification stores together

pub mod wait_registry;
pub mod wait_store;

pub use wait_registry::{ApprovalStore, ClarificationStore, WaitRegistry};
pub use wait_store::WaitStore;
