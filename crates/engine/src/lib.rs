//! Humangate Engine library.
//!
//! Event-driven waits for human input: an orchestrator registers a plan
//! approval or a clarification request, suspends on it, and is woken the
//! moment an answer is delivered.
//!
//! ## Structure
//!
//! - `stores/` - The wait store and the approval/clarification registry
//! - `infrastructure/` - Clock port and settings
//! - `benchmark` - Polling versus event-driven comparison

pub mod benchmark;
pub mod infrastructure;
pub mod stores;


pub use infrastructure::settings::WaitSettings;
pub use stores::{WaitRegistry, WaitStore};
