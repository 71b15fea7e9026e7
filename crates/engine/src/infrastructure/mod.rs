//! Infrastructure implementations.
//!
//! Clock port and its implementations, plus environment-driven settings.

pub mod clock;
pub mod ports;
pub mod settings;
