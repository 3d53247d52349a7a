//! # Configuration
//!
//! Process-wide controller settings.

mod controller;

pub use controller::{parse_reconcilers, ControllerConfig};
