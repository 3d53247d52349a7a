//! Console Sync Controller Library
//!
//! This library provides the core functionality for the Console Sync Controller:
//! a generic reconciliation engine that keeps custom resources synchronized with
//! the Console control-plane API, and the namespace credentials cache that
//! decides which API token each namespace uses.
//!
//! ## Quick Start
//!
//! ```rust
//! use console_sync_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod console;
pub mod constants;
pub mod crd;
pub mod credentials;
pub mod engine;
pub mod hash;
pub mod kinds;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
