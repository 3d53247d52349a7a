//! # Runtime
//!
//! Controller runtime wiring: process initialization, one watch loop per
//! enabled resource kind and the shared error policy.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{init_tracing, initialize, InitializationResult};
pub use watch_loop::{run_controller, ControllerContext};
