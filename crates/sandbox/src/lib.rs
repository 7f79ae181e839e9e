//! Remote execution contexts for Log Detective.
//!
//! - [`RunloopSandbox`]: the Runloop devbox HTTP client (`Sandbox` impl)
//! - [`SandboxManager`]: scoped acquire/release around one run

pub mod lifecycle;
pub mod runloop;

pub use lifecycle::SandboxManager;
pub use runloop::{RunloopSandbox, RunloopSandboxBuilder};
