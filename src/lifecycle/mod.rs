//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → server stops accepting, drains in-flight requests
//!               → reload task exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
