//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → init logging/metrics → bind listener → serve
//!
//! Signals (signals.rs):
//!     SIGTERM/ctrl-c → graceful shutdown
//!     SIGHUP → config reload event (when RELOAD=true)
//!
//! Shutdown (shutdown.rs):
//!     Broadcast to the server → stop accepting → drain → exit 0
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
