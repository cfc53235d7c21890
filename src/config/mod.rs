//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → loader.rs (resolve keys, parse, apply defaults)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On SIGHUP (when RELOAD=true):
//!     environment re-resolved
//!     → atomic swap of Arc<GatewayConfig>
//!     → dispatcher rebuilt from the new snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a full reload
//! - Every key has a default so an empty environment yields a working
//!   development config
//! - No component other than the loader reads the process environment
//! - A key that is present but unparseable is a fatal startup error

pub mod loader;
pub mod schema;

pub use loader::{from_env, ConfigError};
pub use schema::{Environment, GatewayConfig};
