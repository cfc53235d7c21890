//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → body size limit (layer, before anything else)
//!     → auth/token.rs (validated identity)
//!     → rate_limit.rs (per-identity window check)
//!     → pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Per-identity admission is a single critical section

pub mod rate_limit;

pub use rate_limit::{RateLimitError, RateLimiter};
