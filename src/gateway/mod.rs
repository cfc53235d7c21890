//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayRequest (operation + parameters)
//!     → dispatcher.rs (authenticate → rate-check → validate → cache → upstream)
//!     → operation.rs (operation table, parameter validation)
//!     → connector (opaque Ads API call on cache miss)
//!     → GatewayResponse envelope
//! ```

pub mod dispatcher;
pub mod envelope;
pub mod operation;

pub use dispatcher::{Dispatcher, GatewayError};
pub use envelope::{GatewayRequest, GatewayResponse};
pub use operation::Operation;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
