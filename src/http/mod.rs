//! HTTP protocol surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID for correlation)
//!     → gateway dispatcher (auth, rate, cache, upstream)
//!     → JSON response envelope
//! ```

pub mod request;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
