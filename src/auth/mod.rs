//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → token.rs (decode header, verify HS256 signature, check expiry)
//!     → ClientIdentity (subject + scopes)
//!     → rate limiter / cache partition key
//! ```
//!
//! # Design Decisions
//! - Validation is a pure function of (token, secret, now) — the clock is
//!   a parameter, never read inside
//! - Auth bypass is an explicit config boolean; the validator never
//!   inspects the deployment environment
//! - Only HS256 is accepted; other algorithms (including `none`) are
//!   rejected before signature verification

pub mod token;

pub use token::{AuthError, Claims, ClientIdentity, TokenValidator};
