//! Response caching subsystem.

pub mod response;

pub use response::{fingerprint, ResponseCache};
