//! Outbound Ads API collaborator.
//!
//! The gateway treats the Ads API as an opaque capability: an operation
//! and its parameters go in, a payload or a structured upstream error
//! comes out. Retry policy, if any, belongs to the client implementation,
//! not here.

pub mod meta;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::gateway::operation::Operation;

pub use meta::MetaAdsConnector;

/// Failures from the upstream Ads API. The dispatcher wraps these into
/// its own taxonomy; raw upstream errors never reach the caller.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("not connected to the Meta Ads API: {0}")]
    NotConnected(String),

    #[error("Meta Ads API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Meta Ads API transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Capability seam for the external Ads API client.
#[async_trait]
pub trait AdsConnector: Send + Sync {
    /// Execute one operation with validated, normalized parameters.
    async fn execute(
        &self,
        operation: Operation,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError>;
}
