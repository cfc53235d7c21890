//! Request orchestration.
//!
//! One request flows authenticate → rate-check → validate → cache lookup
//! (read operations) → upstream call → cache store → respond. Every
//! failure is converted to the error envelope here; no internal error
//! ever reaches the caller raw.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{AuthError, TokenValidator};
use crate::cache::{fingerprint, ResponseCache};
use crate::config::schema::GatewayConfig;
use crate::connector::{AdsConnector, UpstreamError};
use crate::gateway::envelope::{GatewayRequest, GatewayResponse};
use crate::gateway::operation::{validate_params, Operation, ValidationError};
use crate::gateway::unix_now;
use crate::security::{RateLimitError, RateLimiter};

/// Per-request error taxonomy at the dispatcher boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("upstream call failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("request body exceeds the configured maximum")]
    RequestTooLarge,

    #[error("malformed request body: {0}")]
    BadRequest(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Validation(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Auth(e) => e.error_code(),
            GatewayError::RateLimited(_) => "rate_limited",
            GatewayError::Validation(ValidationError::UnsupportedOperation(_)) => {
                "unsupported_operation"
            }
            GatewayError::Validation(ValidationError::MissingParameter { .. }) => {
                "missing_parameter"
            }
            GatewayError::Upstream(_) => "upstream_error",
            GatewayError::RequestTooLarge => "request_too_large",
            GatewayError::BadRequest(_) => "invalid_request",
        }
    }

    /// Seconds until the client may retry, for rate-limit rejections.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            GatewayError::RateLimited(e) => Some(e.retry_after),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let envelope = GatewayResponse::error(self.error_code(), self.to_string());
        let mut response = (self.status(), Json(envelope)).into_response();
        if let Some(retry_after) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

/// Orchestrates validation, admission, caching, and the upstream call for
/// one request at a time against shared limiter and cache state.
pub struct Dispatcher {
    validator: TokenValidator,
    limiter: RateLimiter,
    cache: ResponseCache,
    connector: Arc<dyn AdsConnector>,
}

impl Dispatcher {
    pub fn new(config: &GatewayConfig, connector: Arc<dyn AdsConnector>) -> Self {
        Self {
            validator: TokenValidator::from_config(&config.auth),
            limiter: RateLimiter::from_config(&config.rate_limit),
            cache: ResponseCache::from_config(&config.cache),
            connector,
        }
    }

    /// Handle one request envelope with the given bearer token.
    pub async fn dispatch(
        &self,
        bearer: Option<&str>,
        request: GatewayRequest,
    ) -> Result<Value, GatewayError> {
        self.dispatch_at(bearer, request, unix_now()).await
    }

    /// Same as [`dispatch`](Self::dispatch), with an explicit clock for
    /// tests of time-dependent behavior.
    pub async fn dispatch_at(
        &self,
        bearer: Option<&str>,
        request: GatewayRequest,
        now: u64,
    ) -> Result<Value, GatewayError> {
        let identity = self.validator.validate(bearer, now)?;
        self.limiter.admit(&identity, now)?;

        let operation = Operation::parse(&request.operation)
            .ok_or_else(|| ValidationError::UnsupportedOperation(request.operation.clone()))?;
        let mut params = request.parameters;
        validate_params(operation, &mut params)?;

        let key = fingerprint(operation.name(), &params, &identity.subject);
        if operation.is_read() {
            if let Some(payload) = self.cache.get(&key, now) {
                tracing::debug!(operation = %operation, client = %identity.subject, "Cache hit");
                return Ok(payload);
            }
        }

        tracing::debug!(operation = %operation, client = %identity.subject, "Calling upstream");
        let payload = self.connector.execute(operation, &params).await?;

        // Only successful read responses are cached; a committed write
        // stands even if the caller has already disconnected.
        if operation.is_read() {
            self.cache.put(key, payload.clone(), now);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::envelope::GatewayRequest;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedConnector {
        calls: AtomicU32,
        fail: bool,
    }

    impl ScriptedConnector {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdsConnector for ScriptedConnector {
        async fn execute(
            &self,
            operation: Operation,
            _params: &Map<String, Value>,
        ) -> Result<Value, UpstreamError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(UpstreamError::Api {
                    status: 500,
                    message: "account unavailable".to_string(),
                });
            }
            Ok(json!({"operation": operation.name(), "call": call}))
        }
    }

    fn test_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.enabled = false;
        config
    }

    fn dispatcher_with(
        config: GatewayConfig,
        connector: Arc<ScriptedConnector>,
    ) -> Dispatcher {
        Dispatcher::new(&config, connector)
    }

    fn read_request() -> GatewayRequest {
        GatewayRequest::new("get_campaigns", Map::new())
    }

    #[tokio::test]
    async fn identical_reads_hit_upstream_once() {
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(test_config(), connector.clone());

        let first = dispatcher.dispatch_at(None, read_request(), 100).await.unwrap();
        let second = dispatcher.dispatch_at(None, read_request(), 110).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test]
    async fn cache_expires_after_ttl() {
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(test_config(), connector.clone());

        dispatcher.dispatch_at(None, read_request(), 100).await.unwrap();
        // Default TTL is 300s; 301s later the entry has lapsed.
        dispatcher.dispatch_at(None, read_request(), 401).await.unwrap();

        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn different_parameters_miss_the_cache() {
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(test_config(), connector.clone());

        dispatcher.dispatch_at(None, read_request(), 100).await.unwrap();
        let params = match json!({"limit": 5}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        dispatcher
            .dispatch_at(None, GatewayRequest::new("get_campaigns", params), 101)
            .await
            .unwrap();

        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn mutating_operations_bypass_the_cache() {
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(test_config(), connector.clone());

        let params = match json!({"name": "n", "objective": "o", "status": "active"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        for t in 0..3 {
            dispatcher
                .dispatch_at(
                    None,
                    GatewayRequest::new("create_campaign", params.clone()),
                    100 + t,
                )
                .await
                .unwrap();
        }
        assert_eq!(connector.calls(), 3);
    }

    #[tokio::test]
    async fn rate_limit_rejection_carries_retry_after() {
        let mut config = test_config();
        config.rate_limit.max_requests = 2;
        config.rate_limit.window_secs = 60;
        config.cache.enabled = false;
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(config, connector.clone());

        dispatcher.dispatch_at(None, read_request(), 0).await.unwrap();
        dispatcher.dispatch_at(None, read_request(), 1).await.unwrap();
        let err = dispatcher
            .dispatch_at(None, read_request(), 10)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_code(), "rate_limited");
        assert_eq!(err.retry_after(), Some(50));
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn upstream_failures_are_wrapped() {
        let connector = Arc::new(ScriptedConnector::failing());
        let dispatcher = dispatcher_with(test_config(), connector.clone());

        let err = dispatcher
            .dispatch_at(None, read_request(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "upstream_error");
        assert!(err.to_string().contains("account unavailable"));

        // Errors are never cached: the next call reaches upstream again.
        dispatcher
            .dispatch_at(None, read_request(), 1)
            .await
            .unwrap_err();
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected_before_upstream() {
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(test_config(), connector.clone());

        let err = dispatcher
            .dispatch_at(None, GatewayRequest::new("drop_tables", Map::new()), 0)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "unsupported_operation");
        assert_eq!(connector.calls(), 0);
    }

    #[tokio::test]
    async fn auth_errors_map_to_distinct_codes() {
        let mut config = test_config();
        config.auth.enabled = true;
        config.auth.secret = "secret".to_string();
        let dispatcher = dispatcher_with(config.clone(), Arc::new(ScriptedConnector::new()));

        let err = dispatcher
            .dispatch_at(None, read_request(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "missing_token");

        let err = dispatcher
            .dispatch_at(Some("garbage"), read_request(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "token_malformed");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let validator = TokenValidator::from_config(&config.auth);
        let expired = validator.issue("alice", &[], 0).unwrap();
        let err = dispatcher
            .dispatch_at(Some(&expired), read_request(), 1_000_000)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "token_expired");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_partitions_cache_by_subject() {
        let mut config = test_config();
        config.auth.enabled = true;
        config.auth.secret = "secret".to_string();
        let connector = Arc::new(ScriptedConnector::new());
        let dispatcher = dispatcher_with(config.clone(), connector.clone());

        let validator = TokenValidator::from_config(&config.auth);
        let alice = validator.issue("alice", &[], 0).unwrap();
        let bob = validator.issue("bob", &[], 0).unwrap();

        dispatcher
            .dispatch_at(Some(&alice), read_request(), 10)
            .await
            .unwrap();
        dispatcher
            .dispatch_at(Some(&bob), read_request(), 11)
            .await
            .unwrap();

        assert_eq!(connector.calls(), 2);
    }
}
