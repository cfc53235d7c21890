//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with the envelope and health endpoints
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit)
//! - Hold the swappable configuration snapshot and dispatcher
//! - Serve with graceful shutdown

use arc_swap::ArcSwap;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::GatewayConfig;
use crate::connector::AdsConnector;
use crate::gateway::dispatcher::{Dispatcher, GatewayError};
use crate::gateway::envelope::{GatewayRequest, GatewayResponse};
use crate::http::request::{request_id, MakeGatewayRequestId};
use crate::observability::metrics;

/// Application state injected into handlers.
///
/// The config snapshot and the dispatcher built from it are swapped
/// wholesale on reload; in-flight requests keep the snapshot they loaded.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<GatewayConfig>>,
    pub dispatcher: Arc<ArcSwap<Dispatcher>>,
    connector: Arc<dyn AdsConnector>,
}

impl AppState {
    pub fn new(config: GatewayConfig, connector: Arc<dyn AdsConnector>) -> Self {
        let dispatcher = Dispatcher::new(&config, connector.clone());
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            dispatcher: Arc::new(ArcSwap::from_pointee(dispatcher)),
            connector,
        }
    }

    /// Replace the snapshot and rebuild the dispatcher from it. Rate
    /// windows and cache entries start fresh.
    pub fn reload(&self, config: GatewayConfig) {
        self.dispatcher
            .store(Arc::new(Dispatcher::new(&config, self.connector.clone())));
        self.config.store(Arc::new(config));
        tracing::info!("Configuration snapshot replaced");
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server. Layer-level settings (body limit, CORS,
    /// timeout) come from the startup snapshot and need a restart to
    /// change.
    pub fn new(config: &GatewayConfig, state: AppState) -> Self {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeGatewayRequestId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(build_cors(&config.security.cors_origins))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(DefaultBodyLimit::max(config.security.max_request_size));

        let router = Router::new()
            .route("/api/v1/meta-ads", post(meta_ads_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(middleware);

        Self { router }
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        tracing::info!(address = %listener.local_addr()?, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Main envelope handler: extract the bearer credential, dispatch, and
/// wrap the outcome. Body-limit and parse failures surface through the
/// rejection so even those return the envelope shape.
async fn meta_ads_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GatewayRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let error = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                GatewayError::RequestTooLarge
            } else {
                GatewayError::BadRequest(rejection.body_text())
            };
            tracing::warn!(request_id = %request_id, error = %error, "Rejected request body");
            metrics::record_request("invalid", error.status().as_u16(), start);
            return error.into_response();
        }
    };

    let operation = request.operation.clone();
    tracing::debug!(request_id = %request_id, operation = %operation, "Dispatching gateway request");

    let bearer = bearer_token(&headers);
    let dispatcher = state.dispatcher.load_full();
    match dispatcher.dispatch(bearer.as_deref(), request).await {
        Ok(data) => {
            metrics::record_request(&operation, StatusCode::OK.as_u16(), start);
            (StatusCode::OK, Json(GatewayResponse::success(data))).into_response()
        }
        Err(error) => {
            tracing::warn!(
                request_id = %request_id,
                operation = %operation,
                error = %error,
                "Gateway request failed"
            );
            metrics::record_request(&operation, error.status().as_u16(), start);
            error.into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = state.config.load();
    Json(json!({
        "status": "ok",
        "message": "Meta Ads gateway is running",
        "environment": config.environment,
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::X_REQUEST_ID;

    #[test]
    fn bearer_token_strips_the_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("bearer xyz"),
        );
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_foreign_auth_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn request_id_falls_back_to_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");

        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("req-1"));
        assert_eq!(request_id(&headers), "req-1");
    }
}
