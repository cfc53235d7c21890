//! Shared utilities for integration testing.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use meta_ads_gateway::connector::{AdsConnector, UpstreamError};
use meta_ads_gateway::gateway::Operation;
use meta_ads_gateway::{AppState, GatewayConfig, HttpServer, Shutdown};

/// Connector double that counts upstream calls and echoes the operation.
pub struct MockConnector {
    calls: AtomicU32,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdsConnector for MockConnector {
    async fn execute(
        &self,
        operation: Operation,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match operation {
            Operation::GetCampaigns => Ok(json!({
                "campaigns": [{"id": "1", "name": "Summer Sale"}],
                "count": 1,
                "call": call,
            })),
            Operation::CreateCampaign => Ok(json!({
                "campaign": {"id": "2", "name": params.get("name")},
                "success": true,
                "call": call,
            })),
            _ => Ok(json!({"operation": operation.name(), "call": call})),
        }
    }
}

/// Gateway config suitable for tests: auth off, generous limits.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.enabled = false;
    config.auth.secret = "integration-test-secret".to_string();
    config
}

/// Bind the gateway on an ephemeral port and serve it in the background.
pub async fn spawn_gateway(
    config: GatewayConfig,
    connector: Arc<dyn AdsConnector>,
) -> (SocketAddr, Shutdown) {
    let state = AppState::new(config.clone(), connector);
    let server = HttpServer::new(&config, state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("failed to build test client")
}
