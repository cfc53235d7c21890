//! Meta Ads Protocol Gateway
//!
//! A request gateway that lets AI models invoke Meta Ads operations
//! through a standardized envelope, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                  GATEWAY                      │
//!                       │                                               │
//!   POST /api/v1/       │  ┌────────┐   ┌────────┐   ┌─────────────┐   │
//!   meta-ads ───────────┼─▶│  http  │──▶│  auth  │──▶│ rate limiter │  │
//!                       │  │ server │   │ token  │   └──────┬──────┘   │
//!                       │  └────────┘   └────────┘          │          │
//!                       │                                   ▼          │
//!                       │                    ┌──────────────────────┐  │
//!                       │                    │   response cache     │  │
//!                       │                    │  (read operations)   │  │
//!                       │                    └──────────┬───────────┘  │
//!                       │                       miss │  │ hit          │
//!                       │                            ▼  │              │
//!   JSON envelope       │  ┌────────┐   ┌──────────────┴───────────┐  │
//!   ◀───────────────────┼──│envelope│◀──│   Meta Ads connector     │◀─┼── Graph API
//!                       │  └────────┘   └──────────────────────────┘  │
//!                       │                                               │
//!                       │  config snapshot · logging · metrics ·        │
//!                       │  lifecycle (signals, graceful shutdown)       │
//!                       └──────────────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::net::TcpListener;

use meta_ads_gateway::config::loader;
use meta_ads_gateway::connector::{AdsConnector, MetaAdsConnector};
use meta_ads_gateway::gateway::unix_now;
use meta_ads_gateway::lifecycle::{signals, Shutdown};
use meta_ads_gateway::observability::{logging, metrics};
use meta_ads_gateway::{AppState, GatewayConfig, HttpServer};

#[derive(Parser)]
#[command(name = "meta-ads-gateway")]
#[command(about = "Protocol gateway for Meta Ads operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve,
    /// Mint a signed bearer token against the configured secret
    Token {
        /// Subject claim for the token
        #[arg(short, long)]
        subject: String,

        /// Comma-separated scopes
        #[arg(long, value_delimiter = ',', default_value = "read")]
        scopes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match loader::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Token { subject, scopes } => mint_token(&config, &subject, &scopes),
    }
}

async fn serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&config)?;

    tracing::info!(
        environment = %config.environment,
        bind_address = %config.server.bind_address(),
        auth_enabled = config.auth.enabled,
        rate_limit_enabled = config.rate_limit.enabled,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let connector: Arc<dyn AdsConnector> = Arc::new(MetaAdsConnector::new(config.meta.clone()));
    let state = AppState::new(config.clone(), connector);

    let listener = TcpListener::bind(config.server.bind_address()).await?;

    let shutdown = Shutdown::new();
    let mut reload_rx = signals::install(&shutdown);
    if config.server.reload {
        let reload_state = state.clone();
        tokio::spawn(async move {
            while reload_rx.recv().await.is_some() {
                match loader::from_env() {
                    Ok(fresh) => reload_state.reload(fresh),
                    Err(e) => {
                        tracing::error!(error = %e, "Config reload failed, keeping previous snapshot");
                    }
                }
            }
        });
    }

    let server = HttpServer::new(&config, state);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn mint_token(
    config: &GatewayConfig,
    subject: &str,
    scopes: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let validator = meta_ads_gateway::auth::TokenValidator::from_config(&config.auth);
    let token = validator.issue(subject, scopes, unix_now())?;
    println!("{token}");
    Ok(())
}
