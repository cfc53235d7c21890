//! Meta Ads Protocol Gateway Library

pub mod auth;
pub mod cache;
pub mod config;
pub mod connector;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use gateway::dispatcher::Dispatcher;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
