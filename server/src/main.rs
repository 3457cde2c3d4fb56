//! Parlor lobby service.
//!
//! Clients connect over `/ws`, join rooms by code, and play through JSON
//! events. Room and game state live in [`parlor_engine`]; this binary wires
//! the transport, rate limiting, and configuration around it.

mod config;
mod connection;
mod dispatch;
mod rate_limit;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tracing::info;

use parlor_engine::{GameRegistry, InMemoryLedger, Lobby};

use crate::config::ServerConfig;
use crate::connection::ConnectionRegistry;
use crate::dispatch::AppState;
use crate::rate_limit::CommandRateLimiter;
use crate::ws::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let ledger = Arc::new(InMemoryLedger::new(config.starting_balance));
    let lobby = Arc::new(Lobby::new(GameRegistry::default(), ledger));
    let state = AppState {
        lobby,
        connections: Arc::new(ConnectionRegistry::default()),
        limiter: Arc::new(CommandRateLimiter::new(
            config.commands_per_second,
            config.command_burst,
        )),
        reveal_delay: Duration::from_millis(config.reveal_delay_ms),
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen addr")?;
    info!(%addr, "parlor lobby listening");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}
