// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport.

pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::app::Application;
use crate::config::ServerConfig;
use crate::hub::Hub;

/// Build the axum `Router` for a hub.
pub fn build_router<A: Application>(hub: Arc<Hub<A>>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(http::health::<A>))
        .route(&config.ws_route(), get(ws::ws_handler::<A>))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// Bind `config.addr()` and serve until `shutdown` fires.
pub async fn serve<A: Application>(
    hub: Arc<Hub<A>>,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("remotedom listening on {addr}");
    serve_listener(listener, hub, config, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` fires.
pub async fn serve_listener<A: Application>(
    listener: TcpListener,
    hub: Arc<Hub<A>>,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = build_router(hub, config);
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
