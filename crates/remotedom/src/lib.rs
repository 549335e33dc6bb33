// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remotedom: session registry, RPC framing, and mutation flush cycle for a
//! server-driven browser UI.

pub mod app;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod hub;
pub mod id;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub use crate::app::{Application, Closable};
pub use crate::config::ServerConfig;
pub use crate::document::RemoteDocument;
pub use crate::error::CoreError;
pub use crate::hub::{Hub, HubBuilder};
pub use crate::id::SessionId;
pub use crate::rpc::{RpcFuture, RpcInvocation};
pub use crate::session::{SessionCx, SessionHandle};

/// Initialize tracing/logging from config.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(config: &ServerConfig) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// Run the server until SIGTERM or SIGINT.
pub async fn run<A: Application>(config: ServerConfig, hub: Arc<Hub<A>>) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());
    transport::serve(hub, &config, shutdown).await
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                tracing::info!("received SIGTERM");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                tracing::info!("received SIGINT");
            }
        }
        shutdown.cancel();
    });
}
