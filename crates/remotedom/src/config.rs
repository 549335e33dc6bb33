// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the remotedom server.
#[derive(Debug, Clone, clap::Args)]
pub struct ServerConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "REMOTEDOM_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "REMOTEDOM_PORT")]
    pub port: u16,

    /// Path of the WebSocket endpoint browsers connect to.
    #[arg(long, default_value = "/websocket", env = "REMOTEDOM_WS_PATH")]
    pub ws_path: String,

    /// Outbound frames buffered per session before flushes wait on the socket.
    #[arg(long, default_value_t = 256, env = "REMOTEDOM_OUTBOUND_QUEUE")]
    pub outbound_queue: usize,

    /// Log format (json or text).
    #[arg(long, default_value = "text", env = "REMOTEDOM_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "REMOTEDOM_LOG_LEVEL")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket route, always rooted at `/`.
    pub fn ws_route(&self) -> String {
        if self.ws_path.starts_with('/') {
            self.ws_path.clone()
        } else {
            format!("/{}", self.ws_path)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            ws_path: "/websocket".to_owned(),
            outbound_queue: crate::hub::DEFAULT_FRAME_CAPACITY,
            log_format: "text".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}
