// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests over a real WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use remotedom::codec::encode_frame;
use remotedom::transport::serve_listener;
use remotedom::{Application, Hub, RpcFuture, RpcInvocation, ServerConfig, SessionCx, SessionId};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct Board;

#[async_trait]
impl Application for Board {
    async fn initialize(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        let text = format!("hello {message} as {};", cx.id());
        cx.document().append(text);
        Ok(())
    }

    async fn on_message(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        cx.send_to_sessions(message, false, None).await;
        Ok(())
    }

    async fn on_peer_message(
        &mut self,
        cx: &mut SessionCx<Self>,
        sender: &SessionId,
        message: &str,
    ) -> anyhow::Result<()> {
        cx.document().append(format!("from {sender}: {message};"));
        Ok(())
    }
}

fn add<'a>(_: &'a mut Board, cx: &'a mut SessionCx<Board>, call: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        let mut sum = 0i64;
        for arg in &call.args {
            sum += arg.parse::<i64>()?;
        }
        cx.document().append(format!("sum {sum};"));
        Ok(())
    })
}

struct TestServer {
    url: String,
    hub: Arc<Hub<Board>>,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn start() -> anyhow::Result<TestServer> {
    let mut builder = Hub::builder(Board::default);
    builder.register_inbound("add", add)?;
    let hub = builder.build();

    let config = ServerConfig { port: 0, ..ServerConfig::default() };
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}{}", listener.local_addr()?, config.ws_route());
    let shutdown = CancellationToken::new();

    let server_hub = Arc::clone(&hub);
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = serve_listener(listener, server_hub, &config, server_shutdown).await;
    });
    Ok(TestServer { url, hub, shutdown })
}

async fn connect(server: &TestServer) -> anyhow::Result<Client> {
    let (client, _) = tokio_tungstenite::connect_async(server.url.as_str()).await?;
    Ok(client)
}

async fn recv_text(client: &mut Client) -> anyhow::Result<String> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("connection ended"))??;
        if let Message::Text(text) = msg {
            return Ok(text.as_str().to_owned());
        }
    }
}

async fn send_text(client: &mut Client, text: &str) -> anyhow::Result<()> {
    client.send(Message::Text(text.into())).await?;
    Ok(())
}

async fn wait_for_sessions(hub: &Hub<Board>, count: usize) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(2), async {
        while hub.session_count().await != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn bootstrap_and_inbound_rpc_round_trip() -> anyhow::Result<()> {
    let server = start().await?;
    let mut client = connect(&server).await?;

    send_text(&mut client, "alice").await?;
    let greeting = recv_text(&mut client).await?;
    assert!(greeting.starts_with("hello alice as s1p"), "{greeting}");

    send_text(&mut client, &encode_frame("add", &["2", "40"])).await?;
    assert_eq!(recv_text(&mut client).await?, "sum 42;");

    // Bad argument: the handler fails, the connection survives.
    send_text(&mut client, &encode_frame("add", &["x"])).await?;
    send_text(&mut client, &encode_frame("add", &["1"])).await?;
    assert_eq!(recv_text(&mut client).await?, "sum 1;");
    Ok(())
}

#[tokio::test]
async fn messages_fan_out_to_other_tabs() -> anyhow::Result<()> {
    let server = start().await?;
    let mut first = connect(&server).await?;
    send_text(&mut first, "a").await?;
    recv_text(&mut first).await?;
    let mut second = connect(&server).await?;
    send_text(&mut second, "b").await?;
    recv_text(&mut second).await?;
    wait_for_sessions(&server.hub, 2).await?;

    let ids = server.hub.session_ids().await;
    send_text(&mut first, "msg: hi").await?;
    assert_eq!(recv_text(&mut second).await?, format!("from {}: msg: hi;", ids[0]));
    Ok(())
}

#[tokio::test]
async fn disconnect_leaves_registry() -> anyhow::Result<()> {
    let server = start().await?;
    let mut client = connect(&server).await?;
    send_text(&mut client, "a").await?;
    recv_text(&mut client).await?;
    wait_for_sessions(&server.hub, 1).await?;

    client.close(None).await?;
    wait_for_sessions(&server.hub, 0).await?;
    Ok(())
}
