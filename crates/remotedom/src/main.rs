// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo server: a shared chat log rendered into every connected tab.

use async_trait::async_trait;
use clap::Parser;
use tracing::error;

use remotedom::codec::MSG_PREFIX;
use remotedom::{
    Application, Closable, CoreError, Hub, HubBuilder, RpcFuture, RpcInvocation, ServerConfig,
    SessionCx, SessionId,
};

#[derive(Debug, Parser)]
#[command(name = "remotedom", version, about = "Server-driven UI session server")]
struct Cli {
    #[command(flatten)]
    server: ServerConfig,
}

#[derive(Default)]
struct Chat {
    nick: String,
}

#[async_trait]
impl Application for Chat {
    async fn initialize(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        self.nick = match message.trim() {
            "" => cx.id().to_string(),
            nick => nick.to_owned(),
        };
        cx.document().append(format!("title {}\n", self.nick));
        Ok(())
    }

    async fn on_message(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        let text = message.strip_prefix(MSG_PREFIX).unwrap_or(message);
        cx.send_to_sessions(&format!("{}: {text}", self.nick), true, None).await;
        Ok(())
    }

    async fn on_peer_message(
        &mut self,
        cx: &mut SessionCx<Self>,
        _sender: &SessionId,
        message: &str,
    ) -> anyhow::Result<()> {
        cx.document().append(format!("line {message}\n"));
        Ok(())
    }

    fn closable(&mut self) -> Option<&mut dyn Closable<Self>> {
        Some(self)
    }
}

#[async_trait]
impl Closable<Chat> for Chat {
    async fn on_close(&mut self, cx: &mut SessionCx<Chat>) -> anyhow::Result<()> {
        tracing::info!(session_id = %cx.id(), nick = %self.nick, "chat member left");
        cx.send_to_sessions(&format!("{} left", self.nick), false, None).await;
        Ok(())
    }
}

/// `rename(nick)` from the browser: adopt the nick and tell everyone else.
fn rename<'a>(chat: &'a mut Chat, cx: &'a mut SessionCx<Chat>, call: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        let nick = call.args.into_iter().next().unwrap_or_default();
        if nick.is_empty() {
            anyhow::bail!("rename needs a nick");
        }
        let old = std::mem::replace(&mut chat.nick, nick.clone());
        cx.document().append(format!("title {nick}\n"));
        cx.rpc_to_sessions("renamed", vec![old, nick], false, None).await?;
        Ok(())
    })
}

/// `renamed(old, new)` between sessions.
fn renamed<'a>(_: &'a mut Chat, cx: &'a mut SessionCx<Chat>, call: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        if let [old, new] = call.args.as_slice() {
            cx.document().append(format!("line {old} is now {new}\n"));
        }
        Ok(())
    })
}

fn configure(builder: &mut HubBuilder<Chat>) -> Result<(), CoreError> {
    builder.register_inbound("rename", rename)?.register_outbound("renamed", renamed)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    remotedom::init_tracing(&cli.server);

    let mut builder = Hub::builder(Chat::default).frame_capacity(cli.server.outbound_queue);
    if let Err(e) = configure(&mut builder) {
        error!("fatal: {e}");
        std::process::exit(1);
    }

    if let Err(e) = remotedom::run(cli.server, builder.build()).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
