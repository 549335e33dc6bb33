// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording application and RPC handlers shared by unit tests.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::app::{Application, Closable};
use crate::hub::{Hub, HubBuilder};
use crate::id::{SessionId, SessionIdGenerator};
use crate::rpc::{RpcFuture, RpcInvocation};
use crate::session::{SessionCx, SessionHandle};

/// Writes one mutation per hook call so tests can read behaviour off frames.
#[derive(Default)]
pub(crate) struct Recorder {
    /// Each closed session with whether it was still registered in its hook.
    pub closed: Arc<Mutex<Vec<(SessionId, bool)>>>,
    pub fail_close: bool,
    /// Broadcast `bye` to the remaining sessions on close.
    pub farewell: bool,
}

#[async_trait]
impl Application for Recorder {
    async fn initialize(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        if message == "boom" {
            anyhow::bail!("bootstrap rejected");
        }
        cx.document().append(format!("init:{message}"));
        Ok(())
    }

    async fn on_message(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        if message == "msg: fail" {
            anyhow::bail!("message rejected");
        }
        cx.document().append(format!("msg:{message}"));
        Ok(())
    }

    async fn on_peer_message(
        &mut self,
        cx: &mut SessionCx<Self>,
        sender: &SessionId,
        message: &str,
    ) -> anyhow::Result<()> {
        cx.document().append(format!("peer:{sender}:{message}"));
        Ok(())
    }

    fn closable(&mut self) -> Option<&mut dyn Closable<Self>> {
        Some(self)
    }
}

#[async_trait]
impl Closable<Recorder> for Recorder {
    async fn on_close(&mut self, cx: &mut SessionCx<Recorder>) -> anyhow::Result<()> {
        let registered = cx.hub().registry().contains(cx.id().as_str()).await;
        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((cx.id().clone(), registered));
        if self.farewell {
            cx.send_to_sessions("bye", false, None).await;
        }
        if self.fail_close {
            anyhow::bail!("close rejected");
        }
        Ok(())
    }
}

fn echo<'a>(_: &'a mut Recorder, cx: &'a mut SessionCx<Recorder>, call: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        cx.document().append(format!("echo:{}:{}", call.caller, call.args.join("|")));
        Ok(())
    })
}

pub(crate) fn twice<'a>(_: &'a mut Recorder, cx: &'a mut SessionCx<Recorder>, _: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        cx.document().append("a");
        cx.document().append("b");
        Ok(())
    })
}

/// Args: message, include_self ("1" or "0"), then optional target IDs.
fn broadcast<'a>(
    _: &'a mut Recorder,
    cx: &'a mut SessionCx<Recorder>,
    call: RpcInvocation,
) -> RpcFuture<'a> {
    Box::pin(async move {
        let [message, include_self, targets @ ..] = call.args.as_slice() else {
            anyhow::bail!("broadcast takes a message and an include_self flag");
        };
        let targets: Vec<SessionId> = targets.iter().map(|t| SessionId::from(t.as_str())).collect();
        let targets = (!targets.is_empty()).then_some(targets.as_slice());
        let sent = cx.send_to_sessions(message, include_self.as_str() == "1", targets).await;
        cx.document().append(format!("sent:{sent}"));
        Ok(())
    })
}

/// Args: outbound function name, then its arguments.
fn call_peers<'a>(
    _: &'a mut Recorder,
    cx: &'a mut SessionCx<Recorder>,
    call: RpcInvocation,
) -> RpcFuture<'a> {
    Box::pin(async move {
        let mut args = call.args.into_iter();
        let function = args.next().unwrap_or_default();
        match cx.rpc_to_sessions(&function, args.collect(), false, None).await {
            Ok(called) => cx.document().append(format!("called:{called}")),
            Err(e) => cx.document().append(format!("err:{}", e.as_str())),
        }
        Ok(())
    })
}

fn fail<'a>(_: &'a mut Recorder, cx: &'a mut SessionCx<Recorder>, _: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        cx.document().append("partial");
        anyhow::bail!("handler failed")
    })
}

fn notify<'a>(_: &'a mut Recorder, cx: &'a mut SessionCx<Recorder>, call: RpcInvocation) -> RpcFuture<'a> {
    Box::pin(async move {
        cx.document().append(format!("notify:{}:{}", call.caller, call.args.join("|")));
        Ok(())
    })
}

pub(crate) fn builder(
    factory: impl Fn() -> Recorder + Send + Sync + 'static,
) -> anyhow::Result<HubBuilder<Recorder>> {
    let mut builder = Hub::builder(factory).id_generator(SessionIdGenerator::with_pid(7));
    builder
        .register_inbound("echo", echo)?
        .register_inbound("twice", twice)?
        .register_inbound("broadcast", broadcast)?
        .register_inbound("call_peers", call_peers)?
        .register_inbound("fail", fail)?
        .register_outbound("notify", notify)?;
    Ok(builder)
}

pub(crate) fn hub() -> anyhow::Result<Arc<Hub<Recorder>>> {
    Ok(builder(Recorder::default)?.build())
}

pub(crate) async fn next_frame(frames: &mut mpsc::Receiver<String>) -> anyhow::Result<String> {
    tokio::time::timeout(Duration::from_secs(2), frames.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("frame queue closed"))
}

/// Open a session and push it past bootstrap.
pub(crate) async fn open_initialized(
    hub: &Arc<Hub<Recorder>>,
) -> anyhow::Result<(SessionHandle, mpsc::Receiver<String>)> {
    let (session, mut frames) = hub.open().await;
    session.deliver("boot")?;
    anyhow::ensure!(next_frame(&mut frames).await? == "init:boot");
    Ok((session, frames))
}
