// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session protocol state machine and flush cycle.
//!
//! Every session runs one task that owns the application object and the
//! document buffer. Inbound frames, peer messages and peer RPCs all arrive on
//! the task's queue and are handled strictly in order, each followed by a
//! flush before the next event is taken.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::Application;
use crate::codec::{self, MSG_PREFIX, RPC_PREFIX};
use crate::document::RemoteDocument;
use crate::error::CoreError;
use crate::hub::Hub;
use crate::id::SessionId;
use crate::registry::SessionRegistry;
use crate::rpc::RpcInvocation;

/// Work queued for a session task.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Inbound(String),
    Peer { sender: SessionId, message: String },
    Rpc { sender: SessionId, function: String, args: Vec<String> },
    Close,
}

/// What application hooks see of their session.
pub struct SessionCx<A> {
    id: SessionId,
    document: RemoteDocument,
    hub: Arc<Hub<A>>,
}

impl<A: Application> SessionCx<A> {
    pub(crate) fn new(id: SessionId, hub: Arc<Hub<A>>) -> Self {
        Self { id, document: RemoteDocument::new(), hub }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Buffer of mutations flushed to this session's browser.
    pub fn document(&mut self) -> &mut RemoteDocument {
        &mut self.document
    }

    pub fn hub(&self) -> &Arc<Hub<A>> {
        &self.hub
    }

    /// Deliver `message` to other sessions' peer-message hook.
    ///
    /// Targets default to every open session. Each target handles the message
    /// on its own task and flushes afterwards. Returns how many targets were
    /// reached; vanished targets are skipped.
    pub async fn send_to_sessions(
        &self,
        message: &str,
        include_self: bool,
        targets: Option<&[SessionId]>,
    ) -> usize {
        tracing::debug!(session_id = %self.id, text = message, "sending message to sessions");
        self.hub
            .registry()
            .fan_out(&self.id, include_self, targets, || SessionEvent::Peer {
                sender: self.id.clone(),
                message: message.to_owned(),
            })
            .await
    }

    /// Invoke an outbound RPC function against other sessions.
    ///
    /// Fails with [`CoreError::UnknownRpcFunction`] before anything is sent if
    /// `function` is not registered.
    pub async fn rpc_to_sessions(
        &self,
        function: &str,
        args: Vec<String>,
        include_self: bool,
        targets: Option<&[SessionId]>,
    ) -> Result<usize, CoreError> {
        if !self.hub.outbound().contains(function) {
            return Err(CoreError::UnknownRpcFunction(function.to_owned()));
        }
        tracing::debug!(session_id = %self.id, rpc = function, "sending rpc to sessions");
        Ok(self
            .hub
            .registry()
            .fan_out(&self.id, include_self, targets, || SessionEvent::Rpc {
                sender: self.id.clone(),
                function: function.to_owned(),
                args: args.clone(),
            })
            .await)
    }
}

/// Connection-side handle to a running session.
pub struct SessionHandle {
    id: SessionId,
    events: mpsc::UnboundedSender<SessionEvent>,
    closed: Arc<AtomicBool>,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queue an inbound text frame.
    pub fn deliver(&self, text: impl Into<String>) -> Result<(), CoreError> {
        if self.is_closed() {
            return Err(CoreError::Transport(format!("session {} is closed", self.id)));
        }
        self.events
            .send(SessionEvent::Inbound(text.into()))
            .map_err(|_| CoreError::Transport(format!("session {} task has stopped", self.id)))
    }

    /// Tear the session down and wait for its close hook to finish.
    ///
    /// The session leaves the registry before the close hook runs; events
    /// still queued are dropped and a flush blocked on a full frame queue is
    /// abandoned.
    pub async fn close(self) {
        self.registry.remove(&self.id).await;
        self.cancel.cancel();
        let _ = self.events.send(SessionEvent::Close);
        if let Err(e) = self.task.await {
            tracing::error!(session_id = %self.id, err = %e, "session task aborted");
        }
    }
}

/// Task side of a session.
pub(crate) struct SessionTask<A> {
    app: A,
    cx: SessionCx<A>,
    initialized: bool,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    frames: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl<A: Application> SessionTask<A> {
    /// Spawn the task for a session that is already in the registry.
    pub(crate) fn spawn(
        app: A,
        cx: SessionCx<A>,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        closed: Arc<AtomicBool>,
        frames: mpsc::Sender<String>,
    ) -> SessionHandle {
        let id = cx.id.clone();
        let registry = Arc::clone(cx.hub.registry_handle());
        let cancel = CancellationToken::new();
        let task = Self {
            app,
            cx,
            initialized: false,
            closed: Arc::clone(&closed),
            events,
            frames,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(task.run());
        SessionHandle { id, events: events_tx, closed, registry, cancel, task }
    }

    async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if matches!(event, SessionEvent::Close) {
                break;
            }
            if self.closed.load(Ordering::Acquire) {
                tracing::debug!(session_id = %self.cx.id, "dropping event for closed session");
                continue;
            }

            if let Err(e) = self.handle(event).await {
                tracing::warn!(session_id = %self.cx.id, code = e.as_str(), err = %e, "failed handling session event");
            }
            if let Err(e) = self.flush().await {
                tracing::warn!(session_id = %self.cx.id, code = e.as_str(), err = %e, "flush failed");
                if e.is_fatal() {
                    break;
                }
            }
        }
        self.finish().await;
    }

    async fn handle(&mut self, event: SessionEvent) -> Result<(), CoreError> {
        match event {
            SessionEvent::Inbound(text) => self.on_inbound(text).await,
            SessionEvent::Peer { sender, message } => self
                .app
                .on_peer_message(&mut self.cx, &sender, &message)
                .await
                .map_err(|e| CoreError::hook("peer message", e)),
            SessionEvent::Rpc { sender, function, args } => {
                let hub = Arc::clone(&self.cx.hub);
                let invocation = RpcInvocation { caller: sender, args };
                hub.outbound().invoke(&function, &mut self.app, &mut self.cx, invocation).await
            }
            SessionEvent::Close => Ok(()),
        }
    }

    async fn on_inbound(&mut self, text: String) -> Result<(), CoreError> {
        tracing::debug!(session_id = %self.cx.id, text = %text, "message received");

        if !self.initialized {
            let result = self.app.initialize(&mut self.cx, &text).await;
            // Flips even on failure so a bad bootstrap cannot wedge the session.
            self.initialized = true;
            return result.map_err(|e| CoreError::hook("initialize", e));
        }

        if let Some(payload) = text.strip_prefix(RPC_PREFIX) {
            let call = codec::decode(payload)?;
            let hub = Arc::clone(&self.cx.hub);
            let invocation = RpcInvocation { caller: self.cx.id.clone(), args: call.args };
            hub.inbound().invoke(&call.name, &mut self.app, &mut self.cx, invocation).await
        } else if text.starts_with(MSG_PREFIX) {
            self.app
                .on_message(&mut self.cx, &text)
                .await
                .map_err(|e| CoreError::hook("message", e))
        } else {
            tracing::debug!(session_id = %self.cx.id, "discarding message with unknown prefix");
            Ok(())
        }
    }

    /// Send every pending mutation as one frame. Nothing is sent when empty.
    async fn flush(&mut self) -> Result<(), CoreError> {
        let code = self.cx.document.pop_all();
        if code.is_empty() {
            tracing::trace!(session_id = %self.cx.id, "nothing to flush");
            return Ok(());
        }
        tracing::debug!(session_id = %self.cx.id, frame = %code, "flushing document");
        tokio::select! {
            sent = self.frames.send(code) => {
                sent.map_err(|_| CoreError::Transport("outbound frame channel closed".to_owned()))
            }
            _ = self.cancel.cancelled() => {
                Err(CoreError::Transport("session closed with a flush pending".to_owned()))
            }
        }
    }

    async fn finish(mut self) {
        let id = self.cx.id.clone();
        self.closed.store(true, Ordering::Release);
        self.cx.hub.registry().remove(&id).await;
        tracing::info!(session_id = %id, "session closed");

        if let Some(closable) = self.app.closable() {
            if let Err(e) = closable.on_close(&mut self.cx).await {
                let e = CoreError::hook("close", e);
                tracing::warn!(session_id = %id, code = e.as_str(), err = %e, "close hook failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
