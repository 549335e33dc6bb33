// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-scoped server state: ID generator, session registry, and both RPC
//! registries, built once at startup and shared by every connection.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app::Application;
use crate::error::CoreError;
use crate::id::{SessionId, SessionIdGenerator};
use crate::registry::{Peer, SessionRegistry};
use crate::rpc::{Direction, RpcFuture, RpcInvocation, RpcRegistry};
use crate::session::{SessionCx, SessionHandle, SessionTask};

/// Default capacity of a session's outbound frame queue.
pub const DEFAULT_FRAME_CAPACITY: usize = 256;

type Factory<A> = Box<dyn Fn() -> A + Send + Sync>;

/// Shared state for every session of one application.
pub struct Hub<A> {
    ids: SessionIdGenerator,
    registry: Arc<SessionRegistry>,
    inbound: RpcRegistry<A>,
    outbound: RpcRegistry<A>,
    factory: Factory<A>,
    frame_capacity: usize,
}

impl<A: Application> Hub<A> {
    /// Start configuring a hub whose sessions run applications made by `factory`.
    pub fn builder(factory: impl Fn() -> A + Send + Sync + 'static) -> HubBuilder<A> {
        HubBuilder::new(factory)
    }

    /// Open a session: allocate its ID, register it, and start its task.
    ///
    /// Returns the connection-side handle and the queue of outbound frames the
    /// transport must write to the browser.
    pub async fn open(self: &Arc<Self>) -> (SessionHandle, mpsc::Receiver<String>) {
        let id = self.ids.next_id();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::channel(self.frame_capacity.max(1));
        let closed = Arc::new(AtomicBool::new(false));

        self.registry
            .insert(Peer { id: id.clone(), events: events_tx.clone(), closed: Arc::clone(&closed) })
            .await;
        tracing::info!(session_id = %id, "session opened");

        let cx = SessionCx::new(id, Arc::clone(self));
        let handle = SessionTask::spawn((self.factory)(), cx, events_tx, events_rx, closed, frames_tx);
        (handle, frames_rx)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub(crate) fn registry_handle(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn inbound(&self) -> &RpcRegistry<A> {
        &self.inbound
    }

    pub fn outbound(&self) -> &RpcRegistry<A> {
        &self.outbound
    }

    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.registry.ids().await
    }
}

/// Startup-time configuration of a [`Hub`]. Registries freeze on [`HubBuilder::build`].
pub struct HubBuilder<A> {
    ids: SessionIdGenerator,
    inbound: RpcRegistry<A>,
    outbound: RpcRegistry<A>,
    factory: Factory<A>,
    frame_capacity: usize,
}

impl<A: Application> HubBuilder<A> {
    pub fn new(factory: impl Fn() -> A + Send + Sync + 'static) -> Self {
        Self {
            ids: SessionIdGenerator::new(),
            inbound: RpcRegistry::new(Direction::Inbound),
            outbound: RpcRegistry::new(Direction::Outbound),
            factory: Box::new(factory),
            frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }

    /// Register a function the browser can call with an `rpc: ` frame.
    pub fn register_inbound<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, CoreError>
    where
        F: for<'a> Fn(&'a mut A, &'a mut SessionCx<A>, RpcInvocation) -> RpcFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.inbound.register(name, handler)?;
        Ok(self)
    }

    /// Register a function sessions can call on each other with
    /// [`SessionCx::rpc_to_sessions`].
    pub fn register_outbound<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, CoreError>
    where
        F: for<'a> Fn(&'a mut A, &'a mut SessionCx<A>, RpcInvocation) -> RpcFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.outbound.register(name, handler)?;
        Ok(self)
    }

    /// Replace the ID generator, e.g. to pin the pid salt.
    pub fn id_generator(mut self, ids: SessionIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Capacity of each session's outbound frame queue.
    pub fn frame_capacity(mut self, capacity: usize) -> Self {
        self.frame_capacity = capacity;
        self
    }

    pub fn build(self) -> Arc<Hub<A>> {
        tracing::info!(
            inbound = ?self.inbound.names(),
            outbound = ?self.outbound.names(),
            "rpc registries frozen"
        );
        Arc::new(Hub {
            ids: self.ids,
            registry: Arc::new(SessionRegistry::new()),
            inbound: self.inbound,
            outbound: self.outbound,
            factory: self.factory,
            frame_capacity: self.frame_capacity,
        })
    }
}
