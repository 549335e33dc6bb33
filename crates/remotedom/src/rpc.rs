// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name-keyed tables of RPC handlers.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::app::Application;
use crate::error::CoreError;
use crate::id::SessionId;
use crate::session::SessionCx;

/// Future returned by an RPC handler.
pub type RpcFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Arguments of one RPC invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcInvocation {
    /// Session that issued the call. For browser calls this is the session itself.
    pub caller: SessionId,
    pub args: Vec<String>,
}

type Handler<A> = Arc<
    dyn for<'a> Fn(&'a mut A, &'a mut SessionCx<A>, RpcInvocation) -> RpcFuture<'a> + Send + Sync,
>;

/// Which way calls in a registry travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Called by the browser, served by the session's application.
    Inbound,
    /// Called by one session's server code against other sessions.
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Append-only table of RPC handlers, filled before the hub is built.
pub struct RpcRegistry<A> {
    direction: Direction,
    handlers: HashMap<String, Handler<A>>,
}

impl<A: Application> RpcRegistry<A> {
    pub fn new(direction: Direction) -> Self {
        Self { direction, handlers: HashMap::new() }
    }

    /// Register `handler` under `name`. A name can only be registered once.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> Result<(), CoreError>
    where
        F: for<'a> Fn(&'a mut A, &'a mut SessionCx<A>, RpcInvocation) -> RpcFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            tracing::error!(direction = self.direction.as_str(), rpc = %name, "duplicate rpc registration");
            return Err(CoreError::DuplicateName(name));
        }
        tracing::debug!(direction = self.direction.as_str(), rpc = %name, "registered rpc function");
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) async fn invoke(
        &self,
        name: &str,
        app: &mut A,
        cx: &mut SessionCx<A>,
        invocation: RpcInvocation,
    ) -> Result<(), CoreError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| CoreError::UnknownRpcFunction(name.to_owned()))?;
        tracing::debug!(
            session_id = %cx.id(),
            direction = self.direction.as_str(),
            rpc = name,
            args = ?invocation.args,
            "calling rpc function"
        );
        handler(app, cx, invocation).await.map_err(|e| CoreError::hook("rpc", e))
    }
}
