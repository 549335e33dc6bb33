// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hooks an application implements to drive a session.

use async_trait::async_trait;

use crate::id::SessionId;
use crate::session::SessionCx;

/// Per-session application object.
///
/// One value is created for every connection and lives on that session's
/// task. Hooks write mutations into [`SessionCx::document`]; the core flushes
/// them to the browser after each hook returns.
#[async_trait]
pub trait Application: Sized + Send + 'static {
    /// Consume the first message of the session.
    ///
    /// The session counts as initialized afterwards even if this fails.
    async fn initialize(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()>;

    /// Handle a `msg: ` frame. The text arrives verbatim, prefix included.
    async fn on_message(&mut self, cx: &mut SessionCx<Self>, message: &str) -> anyhow::Result<()> {
        let _ = (cx, message);
        Ok(())
    }

    /// Handle text another session sent with [`SessionCx::send_to_sessions`].
    async fn on_peer_message(
        &mut self,
        cx: &mut SessionCx<Self>,
        sender: &SessionId,
        message: &str,
    ) -> anyhow::Result<()> {
        let _ = (cx, sender, message);
        Ok(())
    }

    /// Close capability, if the application wants to know about disconnects.
    fn closable(&mut self) -> Option<&mut dyn Closable<Self>> {
        None
    }
}

/// Optional capability run once the session has left the registry.
///
/// The session can still reach its peers through `cx`, but nothing it writes
/// to its own document is flushed.
#[async_trait]
pub trait Closable<A>: Send {
    async fn on_close(&mut self, cx: &mut SessionCx<A>) -> anyhow::Result<()>;
}
