// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of open sessions and the fan-out primitive built on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{mpsc, RwLock};

use crate::id::SessionId;
use crate::session::SessionEvent;

/// Registry-side view of a session: its event queue and closed flag.
#[derive(Clone)]
pub(crate) struct Peer {
    pub id: SessionId,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub closed: Arc<AtomicBool>,
}

/// Open sessions keyed by ID, iterated in connection order.
///
/// A session is present exactly while its connection is open. Removal flips
/// the session's closed flag under the write lock, so a fan-out never sees a
/// half-closed entry.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<IndexMap<SessionId, Peer>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, peer: Peer) {
        self.sessions.write().await.insert(peer.id.clone(), peer);
    }

    /// Mark the session closed and drop it. Returns false if it was already gone.
    pub(crate) async fn remove(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.shift_remove(id) {
            Some(peer) => {
                peer.closed.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Snapshot of registered IDs in iteration order.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Queue one event per target and return how many were queued.
    ///
    /// Targets default to every registered session. The sender is skipped
    /// unless `include_self`. Unknown, closed, or dead targets are skipped.
    pub(crate) async fn fan_out(
        &self,
        sender: &SessionId,
        include_self: bool,
        targets: Option<&[SessionId]>,
        make_event: impl Fn() -> SessionEvent,
    ) -> usize {
        let sessions = self.sessions.read().await;
        let ids: Vec<&SessionId> = match targets {
            Some(targets) => targets.iter().collect(),
            None => sessions.keys().collect(),
        };
        tracing::debug!(
            session_id = %sender,
            registered = sessions.len(),
            targets = ids.len(),
            "fanning out to sessions"
        );

        let mut queued = 0;
        for id in ids {
            if id == sender && !include_self {
                continue;
            }
            let Some(peer) = sessions.get(id) else {
                tracing::debug!(session_id = %sender, peer = %id, "target session gone, skipping");
                continue;
            };
            if peer.closed.load(Ordering::Acquire) {
                continue;
            }
            if peer.events.send(make_event()).is_err() {
                tracing::debug!(session_id = %sender, peer = %id, "target queue closed, skipping");
                continue;
            }
            queued += 1;
        }
        queued
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
