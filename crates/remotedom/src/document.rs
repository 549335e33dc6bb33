// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session buffer of pending DOM mutation instructions.

/// Accumulates encoded mutations until the next flush.
///
/// The encoding is owned by the application; the buffer only concatenates.
#[derive(Debug, Default)]
pub struct RemoteDocument {
    pending: Vec<String>,
}

impl RemoteDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one mutation. Empty strings are ignored.
    pub fn append(&mut self, mutation: impl Into<String>) {
        let mutation = mutation.into();
        if !mutation.is_empty() {
            self.pending.push(mutation);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of mutations waiting for the next flush.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drain every pending mutation as one string, oldest first.
    pub fn pop_all(&mut self) -> String {
        std::mem::take(&mut self.pending).concat()
    }
}
