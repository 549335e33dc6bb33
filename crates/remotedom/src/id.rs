// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one connected session, formatted `s<counter>p<pid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Hands out process-unique session IDs.
///
/// The counter only moves forward, so an ID is never reused after its session
/// closes. The pid salt keeps IDs from concurrent processes on one host apart.
#[derive(Debug)]
pub struct SessionIdGenerator {
    counter: AtomicU64,
    pid: u32,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::with_pid(std::process::id())
    }

    pub fn with_pid(pid: u32) -> Self {
        Self { counter: AtomicU64::new(0), pid }
    }

    pub fn next_id(&self) -> SessionId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        SessionId(format!("s{n}p{}", self.pid))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
