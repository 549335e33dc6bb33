// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failures raised while serving a session.
///
/// Everything except [`CoreError::Transport`] is recoverable: the connection
/// handler logs it and keeps the session open.
#[derive(Debug)]
pub enum CoreError {
    /// An `rpc: ` frame could not be decoded.
    MalformedRpcFrame(String),
    /// A call named a function missing from the relevant RPC registry.
    UnknownRpcFunction(String),
    /// A function name was registered twice in the same registry.
    DuplicateName(String),
    /// An application hook or RPC handler returned an error.
    ApplicationHook { hook: &'static str, source: anyhow::Error },
    /// The connection can no longer carry frames.
    Transport(String),
}

impl CoreError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRpcFrame(_) => "MALFORMED_RPC_FRAME",
            Self::UnknownRpcFunction(_) => "UNKNOWN_RPC_FUNCTION",
            Self::DuplicateName(_) => "DUPLICATE_NAME",
            Self::ApplicationHook { .. } => "APPLICATION_HOOK",
            Self::Transport(_) => "TRANSPORT",
        }
    }

    /// Whether this error tears the connection down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub(crate) fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Self::ApplicationHook { hook, source }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRpcFrame(detail) => write!(f, "malformed rpc frame: {detail}"),
            Self::UnknownRpcFunction(name) => write!(f, "unknown rpc function: {name}"),
            Self::DuplicateName(name) => write!(f, "rpc function already registered: {name}"),
            Self::ApplicationHook { hook, source } => write!(f, "{hook} hook failed: {source:#}"),
            Self::Transport(detail) => write!(f, "transport error: {detail}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ApplicationHook { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
