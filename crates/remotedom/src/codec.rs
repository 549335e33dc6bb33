// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed RPC frame codec.
//!
//! A frame packs `n` string values as
//! `<n>,<len_1>,...,<len_n>,<value_1><value_2>...<value_n>`. The first value is
//! the function name and the rest are its arguments. Values are concatenated
//! without separators, so commas and digits inside them need no escaping.
//! Lengths count Unicode scalar values. Text past the declared values is
//! ignored.

use std::iter;

use crate::error::CoreError;

/// Prefix of an inbound RPC frame.
pub const RPC_PREFIX: &str = "rpc: ";
/// Prefix of an opaque application message.
pub const MSG_PREFIX: &str = "msg: ";

/// A decoded RPC call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    pub name: String,
    pub args: Vec<String>,
}

/// Encode `name` and `args` into a frame payload (without the `rpc: ` prefix).
pub fn encode<S: AsRef<str>>(name: &str, args: &[S]) -> String {
    let values: Vec<&str> = iter::once(name).chain(args.iter().map(AsRef::as_ref)).collect();

    let mut out = values.len().to_string();
    for value in &values {
        out.push(',');
        out.push_str(&value.chars().count().to_string());
    }
    out.push(',');
    for value in &values {
        out.push_str(value);
    }
    out
}

/// Encode a complete `rpc: ` frame.
pub fn encode_frame<S: AsRef<str>>(name: &str, args: &[S]) -> String {
    format!("{RPC_PREFIX}{}", encode(name, args))
}

/// Decode a frame payload (the text after `rpc: `).
pub fn decode(payload: &str) -> Result<RpcCall, CoreError> {
    let (count, mut rest) = next_number(payload, "value count")?;
    if count == 0 {
        return Err(malformed("frame declares no function name"));
    }

    // Each length needs at least two bytes, which bounds the allocation.
    let mut lengths = Vec::with_capacity(count.min(rest.len() / 2 + 1));
    for _ in 0..count {
        let (len, tail) = next_number(rest, "value length")?;
        lengths.push(len);
        rest = tail;
    }

    let mut values = Vec::with_capacity(lengths.len());
    for len in lengths {
        let end = char_boundary(rest, len).ok_or_else(|| {
            malformed(format!(
                "declared length {len} overruns the {} remaining characters",
                rest.chars().count()
            ))
        })?;
        let (value, tail) = rest.split_at(end);
        values.push(value.to_owned());
        rest = tail;
    }
    if !rest.is_empty() {
        tracing::debug!(ignored = rest.chars().count(), "text after the declared rpc values");
    }

    let mut values = values.into_iter();
    let name = values.next().ok_or_else(|| malformed("frame declares no function name"))?;
    Ok(RpcCall { name, args: values.collect() })
}

fn next_number<'a>(input: &'a str, what: &str) -> Result<(usize, &'a str), CoreError> {
    let (field, rest) =
        input.split_once(',').ok_or_else(|| malformed(format!("missing {what}")))?;
    let value = field
        .parse::<usize>()
        .map_err(|_| malformed(format!("non-numeric {what}: {field:?}")))?;
    Ok((value, rest))
}

/// Byte offset just past the first `chars` characters of `s`.
fn char_boundary(s: &str, chars: usize) -> Option<usize> {
    if chars == 0 {
        return Some(0);
    }
    s.char_indices().nth(chars - 1).map(|(i, c)| i + c.len_utf8())
}

fn malformed(detail: impl Into<String>) -> CoreError {
    CoreError::MalformedRpcFrame(detail.into())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
