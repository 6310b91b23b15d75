// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! User-code signatures shared by transform, filter, and aggregate nodes.
//!
//! Sandboxed evaluation of untrusted function bodies is a host capability,
//! not part of this crate: user code here is a native Rust closure supplied
//! at graph-assembly time, compiled once, never re-parsed per packet.

use flowkit_core::Packet;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `(payload, metadata) -> transformed payload`, or an error message on failure.
pub type TransformFn =
    Arc<dyn Fn(&Value, &BTreeMap<String, Value>) -> Result<Value, String> + Send + Sync>;

/// `(payload, metadata) -> keep?`, or an error message (treated as a drop).
pub type FilterFn = Arc<dyn Fn(&Value, &BTreeMap<String, Value>) -> Result<bool, String> + Send + Sync>;

/// `buffered packets -> aggregated payload`.
pub type AggregateFn = Arc<dyn Fn(&[Packet]) -> Result<Value, String> + Send + Sync>;

/// `(payload, metadata, runner variables) -> keep this edge?`, used by edges.
/// The third argument is the runner's variable store (`setVariable`/`getVariable`),
/// exposed read-only so a predicate can branch on graph-wide state.
pub type PredicateFn = Arc<
    dyn Fn(&Value, &BTreeMap<String, Value>, &BTreeMap<String, Value>) -> Result<bool, String>
        + Send
        + Sync,
>;

/// `payload -> mapped payload`, used by edges.
pub type MapperFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;
