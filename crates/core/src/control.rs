// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control messages and graph-wide policy enumerations.
//!
//! - [`NodeControlMessage`]: sent to a running node to drive its lifecycle or
//!   tune its parameters.
//! - [`BufferStrategy`]: what a node does when its bounded input buffer is full.
//! - [`ErrorStrategy`]: how the runner reacts to a node-level `error` event.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A message sent to a specific, running node to control its lifecycle or
/// tune its parameters.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub enum NodeControlMessage {
    /// `idle|paused -> running`. No-op if already running.
    Start,
    /// `running -> paused`. No-op otherwise.
    Pause,
    /// `paused -> running`. No-op otherwise.
    Resume,
    /// Any state -> `completed`. Idempotent.
    Stop,
    /// Update node-specific parameters without restarting the node.
    UpdateParams(#[ts(type = "JsonValue")] serde_json::Value),
    /// Only valid on `manual` source nodes: synthesize a packet from the
    /// given payload and emit it.
    Inject {
        #[ts(type = "JsonValue")]
        payload: serde_json::Value,
        #[ts(type = "JsonValue")]
        metadata: Option<serde_json::Value>,
    },
    /// Only valid on aggregate nodes with a `session` window: forces the
    /// current window closed and emits it.
    CloseSession,
}

/// Policy applied when a bounded buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum BufferStrategy {
    /// Drop the incoming packet, keeping what's already buffered.
    #[default]
    DropNewest,
    /// Apply backpressure to the caller until space is available.
    Block,
    /// Drop the oldest buffered packet to make room (ring buffer semantics).
    Sliding,
}

/// Policy applied by the graph runner when a node emits a fatal `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorStrategy {
    /// Log the error and keep the rest of the graph running.
    #[default]
    Continue,
    /// Stop the entire runner when any node enters `error`.
    Stop,
    /// Defer entirely to each node's own `retryPolicy`.
    Retry,
}
