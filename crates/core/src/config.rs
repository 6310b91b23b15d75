// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Graph-wide runtime options.

use crate::control::{BufferStrategy, ErrorStrategy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

const fn default_buffer_size() -> usize {
    1000
}

const fn default_checkpoint_interval_ms() -> u64 {
    30_000
}

const fn default_max_iterations() -> u32 {
    10
}

/// Runtime-wide configuration for a single graph, set via
/// `Graph.build(..).config(cfg)`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
    /// Upper bound on concurrent user-function invocations, runtime-wide.
    pub max_concurrency: Option<usize>,
    /// Fallback per-packet timeout (ms) when a node declares none.
    pub default_timeout_ms: Option<u64>,
    /// Policy applied by every bounded buffer in the graph.
    pub buffer_strategy: BufferStrategy,
    /// How the runner reacts to a node-level `error` event.
    pub error_strategy: ErrorStrategy,
    /// Period (ms) between state-snapshot checkpoints, when checkpointing is
    /// enabled.
    #[serde(default = "default_checkpoint_interval_ms")]
    pub checkpoint_interval_ms: u64,
    /// If false (default), the validator rejects graphs containing cycles.
    pub allow_cycles: bool,
    /// For cyclic graphs, the bound on revisits per packet before it's
    /// dropped with reason `"iteration cap"`.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Toggles calls to the persistence adapter.
    pub enable_checkpointing: bool,
    /// Advisory flag enabling incremental emission defaults for aggregate
    /// nodes that don't specify one explicitly.
    pub streaming_mode: bool,
    /// Default bounded-buffer capacity for nodes that don't set their own
    /// `bufferSize`.
    #[serde(default = "default_buffer_size")]
    pub default_buffer_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            default_timeout_ms: None,
            buffer_strategy: BufferStrategy::default(),
            error_strategy: ErrorStrategy::default(),
            checkpoint_interval_ms: default_checkpoint_interval_ms(),
            allow_cycles: false,
            max_iterations: default_max_iterations(),
            enable_checkpointing: false,
            streaming_mode: false,
            default_buffer_size: default_buffer_size(),
        }
    }
}
