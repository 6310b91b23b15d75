// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The five built-in node kinds: source, transform, filter, aggregate, sink.
//!
//! Transform, filter, aggregate, and custom-sink/driver-backed nodes carry a
//! native Rust closure or driver object, which a JSON-keyed [`NodeRegistry`]
//! factory can't reconstruct from params alone — those are assembled
//! directly through their constructors by the graph builder. Only the
//! fully data-driven kinds (`source::timer`, `source::manual`, `sink::log`)
//! are registered here, for graphs loaded declaratively from YAML.

pub mod aggregate;
pub mod filter;
pub mod sink;
pub mod source;
pub mod transform;

use flowkit_core::registry::NodeRegistry;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use source::{SourceKind, SourceNode};

#[derive(Debug, Deserialize, Default, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct TimerSourceConfig {
    interval_ms: u64,
}

/// Registers the data-driven built-in node kinds with `registry`.
pub fn register_core_nodes(registry: &mut NodeRegistry) {
    registry.register(
        "source::timer",
        |params| {
            let cfg: TimerSourceConfig =
                flowkit_core::helpers::config_helpers::parse_config_optional(params)?;
            Ok(Box::new(SourceNode::new(SourceKind::Timer { interval_ms: cfg.interval_ms.max(1) })))
        },
        serde_json::to_value(schema_for!(TimerSourceConfig)).unwrap_or_default(),
        "Emits a packet at a fixed interval.",
    );

    registry.register(
        "source::manual",
        |_params| Ok(Box::new(SourceNode::new(SourceKind::Manual))),
        serde_json::json!({}),
        "Emits only via explicit injection.",
    );

    registry.register(
        "sink::log",
        |_params| Ok(Box::new(sink::SinkNode::new(sink::SinkKind::Log, None))),
        serde_json::json!({}),
        "Writes each packet's payload to the process log.",
    );

    tracing::info!("registered built-in node kinds");
}
