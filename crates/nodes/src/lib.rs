// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Built-in FlowKit node kinds: source, transform, filter, aggregate, sink.

use flowkit_core::NodeRegistry;

pub mod core;
pub mod function;

#[cfg(test)]
pub mod test_utils;

pub use core::aggregate::{AggregateNode, EmissionStrategy, WindowKind};
pub use core::filter::FilterNode;
pub use core::sink::{SinkDriver, SinkKind, SinkNode};
pub use core::source::{SourceDriver, SourceKind, SourceNode};
pub use core::transform::TransformNode;

/// Registers every data-driven built-in node kind with `registry`.
pub fn register_nodes(registry: &mut NodeRegistry) {
    core::register_core_nodes(registry);
    tracing::info!("finished registering built-in nodes");
}
