// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! flowkit-engine: graph runner, edge fabric, and the builder/validator that
//! turn a set of nodes and connections into a running graph.
//!
//! - [`builder::GraphBuilder`]: fluent assembly API (`Graph::build(name)...`)
//! - [`validator`]: structural validation (unique ids, dangling edges, cycles)
//! - [`edge::Edge`]: one routed connection between two nodes
//! - [`runner::GraphRunner`] / [`runner::GraphRunnerHandle`]: the running
//!   graph and the client used to drive it
//!
//! [`Engine`] is a thin convenience wrapper owning a populated [`NodeRegistry`],
//! for callers (like `flowkit-api`'s YAML loader) that construct nodes from
//! declarative `kind` strings rather than directly through the builder.

pub mod builder;
pub mod edge;
pub mod runner;
pub mod validator;

pub use builder::GraphBuilder;
pub use edge::Edge;
pub use flowkit_core::registry::NodeRegistry;
pub use runner::{EventKind, GraphDefinition, GraphEvent, GraphRunner, GraphRunnerHandle, NodeSpec};

/// Owns a [`NodeRegistry`] populated with every built-in, data-driven node
/// kind, for constructing nodes by name (as opposed to the programmatic
/// builder, which takes already-constructed [`flowkit_core::ProcessorNode`]s).
pub struct Engine {
    pub registry: NodeRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = NodeRegistry::new();
        flowkit_nodes::register_nodes(&mut registry);
        Self { registry }
    }
}
