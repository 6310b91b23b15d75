// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Fluent graph-assembly API: `Graph::build(name)...build()`.
//!
//! Combines a wiring step (constructing nodes and connecting their edges)
//! with a declarative-to-definition compilation step, generalized from YAML
//! text to a programmatic builder since node kinds here may carry native
//! closures.

use crate::edge::Edge;
use crate::runner::{GraphDefinition, NodeSpec};
use crate::validator;
use flowkit_core::checkpoint::CheckpointStore;
use flowkit_core::config::GraphConfig;
use flowkit_core::error::FlowKitError;
use flowkit_core::node::ProcessorNode;
use flowkit_nodes::function::{MapperFn, PredicateFn};
use std::sync::Arc;

/// Fluent builder producing a validated [`GraphDefinition`].
pub struct GraphBuilder {
    name: String,
    description: Option<String>,
    nodes: Vec<NodeSpec>,
    edges: Vec<Edge>,
    config: GraphConfig,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    next_edge_id: u64,
}

impl GraphBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            config: GraphConfig::default(),
            checkpoint_store: None,
            next_edge_id: 0,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a persistence adapter for periodic state snapshots. Only
    /// consulted when `config.enable_checkpointing` is set.
    #[must_use]
    pub fn checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    /// Adds a node with the graph's default timeout and buffer size.
    #[must_use]
    pub fn node(self, id: impl Into<String>, node: Box<dyn ProcessorNode>) -> Self {
        self.node_with(id, node, None, None)
    }

    /// Adds a node, overriding its per-packet timeout and/or buffer capacity.
    #[must_use]
    pub fn node_with(
        mut self,
        id: impl Into<String>,
        node: Box<dyn ProcessorNode>,
        timeout_ms: Option<u64>,
        buffer_size: Option<usize>,
    ) -> Self {
        self.nodes.push(NodeSpec { id: id.into(), node, timeout_ms, buffer_size });
        self
    }

    /// Connects `from` to `to` with no predicate or mapper.
    #[must_use]
    pub fn connect(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.connect_with(from, to, None, None)
    }

    /// Connects `from` to `to`, optionally filtering and/or remapping packets
    /// on this edge.
    #[must_use]
    pub fn connect_with(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        predicate: Option<PredicateFn>,
        mapper: Option<MapperFn>,
    ) -> Self {
        let id = format!("edge-{}", self.next_edge_id);
        self.next_edge_id += 1;
        let mut edge = Edge::new(id, from.into(), to.into());
        if let Some(predicate) = predicate {
            edge = edge.with_predicate(predicate);
        }
        if let Some(mapper) = mapper {
            edge = edge.with_mapper(mapper);
        }
        self.edges.push(edge);
        self
    }

    /// Chains a linear sequence of node ids: `a -> b -> c`.
    #[must_use]
    pub fn flow(mut self, ids: &[&str]) -> Self {
        for pair in ids.windows(2) {
            self = self.connect(pair[0], pair[1]);
        }
        self
    }

    /// Connects one source node to several targets (fan-out).
    #[must_use]
    pub fn branch(mut self, from: impl Into<String>, targets: &[&str]) -> Self {
        let from = from.into();
        for target in targets {
            self = self.connect(from.clone(), *target);
        }
        self
    }

    /// Connects several sources to one target (fan-in).
    #[must_use]
    pub fn merge(mut self, sources: &[&str], to: impl Into<String>) -> Self {
        let to = to.into();
        for source in sources {
            self = self.connect(*source, to.clone());
        }
        self
    }

    /// Validates and finalizes the graph.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Validation`] for duplicate ids, dangling
    /// edges, or a disallowed cycle.
    pub fn build(self) -> Result<GraphDefinition, FlowKitError> {
        let node_ids: Vec<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        let edge_pairs: Vec<(String, String)> =
            self.edges.iter().map(|e| (e.from.to_string(), e.to.to_string())).collect();
        validator::validate(&node_ids, &edge_pairs, self.config.allow_cycles)?;

        Ok(GraphDefinition {
            name: self.name,
            description: self.description,
            nodes: self.nodes,
            edges: self.edges,
            config: self.config,
            checkpoint_store: self.checkpoint_store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkit_nodes::{SourceKind, SourceNode};

    #[test]
    fn flow_chains_linear_edges() {
        let definition = GraphBuilder::new("test")
            .node("a", Box::new(SourceNode::new(SourceKind::Manual)))
            .node("b", Box::new(SourceNode::new(SourceKind::Manual)))
            .node("c", Box::new(SourceNode::new(SourceKind::Manual)))
            .flow(&["a", "b", "c"])
            .build()
            .unwrap();
        assert_eq!(definition.edges.len(), 2);
    }

    #[test]
    fn dangling_edge_fails_build() {
        let result = GraphBuilder::new("test")
            .node("a", Box::new(SourceNode::new(SourceKind::Manual)))
            .connect("a", "missing")
            .build();
        assert!(result.is_err());
    }
}
