// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Edge fabric: routing rules applied to packets leaving a node.
//!
//! Every edge subscribes to one `from` node's output. The runner's central
//! dispatch loop looks up the outgoing edges for the emitting node and
//! applies each edge's predicate/mapper independently, so one edge dropping
//! a packet never affects its siblings.

use flowkit_nodes::function::{MapperFn, PredicateFn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One directed connection between two nodes in a graph.
#[derive(Clone)]
pub struct Edge {
    pub id: Arc<str>,
    pub from: Arc<str>,
    pub to: Arc<str>,
    pub predicate: Option<PredicateFn>,
    pub mapper: Option<MapperFn>,
}

/// Outcome of routing a packet across one edge.
pub enum RouteOutcome {
    /// The predicate rejected the packet (or errored); nothing is delivered.
    Dropped,
    /// The packet (possibly re-mapped) is to be delivered to `edge.to`.
    Deliver(Value),
}

impl Edge {
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>, from: impl Into<Arc<str>>, to: impl Into<Arc<str>>) -> Self {
        Self { id: id.into(), from: from.into(), to: to.into(), predicate: None, mapper: None }
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: PredicateFn) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: MapperFn) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Applies this edge's predicate then mapper to an emitted packet's
    /// payload, per steps 1-2 of the edge fabric contract. A predicate error
    /// is treated as a drop; a mapper error keeps the original payload.
    pub fn route(
        &self,
        payload: &Value,
        metadata: &BTreeMap<String, Value>,
        variables: &BTreeMap<String, Value>,
    ) -> RouteOutcome {
        if let Some(predicate) = &self.predicate {
            match predicate(payload, metadata, variables) {
                Ok(true) => {},
                Ok(false) => return RouteOutcome::Dropped,
                Err(message) => {
                    tracing::debug!(edge_id = %self.id, error = %message, "edge predicate errored, dropping");
                    return RouteOutcome::Dropped;
                },
            }
        }

        if let Some(mapper) = &self.mapper {
            match mapper(payload) {
                Ok(mapped) => return RouteOutcome::Deliver(mapped),
                Err(message) => {
                    tracing::warn!(edge_id = %self.id, error = %message, "edge mapper errored, keeping original payload");
                },
            }
        }

        RouteOutcome::Deliver(payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_false_drops() {
        let edge = Edge::new("e1", "a", "b").with_predicate(Arc::new(|v, _, _| Ok(v.as_i64().unwrap_or(0) > 0)));
        let outcome = edge.route(&Value::from(-1), &BTreeMap::new(), &BTreeMap::new());
        assert!(matches!(outcome, RouteOutcome::Dropped));
    }

    #[test]
    fn mapper_replaces_payload() {
        let edge = Edge::new("e1", "a", "b").with_mapper(Arc::new(|v| Ok(Value::from(v.as_i64().unwrap_or(0) * 2))));
        match edge.route(&Value::from(21), &BTreeMap::new(), &BTreeMap::new()) {
            RouteOutcome::Deliver(v) => assert_eq!(v, Value::from(42)),
            RouteOutcome::Dropped => panic!("expected delivery"),
        }
    }

    #[test]
    fn mapper_error_keeps_original() {
        let edge = Edge::new("e1", "a", "b").with_mapper(Arc::new(|_| Err("boom".to_string())));
        match edge.route(&Value::from(7), &BTreeMap::new(), &BTreeMap::new()) {
            RouteOutcome::Deliver(v) => assert_eq!(v, Value::from(7)),
            RouteOutcome::Dropped => panic!("expected delivery"),
        }
    }
}
