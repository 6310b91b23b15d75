// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Node factory registry: maps a `NodeConfig.kind` string to a constructor.

use crate::error::FlowKitError;
use crate::node::{NodeFactory, ProcessorNode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use ts_rs::TS;

/// A serializable description of a registered node kind, used by
/// `flowkit config schema` and API introspection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct NodeDefinition {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub param_schema: serde_json::Value,
}

#[derive(Clone)]
struct NodeInfo {
    factory: NodeFactory,
    param_schema: serde_json::Value,
    description: Option<String>,
}

/// Holds every node kind the engine can construct, keyed by `kind`.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    info: HashMap<String, NodeInfo>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node kind.
    pub fn register<F>(
        &mut self,
        kind: &str,
        factory: F,
        param_schema: serde_json::Value,
        description: impl Into<String>,
    ) where
        F: Fn(Option<&serde_json::Value>) -> Result<Box<dyn ProcessorNode>, FlowKitError>
            + Send
            + Sync
            + 'static,
    {
        self.info.insert(
            kind.to_string(),
            NodeInfo { factory: Arc::new(factory), param_schema, description: Some(description.into()) },
        );
    }

    /// Creates an instance of `kind`, passing in its JSON params.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Validation`] if `kind` isn't registered, or
    /// whatever the factory returns if construction fails.
    pub fn create_node(
        &self,
        kind: &str,
        params: Option<&serde_json::Value>,
    ) -> Result<Box<dyn ProcessorNode>, FlowKitError> {
        self.info.get(kind).map_or_else(
            || Err(FlowKitError::Validation(format!("node kind '{kind}' not registered"))),
            |info| (info.factory)(params),
        )
    }

    /// Returns the definitions of every registered node kind, for schema export.
    #[must_use]
    pub fn definitions(&self) -> Vec<NodeDefinition> {
        let mut defs: Vec<_> = self
            .info
            .iter()
            .map(|(kind, info)| NodeDefinition {
                kind: kind.clone(),
                description: info.description.clone(),
                param_schema: info.param_schema.clone(),
            })
            .collect();
        defs.sort_by(|a, b| a.kind.cmp(&b.kind));
        defs
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.info.contains_key(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{InitContext, NodeContext, ProcessorNode};
    use async_trait::async_trait;

    struct NoopNode;

    #[async_trait]
    impl ProcessorNode for NoopNode {
        fn kind(&self) -> &'static str {
            "noop"
        }

        async fn run(self: Box<Self>, _ctx: NodeContext) -> Result<(), FlowKitError> {
            Ok(())
        }
    }

    #[test]
    fn unregistered_kind_errors() {
        let registry = NodeRegistry::new();
        assert!(registry.create_node("missing", None).is_err());
    }

    #[test]
    fn registered_kind_constructs_and_lists() {
        let mut registry = NodeRegistry::new();
        registry.register("noop", |_| Ok(Box::new(NoopNode) as Box<dyn ProcessorNode>), serde_json::json!({}), "does nothing");
        assert!(registry.contains("noop"));
        assert!(registry.create_node("noop", None).is_ok());
        assert_eq!(registry.definitions().len(), 1);
        let _ = InitContext { node_id: "x".into(), state_tx: tokio::sync::mpsc::channel(1).0 };
    }
}
