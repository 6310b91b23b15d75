// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Parses a [`GraphDocument`] from YAML or JSON text and compiles it into a
//! `flowkit_engine::runner::GraphDefinition`, resolving each node's `kind`
//! against a registry of data-driven node constructors.

use crate::{EdgeDoc, GraphDocument, NodeDoc};
use flowkit_core::error::FlowKitError;
use flowkit_core::registry::NodeRegistry;
use flowkit_engine::builder::GraphBuilder;
use flowkit_engine::runner::GraphDefinition;

/// Parses YAML text into a [`GraphDocument`].
///
/// # Errors
///
/// Returns [`FlowKitError::Validation`] if the text isn't well-formed YAML or
/// doesn't match the document schema.
pub fn parse_yaml(text: &str) -> Result<GraphDocument, FlowKitError> {
    serde_saphyr::from_str(text).map_err(|error| FlowKitError::Validation(format!("invalid graph document: {error}")))
}

/// Parses JSON text into a [`GraphDocument`].
///
/// # Errors
///
/// Returns [`FlowKitError::Validation`] if the text isn't well-formed JSON or
/// doesn't match the document schema.
pub fn parse_json(text: &str) -> Result<GraphDocument, FlowKitError> {
    serde_json::from_str(text).map_err(|error| FlowKitError::Validation(format!("invalid graph document: {error}")))
}

/// Compiles a parsed [`GraphDocument`] into a `GraphDefinition`, constructing
/// each node from `registry` by its `kind` string.
///
/// # Errors
///
/// Returns [`FlowKitError::Validation`] if a node names an unregistered
/// `kind`, an edge (explicit or `needs`-derived) references an unknown node
/// id, a node id is duplicated, or the resulting graph is structurally
/// invalid (see `flowkit_engine::validator::validate`).
pub fn compile(document: GraphDocument, registry: &NodeRegistry) -> Result<GraphDefinition, FlowKitError> {
    let GraphDocument { name, description, config, nodes, edges } = document;

    let mut builder = GraphBuilder::new(name);
    if let Some(description) = description {
        builder = builder.description(description);
    }
    builder = builder.config(config);

    let mut needs_edges = Vec::new();
    for (id, NodeDoc { kind, params, timeout_ms, buffer_size, needs }) in nodes {
        let node = registry.create_node(&kind, params.as_ref())?;
        for source in needs {
            needs_edges.push((source, id.clone()));
        }
        builder = builder.node_with(id, node, timeout_ms, buffer_size);
    }

    for (from, to) in needs_edges {
        builder = builder.connect(from, to);
    }
    for EdgeDoc { from, to } in edges {
        builder = builder.connect(from, to);
    }

    builder.build()
}

/// Parses and compiles a YAML graph document in one step.
///
/// # Errors
///
/// See [`parse_yaml`] and [`compile`].
pub fn load(text: &str, registry: &NodeRegistry) -> Result<GraphDefinition, FlowKitError> {
    compile(parse_yaml(text)?, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkit_engine::Engine;

    #[test]
    fn parses_minimal_linear_graph() {
        let yaml = r#"
name: pipeline
nodes:
  source:
    kind: "source::manual"
  sink:
    kind: "sink::log"
    needs: source
"#;
        let document = parse_yaml(yaml).unwrap();
        assert_eq!(document.name, "pipeline");
        assert_eq!(document.nodes.len(), 2);
    }

    #[test]
    fn compiles_needs_sugar_into_edges() {
        let yaml = r#"
name: pipeline
nodes:
  source:
    kind: "source::manual"
  sink:
    kind: "sink::log"
    needs: source
"#;
        let engine = Engine::new();
        let definition = load(yaml, &engine.registry).unwrap();
        assert_eq!(definition.edges.len(), 1);
        assert_eq!(definition.edges[0].from.as_ref(), "source");
        assert_eq!(definition.edges[0].to.as_ref(), "sink");
    }

    #[test]
    fn unregistered_kind_fails_compilation() {
        let yaml = r#"
name: pipeline
nodes:
  mystery:
    kind: "does::not::exist"
"#;
        let engine = Engine::new();
        assert!(load(yaml, &engine.registry).is_err());
    }

    #[test]
    fn multiple_needs_produce_a_merge() {
        let yaml = r#"
name: pipeline
nodes:
  a:
    kind: "source::manual"
  b:
    kind: "source::manual"
  sink:
    kind: "sink::log"
    needs: [a, b]
"#;
        let engine = Engine::new();
        let definition = load(yaml, &engine.registry).unwrap();
        assert_eq!(definition.edges.len(), 2);
    }
}
