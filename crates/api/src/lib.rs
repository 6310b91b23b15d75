// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! flowkit-api: the declarative graph-definition schema and its YAML/JSON
//! loader.
//!
//! A [`GraphDocument`] is the wire format for a graph: a map of node ids to
//! [`NodeDoc`]s (each naming a registered `kind` and its JSON params) plus an
//! explicit edge list. [`yaml::load`] compiles one into a real
//! `flowkit_engine::runner::GraphDefinition` against a populated
//! `flowkit_engine::Engine`'s node registry.
//!
//! Declarative documents can only reference node kinds that are fully
//! data-driven (no native closures) — `transform`/`filter`/`aggregate` kinds
//! that take a Rust function are only reachable through
//! `flowkit_engine::builder::GraphBuilder` directly. Edge predicates and
//! mappers are likewise a programmatic-builder-only feature: there is no
//! declarative syntax for them here.

use flowkit_core::GraphConfig;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod yaml;

/// A single node entry in a [`GraphDocument`].
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NodeDoc {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    /// Sugar for a straight-line edge (or edges) into this node, resolved
    /// before the explicit `edges` list. Mirrors the dependency-list
    /// convention of a DAG pipeline document, generalized from pin-specific
    /// dependencies to plain node-id references. Accepts either a single
    /// node id or a list in the source document; always a list once parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "needs::deserialize")]
    pub needs: Vec<String>,
}

mod needs {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Needs {
        Single(String),
        Multiple(Vec<String>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        match Needs::deserialize(deserializer)? {
            Needs::Single(id) => Ok(vec![id]),
            Needs::Multiple(ids) => Ok(ids),
        }
    }
}

/// An explicit edge in a [`GraphDocument`], for connections that aren't
/// expressible through `needs` sugar (e.g. fan-out to more than one target
/// isn't ambiguous either way, but an explicit list reads clearer for
/// non-trivial graphs).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDoc {
    pub from: String,
    pub to: String,
}

/// The top-level declarative graph definition.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: GraphConfig,
    pub nodes: IndexMap<String, NodeDoc>,
    #[serde(default)]
    pub edges: Vec<EdgeDoc>,
}
