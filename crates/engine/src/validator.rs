// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structural validation for a graph definition: unique node ids, no
//! dangling edges, and (unless `allowCycles` is set) no cycles.
//!
//! Generalized from a linear-pipeline validation pass to an arbitrary DAG
//! (or cyclic graph, when explicitly allowed).

use flowkit_core::error::FlowKitError;
use std::collections::{HashMap, HashSet};

/// Checks node id uniqueness, edge endpoint validity, and (conditionally)
/// acyclicity.
///
/// # Errors
///
/// Returns [`FlowKitError::Validation`] describing the first structural
/// problem found: a duplicate node id, an edge referencing an unknown node,
/// or a cycle when `allow_cycles` is `false`.
pub fn validate(node_ids: &[String], edges: &[(String, String)], allow_cycles: bool) -> Result<(), FlowKitError> {
    let mut seen = HashSet::new();
    for id in node_ids {
        if !seen.insert(id.as_str()) {
            return Err(FlowKitError::Validation(format!("duplicate node id '{id}'")));
        }
    }

    let known: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    for (from, to) in edges {
        if !known.contains(from.as_str()) {
            return Err(FlowKitError::Validation(format!("edge references unknown source node '{from}'")));
        }
        if !known.contains(to.as_str()) {
            return Err(FlowKitError::Validation(format!("edge references unknown target node '{to}'")));
        }
    }

    if !allow_cycles {
        if let Some(cycle_node) = find_cycle(node_ids, edges) {
            return Err(FlowKitError::Validation(format!(
                "graph contains a cycle reachable from '{cycle_node}'; set allowCycles=true to permit this"
            )));
        }
    }

    Ok(())
}

/// Depth-first cycle detection over the directed edge set. Returns the id of
/// a node on a detected cycle, if any.
fn find_cycle(node_ids: &[String], edges: &[(String, String)]) -> Option<String> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to) in edges {
        adjacency.entry(from.as_str()).or_default().push(to.as_str());
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Option<&'a str> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => return Some(node),
            None => {},
        }
        marks.insert(node, Mark::Visiting);
        if let Some(targets) = adjacency.get(node) {
            for target in targets {
                if let Some(found) = visit(target, adjacency, marks) {
                    return Some(found);
                }
            }
        }
        marks.insert(node, Mark::Done);
        None
    }

    for id in node_ids {
        if let Some(found) = visit(id.as_str(), &adjacency, &mut marks) {
            return Some(found.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_rejected() {
        let ids = vec!["a".to_string(), "a".to_string()];
        assert!(validate(&ids, &[], false).is_err());
    }

    #[test]
    fn dangling_edge_rejected() {
        let ids = vec!["a".to_string()];
        let edges = vec![("a".to_string(), "missing".to_string())];
        assert!(validate(&ids, &edges, false).is_err());
    }

    #[test]
    fn cycle_rejected_unless_allowed() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let edges = vec![("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())];
        assert!(validate(&ids, &edges, false).is_err());
        assert!(validate(&ids, &edges, true).is_ok());
    }

    #[test]
    fn acyclic_dag_accepted() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let edges =
            vec![("a".to_string(), "b".to_string()), ("a".to_string(), "c".to_string())];
        assert!(validate(&ids, &edges, false).is_ok());
    }
}
