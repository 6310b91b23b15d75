// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The packet envelope: the unit of flow through a graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use ts_rs::TS;

/// Structured description of an error attached to a packet, set by a node
/// that could not (or chose not to) recover a failing packet inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorKind {
    pub kind: String,
    pub message: String,
}

impl ErrorKind {
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }
}

/// An immutable envelope carrying one unit of data through the graph.
///
/// Ids are unique per packet; the runtime never rewrites them, but derives a
/// fresh packet (with a fresh id) for aggregation output, whose metadata
/// references the origin node and window.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Packet {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[ts(type = "JsonValue")]
    pub payload: Value,
    #[ts(type = "Record<string, JsonValue>")]
    pub metadata: BTreeMap<String, Value>,
    pub error: Option<ErrorKind>,
}

impl Packet {
    /// Creates a new packet with a fresh random id and the current timestamp.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self {
            id: new_packet_id(),
            timestamp: now_millis(),
            payload,
            metadata: BTreeMap::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns a clone of this packet with `payload` replaced and
    /// `{transformedBy, transformedAt}` merged into its metadata, per the
    /// transform node's contract.
    #[must_use]
    pub fn transformed_by(&self, node_id: &str, payload: Value) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.insert("transformedBy".to_string(), Value::String(node_id.to_string()));
        metadata.insert("transformedAt".to_string(), Value::from(now_millis()));
        Self { id: self.id.clone(), timestamp: self.timestamp, payload, metadata, error: None }
    }

    /// Returns a clone of this packet decorated with an error and
    /// `{errorNode, errorAt}` metadata, per the transform node's error path.
    #[must_use]
    pub fn with_error(&self, node_id: &str, message: impl Into<String>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.insert("errorNode".to_string(), Value::String(node_id.to_string()));
        metadata.insert("errorAt".to_string(), Value::from(now_millis()));
        Self {
            id: self.id.clone(),
            timestamp: self.timestamp,
            payload: self.payload.clone(),
            metadata,
            error: Some(ErrorKind::new("UserCodeError", message)),
        }
    }

    /// Current hop count for cyclic-graph iteration capping (see
    /// `GraphConfig::allow_cycles`). Absent means zero.
    #[must_use]
    pub fn hop_count(&self) -> u32 {
        self.metadata
            .get("__hops")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    }

    /// Returns a clone with the hop counter incremented by one.
    #[must_use]
    pub fn with_incremented_hops(&self) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.insert("__hops".to_string(), Value::from(self.hop_count() + 1));
        Self {
            id: self.id.clone(),
            timestamp: self.timestamp,
            payload: self.payload.clone(),
            metadata,
            error: self.error.clone(),
        }
    }
}

#[must_use]
pub fn new_packet_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("pkt-{}-{n:x}", now_millis())
}

#[must_use]
pub fn now_millis() -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_packet_has_unique_id() {
        let a = Packet::new(Value::from(1));
        let b = Packet::new(Value::from(2));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn transformed_by_preserves_id_and_adds_metadata() {
        let p = Packet::new(Value::from(21));
        let t = p.transformed_by("double", Value::from(42));
        assert_eq!(t.id, p.id);
        assert_eq!(t.payload, Value::from(42));
        assert_eq!(t.metadata.get("transformedBy"), Some(&Value::String("double".to_string())));
    }

    #[test]
    fn hop_count_increments() {
        let p = Packet::new(Value::from(1));
        assert_eq!(p.hop_count(), 0);
        let p = p.with_incremented_hops();
        assert_eq!(p.hop_count(), 1);
        let p = p.with_incremented_hops();
        assert_eq!(p.hop_count(), 2);
    }
}
