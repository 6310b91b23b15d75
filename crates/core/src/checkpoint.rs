// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Persistence adapter interface for graph state snapshots.
//!
//! `CheckpointStore` is an interface only — no bundled backend is provided,
//! matching the explicit "interface only" scoping for persistence. A graph
//! runner holding one periodically saves a [`GraphState`] snapshot under
//! `graph:<id>:checkpoint:<ts>-<rand>` when `enableCheckpointing` is set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FlowKitError;
use crate::state::NodeStatus;

/// An opaque snapshot of a running graph, handed to a [`CheckpointStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphState {
    pub graph_id: String,
    pub node_status: BTreeMap<String, NodeStatus>,
    pub variables: BTreeMap<String, serde_json::Value>,
    pub saved_at_unix_ms: u64,
}

/// Key-value persistence for graph definitions, live state, and checkpoints.
///
/// Keys in use: `graph:<id>:definition`, `graph:<id>:state`,
/// `graph:<id>:checkpoint:<ts>-<rand>`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`FlowKitError::Driver`] on a backend failure.
    async fn save(&self, key: &str, value: Vec<u8>) -> Result<(), FlowKitError>;

    /// # Errors
    ///
    /// Returns [`FlowKitError::Driver`] on a backend failure. Returns `Ok(None)`
    /// if `key` is absent.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, FlowKitError>;

    /// # Errors
    ///
    /// Returns [`FlowKitError::Driver`] on a backend failure.
    async fn delete(&self, key: &str) -> Result<(), FlowKitError>;

    /// # Errors
    ///
    /// Returns [`FlowKitError::Driver`] on a backend failure.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, FlowKitError>;
}

#[cfg(test)]
pub mod test_utils {
    use super::{CheckpointStore, FlowKitError};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory `CheckpointStore`, for tests only.
    #[derive(Default)]
    pub struct MemoryCheckpointStore {
        entries: Mutex<BTreeMap<String, Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl CheckpointStore for MemoryCheckpointStore {
        async fn save(&self, key: &str, value: Vec<u8>) -> Result<(), FlowKitError> {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, FlowKitError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn delete(&self, key: &str) -> Result<(), FlowKitError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list(&self, prefix: &str) -> Result<Vec<String>, FlowKitError> {
            Ok(self.entries.lock().unwrap().keys().filter(|k| k.starts_with(prefix)).cloned().collect())
        }
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = MemoryCheckpointStore::default();
        store.save("graph:g1:state", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.load("graph:g1:state").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryCheckpointStore::default();
        store.save("graph:g1:checkpoint:1-a", vec![]).await.unwrap();
        store.save("graph:g2:checkpoint:1-a", vec![]).await.unwrap();
        let keys = store.list("graph:g1:").await.unwrap();
        assert_eq!(keys, vec!["graph:g1:checkpoint:1-a".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemoryCheckpointStore::default();
        store.save("k", vec![1]).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), None);
    }
}
