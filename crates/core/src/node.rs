// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Core node abstractions and the [`ProcessorNode`] trait.
//!
//! Unlike a typed-pin pipeline, every node here has exactly one input and one
//! output: fan-out/fan-in is a property of the edge fabric (`flowkit-engine`),
//! not of the node itself. This module defines:
//! - [`ProcessorNode`]: the trait every node kind implements
//! - [`NodeContext`]: the runtime handle passed to a node's `run` loop
//! - [`InitContext`]: context for a node's async initialization step
//! - [`OutputSender`]: handle for emitting packets to the edge fabric

use crate::buffer::BoundedQueue;
use crate::control::NodeControlMessage;
use crate::error::FlowKitError;
use crate::packet::Packet;
use crate::state::NodeStateUpdate;
use crate::stats::MetricsCounters;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error returned by [`OutputSender::send`] when a packet cannot be delivered
/// to the edge fabric.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutputSendError {
    /// The edge fabric's intake channel for this node is closed, meaning the
    /// runner has torn the graph down.
    #[error("output channel closed for node '{node_id}'")]
    ChannelClosed { node_id: String },
}

/// A message carrying a node's emitted packet to the shared dispatch loop,
/// tagged with the emitting node's id so the edge fabric can look up its
/// outgoing edges.
pub type EmittedPacket = (Arc<str>, Packet);

/// A handle given to a node for emitting packets downstream. Every packet a
/// node emits is tagged with this node's id and sent to the runner's single
/// dispatch loop, which applies each outgoing edge's predicate/mapper and
/// fans out to connected nodes (and to matching subscriptions).
#[derive(Clone)]
pub struct OutputSender {
    node_id: Arc<str>,
    tx: mpsc::Sender<EmittedPacket>,
}

impl OutputSender {
    #[must_use]
    pub fn new(node_id: impl Into<Arc<str>>, tx: mpsc::Sender<EmittedPacket>) -> Self {
        Self { node_id: node_id.into(), tx }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Emits a packet to the runner's dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns [`OutputSendError::ChannelClosed`] if the dispatch loop has
    /// already shut down (graph teardown in progress).
    pub async fn send(&self, packet: Packet) -> Result<(), OutputSendError> {
        self.tx
            .send((self.node_id.clone(), packet))
            .await
            .map_err(|_| OutputSendError::ChannelClosed { node_id: self.node_id.to_string() })
    }
}

/// Context provided to a node during its one-time async initialization step,
/// run before the graph starts.
pub struct InitContext {
    pub node_id: String,
    pub state_tx: mpsc::Sender<NodeStateUpdate>,
}

/// The runtime context handed to a node's `run` loop by the engine.
pub struct NodeContext {
    pub node_id: String,
    /// The node's bounded input buffer. `None` for source nodes, which have
    /// no upstream edges and instead originate packets themselves.
    pub input: Option<Arc<BoundedQueue<Packet>>>,
    pub control_rx: mpsc::Receiver<NodeControlMessage>,
    pub output: OutputSender,
    pub state_tx: mpsc::Sender<NodeStateUpdate>,
    pub metrics: Arc<MetricsCounters>,
    /// Per-packet processing timeout, falling back to `GraphConfig.defaultTimeoutMs`.
    pub timeout_ms: Option<u64>,
    pub cancellation_token: tokio_util::sync::CancellationToken,
}

impl NodeContext {
    /// Pops the next input packet, honoring cancellation. Returns `None` on
    /// cancellation or once the input buffer is closed and drained.
    pub async fn recv_with_cancellation(&self) -> Option<Packet> {
        let Some(input) = &self.input else { return None };
        tokio::select! {
            () = self.cancellation_token.cancelled() => None,
            packet = input.pop() => packet,
        }
    }

    /// Emits a packet, recording it against `packetsOut`. Errors are returned
    /// to the caller, which should generally stop processing: a closed
    /// output means the graph is tearing down.
    pub async fn emit(&self, packet: Packet) -> Result<(), OutputSendError> {
        self.output.send(packet).await?;
        self.metrics.record_out();
        Ok(())
    }
}

/// The fundamental trait implemented by every node kind (source, transform,
/// filter, aggregate, sink), designed as an actor driven by the engine's
/// `BaseNode` run loop.
#[async_trait]
pub trait ProcessorNode: Send + Sync {
    /// Human-readable kind discriminant, e.g. `"transform"`. Used in error
    /// messages and metrics labels.
    fn kind(&self) -> &'static str;

    /// Whether packets accepted by this node are held (for windowing) rather
    /// than processed and emitted immediately. Only aggregate nodes return
    /// `true`; the admission buffer is shared infrastructure either way.
    fn requires_buffering(&self) -> bool {
        false
    }

    /// Whether `GraphRunnerHandle::inject` may target this node. Only a
    /// manual source node accepts injection; every other kind returns
    /// `false` by default.
    fn accepts_injection(&self) -> bool {
        false
    }

    /// One-time async initialization, called before the graph starts. The
    /// default implementation does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Driver`] if an external resource could not be
    /// reached.
    async fn initialize(&mut self, _ctx: &InitContext) -> Result<(), FlowKitError> {
        Ok(())
    }

    /// The node's main actor loop, spawned as a task by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError`] on an unrecoverable fault; the engine
    /// transitions the node to `error` and applies `GraphConfig.errorStrategy`.
    async fn run(self: Box<Self>, context: NodeContext) -> Result<(), FlowKitError>;
}

/// A factory function that creates a new node instance from its JSON params.
pub type NodeFactory =
    Arc<dyn Fn(Option<&serde_json::Value>) -> Result<Box<dyn ProcessorNode>, FlowKitError> + Send + Sync>;
