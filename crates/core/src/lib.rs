// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! FlowKit Core - fundamental traits and data structures for streaming
//! dataflow graphs.
//!
//! This crate defines the core abstractions shared by every FlowKit node:
//!
//! ## Core Modules
//!
//! - [`checkpoint`]: persistence adapter interface (`CheckpointStore`) and `GraphState`
//! - [`packet`]: the `Packet` envelope flowing through a graph
//! - [`node`]: `ProcessorNode` trait and its execution context
//! - [`registry`]: node-kind factory and discovery
//! - [`buffer`]: the bounded, policy-driven admission queue
//! - [`state`]: node lifecycle state machine
//! - [`stats`]: node metrics collection
//! - [`control`]: control messages and graph-wide policy enums
//! - [`config`]: graph-wide runtime options (`GraphConfig`)
//! - [`retry`]: per-packet exponential-backoff retry policy
//! - [`error`]: structured error types
//! - [`helpers`]: configuration-parsing utilities
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowkit_core::node::{ProcessorNode, NodeContext, InitContext};
//! use flowkit_core::packet::Packet;
//! use flowkit_core::error::FlowKitError;
//!
//! struct DoubleNode;
//!
//! #[async_trait::async_trait]
//! impl ProcessorNode for DoubleNode {
//!     fn kind(&self) -> &'static str { "double" }
//!     async fn run(self: Box<Self>, ctx: NodeContext) -> Result<(), FlowKitError> {
//!         while let Some(packet) = ctx.recv_with_cancellation().await {
//!             ctx.emit(packet).await.ok();
//!         }
//!         Ok(())
//!     }
//! }
//! ```

// Re-export async_trait for use in node implementations
pub use async_trait::async_trait;

// Module declarations
pub mod buffer;
pub mod checkpoint;
pub mod config;
pub mod control;
pub mod error;
pub mod helpers;
pub mod node;
pub mod packet;
pub mod registry;
pub mod retry;
pub mod state;
pub mod stats;

// Convenience re-exports for commonly used types

pub use buffer::{BoundedQueue, PushOutcome};
pub use config::GraphConfig;
pub use control::{BufferStrategy, ErrorStrategy, NodeControlMessage};
pub use error::{FlowKitError, Result};
pub use helpers::config_helpers;
pub use node::{EmittedPacket, InitContext, NodeContext, NodeFactory, OutputSendError, OutputSender, ProcessorNode};
pub use packet::{ErrorKind, Packet};
pub use registry::{NodeDefinition, NodeRegistry};
pub use retry::RetryPolicy;
pub use state::{state_helpers, NodeStateUpdate, NodeStatus};
pub use stats::{MetricsCounters, NodeMetrics, NodeMetricsUpdate};
