// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Sink node: egress to a log, an external driver, or a custom callback.
//!
//! Sinks are terminal in the sense that a graph typically wires no outgoing
//! edge from one, but the node still calls `emit` so a subscriber tapping
//! this node's output for chaining/observability still sees every packet.

use async_trait::async_trait;
use flowkit_core::error::FlowKitError;
use flowkit_core::node::{NodeContext, ProcessorNode};
use flowkit_core::retry::RetryPolicy;
use flowkit_core::state::state_helpers;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// External sink driver: writes one record per call. An out-of-scope
/// collaborator (http / websocket / database) — the skeleton here only owns
/// the retry/error wiring around it.
#[async_trait]
pub trait SinkDriver: Send + Sync {
    async fn write(&mut self, payload: &Value, metadata: &BTreeMap<String, Value>) -> Result<(), FlowKitError>;
}

/// `(payload, metadata) -> Ok(()) or an error message`, for `custom` sinks.
pub type CustomSinkFn =
    Arc<dyn Fn(&Value, &BTreeMap<String, Value>) -> Result<(), String> + Send + Sync>;

pub enum SinkKind {
    /// Writes the formatted payload to the process log.
    Log,
    /// Delegates to an external driver (http / websocket / database).
    Driver(Box<dyn SinkDriver>),
    /// Invokes a user-provided callback.
    Custom(CustomSinkFn),
}

pub struct SinkNode {
    kind: SinkKind,
    retry: Option<RetryPolicy>,
}

impl SinkNode {
    #[must_use]
    pub fn new(kind: SinkKind, retry: Option<RetryPolicy>) -> Self {
        Self { kind, retry }
    }

    async fn write_once(&mut self, payload: &Value, metadata: &BTreeMap<String, Value>) -> Result<(), String> {
        match &mut self.kind {
            SinkKind::Log => {
                tracing::info!(payload = %payload, "sink");
                Ok(())
            },
            SinkKind::Driver(driver) => driver.write(payload, metadata).await.map_err(|e| e.to_string()),
            SinkKind::Custom(function) => function(payload, metadata),
        }
    }
}

#[async_trait]
impl ProcessorNode for SinkNode {
    fn kind(&self) -> &'static str {
        "sink"
    }

    async fn run(mut self: Box<Self>, ctx: NodeContext) -> Result<(), FlowKitError> {
        state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);

        while let Some(packet) = ctx.recv_with_cancellation().await {
            ctx.metrics.record_in();
            let mut retry_count = 0u32;

            loop {
                match self.write_once(&packet.payload, &packet.metadata).await {
                    Ok(()) => {
                        if ctx.emit(packet).await.is_err() {
                            return Ok(());
                        }
                        break;
                    },
                    Err(message) => {
                        ctx.metrics.record_errored();
                        if let Some(retry) = &self.retry {
                            if retry.allows_retry(retry_count) {
                                tokio::time::sleep(retry.delay_for(retry_count)).await;
                                retry_count += 1;
                                continue;
                            }
                        }
                        tracing::warn!(node_id = %ctx.node_id, error = %message, "sink write failed");
                        break;
                    },
                }
            }
        }

        state_helpers::emit_completed(&ctx.state_tx, &ctx.node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_context, test_input_queue};
    use flowkit_core::packet::Packet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn custom_sink_passes_packet_through() {
        let input = test_input_queue(8);
        let (ctx, mut output, _control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let function: CustomSinkFn = Arc::new(move |_payload, _meta| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let node = Box::new(SinkNode::new(SinkKind::Custom(function), None));
        let handle = tokio::spawn(node.run(ctx));

        input.push(Packet::new(Value::from(1))).await;
        let out = output.recv_timeout(Duration::from_secs(1)).await.expect("packet");
        assert_eq!(out.payload, Value::from(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        input.close();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let input = test_input_queue(8);
        let (ctx, mut output, _control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let metrics = ctx.metrics.clone();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let function: CustomSinkFn = Arc::new(move |_payload, _meta| {
            let n = attempts_clone.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err("boom".to_string()) } else { Ok(()) }
        });
        let retry = RetryPolicy { max_retries: 2, initial_delay_ms: 1, backoff_multiplier: 1.0, max_delay_ms: 5 };
        let node = Box::new(SinkNode::new(SinkKind::Custom(function), Some(retry)));
        let handle = tokio::spawn(node.run(ctx));

        input.push(Packet::new(Value::from(1))).await;
        let out = output.recv_timeout(Duration::from_secs(1)).await.expect("packet");
        assert_eq!(out.payload, Value::from(1));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(metrics.snapshot().packets_errored, 2);

        input.close();
        handle.await.unwrap().unwrap();
    }
}
