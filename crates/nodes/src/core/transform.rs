// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Transform node: applies a user function to each packet's payload.

use crate::function::TransformFn;
use async_trait::async_trait;
use flowkit_core::node::{NodeContext, ProcessorNode};
use flowkit_core::retry::RetryPolicy;
use flowkit_core::state::state_helpers;
use flowkit_core::error::FlowKitError;
use std::time::Instant;

pub struct TransformNode {
    function: TransformFn,
    retry: Option<RetryPolicy>,
}

impl TransformNode {
    #[must_use]
    pub fn new(function: TransformFn, retry: Option<RetryPolicy>) -> Self {
        Self { function, retry }
    }
}

#[async_trait]
impl ProcessorNode for TransformNode {
    fn kind(&self) -> &'static str {
        "transform"
    }

    async fn run(self: Box<Self>, ctx: NodeContext) -> Result<(), FlowKitError> {
        state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);

        while let Some(packet) = ctx.recv_with_cancellation().await {
            ctx.metrics.record_in();
            let mut retry_count = 0u32;

            loop {
                let started = Instant::now();
                match (self.function)(&packet.payload, &packet.metadata) {
                    Ok(payload) => {
                        #[allow(clippy::cast_precision_loss)]
                        ctx.metrics.record_latency(started.elapsed().as_secs_f64() * 1000.0);
                        let out = packet.transformed_by(&ctx.node_id, payload);
                        if ctx.emit(out).await.is_err() {
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
                        let out = packet.with_error(&ctx.node_id, message);
                        if ctx.emit(out).await.is_err() {
                            return Ok(());
                        }
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
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn doubles_payload_and_tags_metadata() {
        let input = test_input_queue(8);
        let (ctx, mut output, _control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let function: TransformFn = Arc::new(|payload, _meta| {
            let n = payload.as_i64().unwrap_or(0);
            Ok(Value::from(n * 2))
        });
        let node = Box::new(TransformNode::new(function, None));
        let handle = tokio::spawn(node.run(ctx));

        input.push(flowkit_core::packet::Packet::new(Value::from(21))).await;
        let out = output.recv_timeout(Duration::from_secs(1)).await.expect("packet");
        assert_eq!(out.payload, Value::from(42));
        assert_eq!(out.metadata.get("transformedBy"), Some(&Value::String("test_node".to_string())));

        input.close();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let input = test_input_queue(8);
        let (ctx, mut output, _control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let metrics = ctx.metrics.clone();
        let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let function: TransformFn = Arc::new(move |_payload, _meta| {
            let n = attempts_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < 2 {
                Err("boom".to_string())
            } else {
                Ok(Value::from(true))
            }
        });
        let retry = RetryPolicy { max_retries: 2, initial_delay_ms: 1, backoff_multiplier: 1.0, max_delay_ms: 5 };
        let node = Box::new(TransformNode::new(function, Some(retry)));
        let handle = tokio::spawn(node.run(ctx));

        input.push(flowkit_core::packet::Packet::new(Value::Null)).await;
        let out = output.recv_timeout(Duration::from_secs(1)).await.expect("packet");
        assert_eq!(out.payload, Value::from(true));
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(metrics.snapshot().packets_errored, 2);

        input.close();
        handle.await.unwrap().unwrap();
    }
}
