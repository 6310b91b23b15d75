// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Filter node: drops packets that fail a user predicate.

use crate::function::FilterFn;
use async_trait::async_trait;
use flowkit_core::error::FlowKitError;
use flowkit_core::node::{NodeContext, ProcessorNode};
use flowkit_core::state::state_helpers;

pub struct FilterNode {
    function: FilterFn,
}

impl FilterNode {
    #[must_use]
    pub fn new(function: FilterFn) -> Self {
        Self { function }
    }
}

#[async_trait]
impl ProcessorNode for FilterNode {
    fn kind(&self) -> &'static str {
        "filter"
    }

    async fn run(self: Box<Self>, ctx: NodeContext) -> Result<(), FlowKitError> {
        state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);

        while let Some(packet) = ctx.recv_with_cancellation().await {
            ctx.metrics.record_in();
            match (self.function)(&packet.payload, &packet.metadata) {
                Ok(true) => {
                    if ctx.emit(packet).await.is_err() {
                        return Ok(());
                    }
                },
                Ok(false) => ctx.metrics.record_dropped(),
                Err(message) => {
                    tracing::debug!(node_id = %ctx.node_id, error = %message, "filter predicate errored, dropping packet");
                    ctx.metrics.record_dropped();
                },
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
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn keeps_even_drops_odd() {
        let input = test_input_queue(8);
        let (ctx, mut output, _control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let function: FilterFn = Arc::new(|payload, _meta| Ok(payload.as_i64().unwrap_or(0) % 2 == 0));
        let node = Box::new(FilterNode::new(function));
        let handle = tokio::spawn(node.run(ctx));

        for n in 1..=4 {
            input.push(Packet::new(Value::from(n))).await;
        }
        let mut seen = Vec::new();
        while let Some(p) = output.recv_timeout(Duration::from_millis(200)).await {
            seen.push(p.payload.as_i64().unwrap());
        }
        assert_eq!(seen, vec![2, 4]);
        input.close();
        handle.await.unwrap().unwrap();
    }
}
