// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Source node: produces packets from a timer, manual injection, or an
//! external driver (websocket / http / database), reconnecting with backoff.

use async_trait::async_trait;
use flowkit_core::node::{NodeContext, ProcessorNode};
use flowkit_core::state::state_helpers;
use flowkit_core::{control::NodeControlMessage, error::FlowKitError, packet::Packet};
use serde_json::Value;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// External source driver: opens a connection and yields payloads until
/// closed or exhausted. An out-of-scope collaborator per the runtime's
/// contract — the skeleton here only owns the reconnect-with-backoff loop.
#[async_trait]
pub trait SourceDriver: Send + Sync {
    async fn open(&mut self) -> Result<(), FlowKitError>;
    async fn next(&mut self) -> Result<Option<Value>, FlowKitError>;
    async fn close(&mut self);
}

/// What produces packets for a [`SourceNode`].
pub enum SourceKind {
    /// Emits a packet with `payload = null` every `interval_ms`.
    Timer { interval_ms: u64 },
    /// Emits only in response to `NodeControlMessage::Inject`.
    Manual,
    /// Delegates to an external driver, reconnecting on failure while running.
    Driver { driver: Box<dyn SourceDriver>, reconnect_backoff_ms: u64 },
}

pub struct SourceNode {
    kind: SourceKind,
}

impl SourceNode {
    #[must_use]
    pub fn new(kind: SourceKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl ProcessorNode for SourceNode {
    fn kind(&self) -> &'static str {
        "source"
    }

    fn accepts_injection(&self) -> bool {
        matches!(self.kind, SourceKind::Manual)
    }

    async fn run(mut self: Box<Self>, mut ctx: NodeContext) -> Result<(), FlowKitError> {
        state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);
        let mut running = true;

        match &mut self.kind {
            SourceKind::Timer { interval_ms } => {
                let mut ticker = tokio::time::interval(Duration::from_millis((*interval_ms).max(1)));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        () = ctx.cancellation_token.cancelled() => break,
                        _ = ticker.tick(), if running => {
                            let packet = Packet::new(Value::Null);
                            if ctx.emit(packet).await.is_err() { break; }
                        }
                        Some(msg) = ctx.control_rx.recv() => {
                            if !Self::handle_control(&mut ctx, msg, &mut running).await { break; }
                        }
                    }
                }
            },
            SourceKind::Manual => loop {
                tokio::select! {
                    () = ctx.cancellation_token.cancelled() => break,
                    maybe_msg = ctx.control_rx.recv() => {
                        let Some(msg) = maybe_msg else { break };
                        if !Self::handle_control(&mut ctx, msg, &mut running).await { break; }
                    }
                }
            },
            SourceKind::Driver { driver, reconnect_backoff_ms } => {
                let backoff = Duration::from_millis(*reconnect_backoff_ms);
                'outer: loop {
                    if driver.open().await.is_err() {
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    loop {
                        tokio::select! {
                            () = ctx.cancellation_token.cancelled() => break 'outer,
                            Some(msg) = ctx.control_rx.recv() => {
                                if !Self::handle_control(&mut ctx, msg, &mut running).await { break 'outer; }
                            }
                            next = driver.next(), if running => {
                                match next {
                                    Ok(Some(payload)) => {
                                        if ctx.emit(Packet::new(payload)).await.is_err() { break 'outer; }
                                    }
                                    Ok(None) => break,
                                    Err(_) => break,
                                }
                            }
                        }
                    }
                    tokio::time::sleep(backoff).await;
                }
                driver.close().await;
            },
        }

        state_helpers::emit_completed(&ctx.state_tx, &ctx.node_id);
        Ok(())
    }
}

impl SourceNode {
    /// Applies a control message, returning `false` if the node should stop.
    async fn handle_control(ctx: &mut NodeContext, msg: NodeControlMessage, running: &mut bool) -> bool {
        match msg {
            NodeControlMessage::Start => {
                *running = true;
                state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);
            },
            NodeControlMessage::Pause => {
                *running = false;
                state_helpers::emit_paused(&ctx.state_tx, &ctx.node_id);
            },
            NodeControlMessage::Resume => {
                *running = true;
                state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);
            },
            NodeControlMessage::Stop => return false,
            NodeControlMessage::Inject { payload, metadata } => {
                let mut packet = Packet::new(payload);
                if let Some(Value::Object(map)) = metadata {
                    for (k, v) in map {
                        packet = packet.with_metadata(k, v);
                    }
                }
                let _ = ctx.emit(packet).await;
            },
            NodeControlMessage::UpdateParams(_) | NodeControlMessage::CloseSession => {},
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_context;

    #[tokio::test]
    async fn manual_inject_emits_one_packet() {
        let (ctx, mut output, control_tx, _state_rx) = create_test_context(None);
        let node = Box::new(SourceNode::new(SourceKind::Manual));
        let handle = tokio::spawn(node.run(ctx));

        control_tx
            .send(NodeControlMessage::Inject { payload: Value::from(21), metadata: None })
            .await
            .unwrap();
        let packet = output.recv_timeout(Duration::from_secs(1)).await.expect("packet");
        assert_eq!(packet.payload, Value::from(21));

        control_tx.send(NodeControlMessage::Stop).await.unwrap();
        handle.await.unwrap().unwrap();
    }
}
