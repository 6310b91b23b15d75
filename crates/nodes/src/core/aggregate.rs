// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Aggregate node: windowed accumulation (count / time / session / sliding)
//! with `onComplete` or `incremental` emission.

use crate::function::AggregateFn;
use async_trait::async_trait;
use flowkit_core::buffer::PushOutcome;
use flowkit_core::control::{BufferStrategy, NodeControlMessage};
use flowkit_core::error::FlowKitError;
use flowkit_core::node::{NodeContext, ProcessorNode};
use flowkit_core::packet::{now_millis, Packet};
use flowkit_core::state::state_helpers;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// How a window becomes ready to emit. See the windowing table in the
/// component design: count/sliding trigger on admission, time on a
/// scheduled closer, session on an explicit external event.
#[derive(Debug, Clone, Copy)]
pub enum WindowKind {
    Count { size: usize },
    Time { duration_ms: u64 },
    Session,
    Sliding { size: usize },
}

impl WindowKind {
    fn label(self) -> &'static str {
        match self {
            Self::Count { .. } => "count",
            Self::Time { .. } => "time",
            Self::Session => "session",
            Self::Sliding { .. } => "sliding",
        }
    }

    fn size(self) -> Option<usize> {
        match self {
            Self::Count { size } | Self::Sliding { size } => Some(size),
            Self::Time { .. } | Self::Session => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionStrategy {
    /// Emit once the window is ready, then clear.
    OnComplete,
    /// Emit on every admission with current contents, clearing only on window close.
    Incremental,
}

pub struct AggregateNode {
    window: WindowKind,
    strategy: EmissionStrategy,
    function: AggregateFn,
    buffer_size: usize,
    buffer_strategy: BufferStrategy,
}

impl AggregateNode {
    #[must_use]
    pub fn new(
        window: WindowKind,
        strategy: EmissionStrategy,
        function: AggregateFn,
        buffer_size: usize,
        buffer_strategy: BufferStrategy,
    ) -> Self {
        Self { window, strategy, function, buffer_size, buffer_strategy }
    }

    fn build_output(&self, buffer: &VecDeque<Packet>, window_start: i64) -> Result<Packet, String> {
        let items: Vec<Packet> = buffer.iter().cloned().collect();
        let payload = (self.function)(&items)?;
        let mut packet = Packet::new(payload);
        packet = packet.with_metadata("nodeKind", Value::String("aggregate".to_string()));
        packet = packet.with_metadata("windowKind", Value::String(self.window.label().to_string()));
        if let Some(size) = self.window.size() {
            packet = packet.with_metadata("windowSize", Value::from(size));
        }
        packet = packet.with_metadata("packetCount", Value::from(items.len()));
        packet = packet.with_metadata("windowStart", Value::from(window_start));
        packet = packet.with_metadata("windowEnd", Value::from(now_millis()));
        Ok(packet)
    }

    /// Applies the configured buffer strategy when the window buffer exceeds
    /// capacity before it's otherwise ready to close.
    fn apply_backpressure(&self, buffer: &mut VecDeque<Packet>, dropped: &mut u64) -> PushOutcome {
        if buffer.len() <= self.buffer_size {
            return PushOutcome::Admitted;
        }
        match self.buffer_strategy {
            BufferStrategy::DropNewest => {
                buffer.pop_back();
                *dropped += 1;
                PushOutcome::Dropped
            },
            BufferStrategy::Sliding => {
                buffer.pop_front();
                PushOutcome::Admitted
            },
            BufferStrategy::Block => PushOutcome::Admitted,
        }
    }
}

#[async_trait]
impl ProcessorNode for AggregateNode {
    fn kind(&self) -> &'static str {
        "aggregate"
    }

    fn requires_buffering(&self) -> bool {
        true
    }

    #[allow(clippy::too_many_lines)]
    async fn run(mut self: Box<Self>, mut ctx: NodeContext) -> Result<(), FlowKitError> {
        state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);

        let mut buffer: VecDeque<Packet> = VecDeque::new();
        let mut window_start = now_millis();
        let mut running = true;
        let mut dropped = 0u64;

        let mut ticker = match self.window {
            WindowKind::Time { duration_ms } => {
                let mut t = tokio::time::interval(Duration::from_millis(duration_ms.max(1)));
                t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(t)
            },
            _ => None,
        };

        loop {
            tokio::select! {
                () = ctx.cancellation_token.cancelled() => break,
                Some(msg) = ctx.control_rx.recv() => {
                    match msg {
                        NodeControlMessage::Pause => {
                            running = false;
                            if self.strategy == EmissionStrategy::Incremental && !buffer.is_empty()
                                && ctx.emit(self.build_output(&buffer, window_start).map_err(|e| FlowKitError::UserCode { node_id: ctx.node_id.clone(), message: e })?).await.is_err()
                            {
                                break;
                            }
                            state_helpers::emit_paused(&ctx.state_tx, &ctx.node_id);
                        }
                        NodeControlMessage::Resume => {
                            running = true;
                            state_helpers::emit_running(&ctx.state_tx, &ctx.node_id);
                        }
                        NodeControlMessage::Stop => break,
                        NodeControlMessage::CloseSession => {
                            if matches!(self.window, WindowKind::Session) && !buffer.is_empty() {
                                if let Ok(out) = self.build_output(&buffer, window_start) {
                                    let _ = ctx.emit(out).await;
                                }
                                buffer.clear();
                                window_start = now_millis();
                            }
                        }
                        NodeControlMessage::UpdateParams(_) | NodeControlMessage::Inject { .. } => {},
                    }
                }
                _ = async { ticker.as_mut().expect("ticker present").tick().await }, if ticker.is_some() && running => {
                    if let Ok(out) = self.build_output(&buffer, window_start) {
                        if ctx.emit(out).await.is_err() {
                            break;
                        }
                    }
                    if self.strategy == EmissionStrategy::OnComplete {
                        buffer.clear();
                    }
                    window_start = now_millis();
                }
                packet = ctx.recv_with_cancellation(), if running => {
                    let Some(packet) = packet else { break };
                    ctx.metrics.record_in();
                    buffer.push_back(packet);

                    match self.window {
                        WindowKind::Count { size } => {
                            if buffer.len() >= size {
                                if let Ok(out) = self.build_output(&buffer, window_start) {
                                    if ctx.emit(out).await.is_err() { break; }
                                }
                                buffer.clear();
                                window_start = now_millis();
                            } else {
                                if self.strategy == EmissionStrategy::Incremental
                                    && ctx.emit(self.build_output(&buffer, window_start).map_err(|e| FlowKitError::UserCode { node_id: ctx.node_id.clone(), message: e })?).await.is_err()
                                {
                                    break;
                                }
                                self.apply_backpressure(&mut buffer, &mut dropped);
                            }
                        }
                        WindowKind::Sliding { size } => {
                            while buffer.len() > size {
                                buffer.pop_front();
                            }
                            if let Ok(out) = self.build_output(&buffer, window_start) {
                                if ctx.emit(out).await.is_err() { break; }
                            }
                        }
                        WindowKind::Time { .. } | WindowKind::Session => {
                            if self.strategy == EmissionStrategy::Incremental {
                                if let Ok(out) = self.build_output(&buffer, window_start) {
                                    if ctx.emit(out).await.is_err() { break; }
                                }
                            }
                            self.apply_backpressure(&mut buffer, &mut dropped);
                        }
                    }
                }
            }
        }

        if !buffer.is_empty() {
            if let Ok(out) = self.build_output(&buffer, window_start) {
                let _ = ctx.emit(out).await;
            }
        }
        for _ in 0..dropped {
            ctx.metrics.record_dropped();
        }
        state_helpers::emit_completed(&ctx.state_tx, &ctx.node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_context, test_input_queue};
    use flowkit_core::control::NodeControlMessage;
    use std::sync::Arc;
    use std::time::Duration;

    fn sum_fn() -> AggregateFn {
        Arc::new(|packets: &[Packet]| Ok(Value::from(packets.iter().filter_map(|p| p.payload.as_i64()).sum::<i64>())))
    }

    #[tokio::test]
    async fn count_window_emits_on_complete_and_on_stop() {
        let input = test_input_queue(16);
        let (ctx, mut output, control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let node = Box::new(AggregateNode::new(
            WindowKind::Count { size: 3 },
            EmissionStrategy::OnComplete,
            sum_fn(),
            1000,
            BufferStrategy::DropNewest,
        ));
        let handle = tokio::spawn(node.run(ctx));

        for n in 1..=5 {
            input.push(Packet::new(Value::from(n))).await;
        }
        let first = output.recv_timeout(Duration::from_secs(1)).await.expect("first window");
        assert_eq!(first.payload, Value::from(6));
        assert_eq!(first.metadata.get("packetCount"), Some(&Value::from(3)));

        control_tx.send(NodeControlMessage::Stop).await.unwrap();
        let final_out = output.recv_timeout(Duration::from_secs(1)).await.expect("final flush");
        assert_eq!(final_out.payload, Value::from(9));
        input.close();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn sliding_window_keeps_last_n() {
        let input = test_input_queue(16);
        let (ctx, mut output, control_tx, _state_rx) = create_test_context(Some(input.clone()));
        let node = Box::new(AggregateNode::new(
            WindowKind::Sliding { size: 2 },
            EmissionStrategy::OnComplete,
            sum_fn(),
            1000,
            BufferStrategy::DropNewest,
        ));
        let handle = tokio::spawn(node.run(ctx));

        for n in [1, 2, 3] {
            input.push(Packet::new(Value::from(n))).await;
        }
        let mut last = None;
        while let Some(p) = output.recv_timeout(Duration::from_millis(200)).await {
            last = Some(p);
        }
        assert_eq!(last.unwrap().payload, Value::from(5)); // last two: 2+3

        control_tx.send(NodeControlMessage::Stop).await.unwrap();
        input.close();
        handle.await.unwrap().unwrap();
    }
}
