// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Test utilities for node unit tests.

use flowkit_core::buffer::BoundedQueue;
use flowkit_core::control::{BufferStrategy, NodeControlMessage};
use flowkit_core::node::{NodeContext, OutputSender};
use flowkit_core::packet::Packet;
use flowkit_core::stats::MetricsCounters;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Creates a [`NodeContext`] wired to mock channels, plus handles the test
/// can use to drive input and observe output and control.
///
/// `input` is `None` for source nodes (which have no upstream edge).
pub fn create_test_context(
    input: Option<Arc<BoundedQueue<Packet>>>,
) -> (NodeContext, MockOutput, mpsc::Sender<NodeControlMessage>, mpsc::Receiver<flowkit_core::state::NodeStateUpdate>)
{
    let (control_tx, control_rx) = mpsc::channel(16);
    let (state_tx, state_rx) = mpsc::channel(16);
    let (output_tx, output_rx) = mpsc::channel(1000);

    let ctx = NodeContext {
        node_id: "test_node".to_string(),
        input,
        control_rx,
        output: OutputSender::new("test_node", output_tx),
        state_tx,
        metrics: Arc::new(MetricsCounters::new()),
        timeout_ms: None,
        cancellation_token: CancellationToken::new(),
    };

    (ctx, MockOutput { rx: output_rx }, control_tx, state_rx)
}

/// A test-only input queue with a default capacity and `drop-newest` policy.
#[must_use]
pub fn test_input_queue(capacity: usize) -> Arc<BoundedQueue<Packet>> {
    Arc::new(BoundedQueue::new(capacity, BufferStrategy::DropNewest))
}

pub struct MockOutput {
    rx: mpsc::Receiver<flowkit_core::node::EmittedPacket>,
}

impl MockOutput {
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Packet> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok().flatten().map(|(_, packet)| packet)
    }

    pub async fn collect_available(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok((_, packet)) = self.rx.try_recv() {
            packets.push(packet);
        }
        packets
    }
}
