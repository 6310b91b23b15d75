// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `GraphRunner`: the control-plane actor that owns a running graph, and
//! `GraphRunnerHandle`, the client used to drive it.
//!
//! A long-running actor owning the node map, subscriptions, and a metrics
//! cache, paired with a cloneable handle that talks to it over `mpsc`
//! channels. Every node tags its own emissions with its node id and sends
//! them into one shared channel; the runner's single dispatch loop
//! demultiplexes by id and applies the matching edges to downstream nodes.

use crate::edge::{Edge, RouteOutcome};
use flowkit_core::buffer::BoundedQueue;
use flowkit_core::checkpoint::{CheckpointStore, GraphState};
use flowkit_core::config::GraphConfig;
use flowkit_core::control::{ErrorStrategy, NodeControlMessage};
use flowkit_core::error::FlowKitError;
use flowkit_core::node::{EmittedPacket, InitContext, NodeContext, OutputSender, ProcessorNode};
use flowkit_core::packet::Packet;
use flowkit_core::state::{NodeStateUpdate, NodeStatus};
use flowkit_core::stats::{MetricsCounters, NodeMetrics};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// The kinds of lifecycle and data events a graph emits to registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GraphStarted,
    GraphStopped,
    GraphError,
    NodeError,
    PacketProcessed,
    PacketDropped,
    PacketError,
}

/// Payload carried by an event notification. Kept intentionally loose
/// (`serde_json::Value`) since listeners are arbitrary callbacks.
#[derive(Debug, Clone)]
pub struct GraphEvent {
    pub kind: EventKind,
    pub node_id: Option<String>,
    pub detail: Value,
}

type EventListener = Arc<dyn Fn(&GraphEvent) + Send + Sync>;
type SubscriberFn = Arc<dyn Fn(&Packet) + Send + Sync>;

struct Subscription {
    node_id: String,
    predicate: Option<flowkit_nodes::function::FilterFn>,
    callback: SubscriberFn,
}

struct LiveNode {
    status: NodeStatus,
    input: Option<Arc<BoundedQueue<Packet>>>,
    control_tx: mpsc::Sender<NodeControlMessage>,
    metrics: Arc<MetricsCounters>,
    done_rx: Option<oneshot::Receiver<()>>,
    accepts_injection: bool,
}

/// One node plus its wiring, as assembled by the `GraphBuilder`.
pub struct NodeSpec {
    pub id: String,
    pub node: Box<dyn ProcessorNode>,
    pub timeout_ms: Option<u64>,
    pub buffer_size: Option<usize>,
}

/// A fully-assembled, not-yet-running graph: nodes, edges, and config.
pub struct GraphDefinition {
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<Edge>,
    pub config: GraphConfig,
    /// Persistence adapter for periodic state snapshots. Only consulted when
    /// `config.enable_checkpointing` is set.
    pub checkpoint_store: Option<Arc<dyn CheckpointStore>>,
}

enum RunnerCommand {
    Start,
    Pause,
    Resume,
    Stop,
    NodeFinished { node_id: String, outcome: Result<(), FlowKitError> },
    Inject { node_id: String, payload: Value, metadata: Option<Value>, reply: oneshot::Sender<Result<(), FlowKitError>> },
    Subscribe { node_id: String, predicate: Option<flowkit_nodes::function::FilterFn>, callback: SubscriberFn, reply: oneshot::Sender<u64> },
    Unsubscribe { id: u64 },
    On { kind: EventKind, listener: EventListener, reply: oneshot::Sender<u64> },
    Off { kind: EventKind, id: u64 },
    SetVariable { key: String, value: Value },
    GetVariable { key: String, reply: oneshot::Sender<Option<Value>> },
    GetState { reply: oneshot::Sender<HashMap<String, NodeStatus>> },
    GetMetrics { reply: oneshot::Sender<HashMap<String, NodeMetrics>> },
}

/// The long-running control-plane actor for one graph instance.
pub struct GraphRunner {
    name: String,
    config: GraphConfig,
    nodes: HashMap<String, LiveNode>,
    edges_by_source: HashMap<String, Vec<Edge>>,
    variables: BTreeMap<String, Value>,
    subscriptions: HashMap<u64, Subscription>,
    next_subscription_id: u64,
    listeners: HashMap<EventKind, HashMap<u64, EventListener>>,
    next_listener_id: u64,
    activated: bool,
    cancellation: CancellationToken,
    emit_rx: mpsc::Receiver<EmittedPacket>,
    emit_tx: mpsc::Sender<EmittedPacket>,
    command_rx: mpsc::Receiver<RunnerCommand>,
    nodes_active_gauge: opentelemetry::metrics::Gauge<u64>,
    state_transitions_counter: opentelemetry::metrics::Counter<u64>,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    next_checkpoint_seq: u64,
}

/// A cloneable client handle to a running [`GraphRunner`].
#[derive(Clone)]
pub struct GraphRunnerHandle {
    command_tx: mpsc::Sender<RunnerCommand>,
    task: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

const EMIT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 128;
const METRICS_TICK_MS: u64 = 5_000;

impl GraphRunner {
    /// Re-validates `definition` (duplicate ids, dangling edges, disallowed
    /// cycles — the same checks `GraphBuilder::build` performs, repeated here
    /// since `GraphDefinition` is public and can be constructed directly),
    /// then builds and spawns its nodes, wires the edge table, and returns a
    /// handle. Corresponds to `Runner(def).initialize()` followed by spawning
    /// the actor; `start()` is still required to transition nodes to
    /// `running` and fire `graph:started`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Validation`] if the definition fails
    /// structural validation, or whatever a node's own `initialize` returns
    /// if it fails to reach an external resource.
    pub async fn initialize(definition: GraphDefinition) -> Result<GraphRunnerHandle, FlowKitError> {
        let node_ids: Vec<String> = definition.nodes.iter().map(|spec| spec.id.clone()).collect();
        let edge_pairs: Vec<(String, String)> =
            definition.edges.iter().map(|edge| (edge.from.to_string(), edge.to.to_string())).collect();
        crate::validator::validate(&node_ids, &edge_pairs, definition.config.allow_cycles)?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (emit_tx, emit_rx) = mpsc::channel(EMIT_CHANNEL_CAPACITY);
        let cancellation = CancellationToken::new();

        let mut edges_by_source: HashMap<String, Vec<Edge>> = HashMap::new();
        for edge in definition.edges {
            edges_by_source.entry(edge.from.to_string()).or_default().push(edge);
        }

        let mut nodes = HashMap::new();
        for spec in definition.nodes {
            if nodes.contains_key(&spec.id) {
                return Err(FlowKitError::Validation(format!("duplicate node id '{}'", spec.id)));
            }
            let buffer_size = spec.buffer_size.unwrap_or(definition.config.default_buffer_size);
            let input = Arc::new(BoundedQueue::new(buffer_size, definition.config.buffer_strategy));
            let (control_tx, control_rx) = mpsc::channel(32);
            let (state_tx, state_rx) = mpsc::channel(128);
            let metrics = Arc::new(MetricsCounters::new());
            let output = OutputSender::new(spec.id.clone(), emit_tx.clone());

            let mut node = spec.node;
            let accepts_injection = node.accepts_injection();
            let init_ctx = InitContext { node_id: spec.id.clone(), state_tx: state_tx.clone() };
            node.initialize(&init_ctx).await?;

            let ctx = NodeContext {
                node_id: spec.id.clone(),
                input: Some(input.clone()),
                control_rx,
                output,
                state_tx,
                metrics: metrics.clone(),
                timeout_ms: spec.timeout_ms.or(definition.config.default_timeout_ms),
                cancellation_token: cancellation.clone(),
            };

            let task = tokio::spawn(node.run(ctx));
            let (done_tx, done_rx) = oneshot::channel();
            tokio::spawn(Self::drain_state_updates(state_rx));
            tokio::spawn(Self::watch_node(spec.id.clone(), task, command_tx.clone(), done_tx));

            nodes.insert(
                spec.id.clone(),
                LiveNode {
                    status: NodeStatus::Idle,
                    input: Some(input),
                    control_tx,
                    metrics,
                    done_rx: Some(done_rx),
                    accepts_injection,
                },
            );
        }

        let meter = opentelemetry::global::meter("flowkit_engine");
        let nodes_active_gauge = meter
            .u64_gauge("graph.nodes.active")
            .with_description("Number of nodes currently running in the graph")
            .build();
        let state_transitions_counter = meter
            .u64_counter("graph.node.state_transitions")
            .with_description("Node state transitions")
            .build();

        let runner = Self {
            name: definition.name,
            config: definition.config,
            nodes,
            edges_by_source,
            variables: BTreeMap::new(),
            subscriptions: HashMap::new(),
            next_subscription_id: 0,
            listeners: HashMap::new(),
            next_listener_id: 0,
            activated: false,
            cancellation,
            emit_rx,
            emit_tx,
            command_rx,
            nodes_active_gauge,
            state_transitions_counter,
            checkpoint_store: definition.checkpoint_store,
            next_checkpoint_seq: 0,
        };

        let task = tokio::spawn(runner.run());
        Ok(GraphRunnerHandle { command_tx, task: Arc::new(tokio::sync::Mutex::new(Some(task))) })
    }

    async fn drain_state_updates(mut rx: mpsc::Receiver<NodeStateUpdate>) {
        while rx.recv().await.is_some() {}
    }

    /// Awaits a node's task to completion and reports the outcome back to the
    /// runner, so a node-level fault can be handled per `GraphConfig.errorStrategy`
    /// even when nobody is actively calling `stop()`.
    async fn watch_node(
        node_id: String,
        task: tokio::task::JoinHandle<Result<(), FlowKitError>>,
        command_tx: mpsc::Sender<RunnerCommand>,
        done_tx: oneshot::Sender<()>,
    ) {
        let outcome = task.await.unwrap_or_else(|e| Err(FlowKitError::Runtime(format!("node task panicked: {e}"))));
        let _ = command_tx.send(RunnerCommand::NodeFinished { node_id, outcome }).await;
        let _ = done_tx.send(());
    }

    async fn run(mut self) {
        tracing::info!(graph = %self.name, "graph runner started");
        let mut metrics_tick = tokio::time::interval(std::time::Duration::from_millis(METRICS_TICK_MS));
        let checkpoint_interval_ms = self.config.checkpoint_interval_ms.max(1);
        let mut checkpoint_tick = tokio::time::interval(std::time::Duration::from_millis(checkpoint_interval_ms));

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if !self.handle_command(command).await {
                        break;
                    }
                },
                Some((source, packet)) = self.emit_rx.recv() => {
                    self.dispatch(&source, packet).await;
                },
                _ = metrics_tick.tick() => {
                    self.refresh_metrics();
                },
                _ = checkpoint_tick.tick(), if self.config.enable_checkpointing => {
                    self.checkpoint().await;
                },
                else => break,
            }
        }

        tracing::info!(graph = %self.name, "graph runner stopped");
    }

    /// Saves a `GraphState` snapshot under `graph:<name>:checkpoint:<seq>`,
    /// when a store was configured. Failures are logged, not propagated: a
    /// stalled persistence backend must never stall the graph itself.
    async fn checkpoint(&mut self) {
        let Some(store) = &self.checkpoint_store else { return };
        let node_status = self.nodes.iter().map(|(id, n)| (id.clone(), n.status)).collect();
        let saved_at_unix_ms =
            u64::try_from(std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis())
                .unwrap_or(u64::MAX);
        let state = GraphState {
            graph_id: self.name.clone(),
            node_status,
            variables: self.variables.clone(),
            saved_at_unix_ms,
        };
        let key = format!("graph:{}:checkpoint:{}-{}", self.name, saved_at_unix_ms, self.next_checkpoint_seq);
        self.next_checkpoint_seq += 1;
        match serde_json::to_vec(&state) {
            Ok(bytes) => {
                if let Err(error) = store.save(&key, bytes).await {
                    tracing::warn!(graph = %self.name, %error, "checkpoint save failed");
                }
            },
            Err(error) => tracing::warn!(graph = %self.name, %error, "checkpoint serialization failed"),
        }
    }

    async fn dispatch(&mut self, source: &str, packet: Packet) {
        self.notify_subscribers(source, &packet);

        let Some(edges) = self.edges_by_source.get(source) else { return };
        for edge in edges.clone() {
            let packet = if self.config.allow_cycles {
                let hopped = packet.with_incremented_hops();
                if hopped.hop_count() > self.config.max_iterations {
                    self.emit_event(EventKind::PacketDropped, Some(source.to_string()), serde_json::json!({"reason": "iteration cap"}));
                    continue;
                }
                hopped
            } else {
                packet.clone()
            };

            match edge.route(&packet.payload, &packet.metadata, &self.variables) {
                RouteOutcome::Dropped => {
                    self.emit_event(EventKind::PacketDropped, Some(edge.to.to_string()), serde_json::json!({"edge": edge.id.to_string()}));
                },
                RouteOutcome::Deliver(payload) => {
                    let Some(target) = self.nodes.get(edge.to.as_ref()) else { continue };
                    if !target.status.admits_packets() {
                        continue;
                    }
                    let Some(queue) = &target.input else { continue };
                    let mut delivered = packet.clone();
                    delivered.payload = payload;
                    queue.push(delivered).await;
                    self.emit_event(EventKind::PacketProcessed, Some(edge.to.to_string()), Value::Null);
                },
            }
        }
    }

    fn notify_subscribers(&self, source: &str, packet: &Packet) {
        for sub in self.subscriptions.values() {
            if sub.node_id != source {
                continue;
            }
            if let Some(predicate) = &sub.predicate {
                match predicate(&packet.payload, &packet.metadata) {
                    Ok(true) => {},
                    Ok(false) | Err(_) => continue,
                }
            }
            (sub.callback)(packet);
        }
    }

    async fn handle_command(&mut self, command: RunnerCommand) -> bool {
        match command {
            RunnerCommand::Start => self.start().await,
            RunnerCommand::Pause => self.broadcast(NodeControlMessage::Pause, NodeStatus::on_pause).await,
            RunnerCommand::Resume => self.broadcast(NodeControlMessage::Resume, NodeStatus::on_resume).await,
            RunnerCommand::Stop => {
                self.stop().await;
                return false;
            },
            RunnerCommand::NodeFinished { node_id, outcome } => {
                if let Err(error) = outcome {
                    if let Some(node) = self.nodes.get_mut(&node_id) {
                        node.status = node.status.on_fatal();
                    }
                    self.emit_event(
                        EventKind::NodeError,
                        Some(node_id.clone()),
                        serde_json::json!({"error": error.to_string()}),
                    );
                    match self.config.error_strategy {
                        ErrorStrategy::Stop => {
                            self.emit_event(EventKind::GraphError, Some(node_id), Value::Null);
                            self.stop().await;
                            return false;
                        },
                        ErrorStrategy::Continue => {
                            tracing::warn!(node_id = %node_id, error = %error, "node errored, continuing per errorStrategy=continue");
                        },
                        ErrorStrategy::Retry => {
                            tracing::warn!(node_id = %node_id, error = %error, "node errored; retry is a node-level policy and was already exhausted");
                        },
                    }
                }
            },
            RunnerCommand::Inject { node_id, payload, metadata, reply } => {
                let outcome = self.inject(&node_id, payload, metadata).await;
                let _ = reply.send(outcome);
            },
            RunnerCommand::Subscribe { node_id, predicate, callback, reply } => {
                let id = self.next_subscription_id;
                self.next_subscription_id += 1;
                self.subscriptions.insert(id, Subscription { node_id, predicate, callback });
                let _ = reply.send(id);
            },
            RunnerCommand::Unsubscribe { id } => {
                self.subscriptions.remove(&id);
            },
            RunnerCommand::On { kind, listener, reply } => {
                let id = self.next_listener_id;
                self.next_listener_id += 1;
                self.listeners.entry(kind).or_default().insert(id, listener);
                let _ = reply.send(id);
            },
            RunnerCommand::Off { kind, id } => {
                if let Some(map) = self.listeners.get_mut(&kind) {
                    map.remove(&id);
                }
            },
            RunnerCommand::SetVariable { key, value } => {
                self.variables.insert(key, value);
            },
            RunnerCommand::GetVariable { key, reply } => {
                let _ = reply.send(self.variables.get(&key).cloned());
            },
            RunnerCommand::GetState { reply } => {
                let states = self.nodes.iter().map(|(id, n)| (id.clone(), n.status)).collect();
                let _ = reply.send(states);
            },
            RunnerCommand::GetMetrics { reply } => {
                let snapshot = self.nodes.iter().map(|(id, n)| (id.clone(), n.metrics.snapshot())).collect();
                let _ = reply.send(snapshot);
            },
        }
        true
    }

    async fn start(&mut self) {
        self.broadcast_inner(NodeControlMessage::Start, NodeStatus::on_start).await;
        if !self.activated && self.nodes.values().all(|n| n.status == NodeStatus::Running) {
            self.activated = true;
            self.emit_event(EventKind::GraphStarted, None, Value::Null);
        }
    }

    async fn broadcast(&mut self, message: NodeControlMessage, transition: impl Fn(NodeStatus) -> NodeStatus) {
        self.broadcast_inner(message, transition).await;
    }

    async fn broadcast_inner(&mut self, message: NodeControlMessage, transition: impl Fn(NodeStatus) -> NodeStatus) {
        for node in self.nodes.values_mut() {
            let next = transition(node.status);
            if next != node.status {
                self.state_transitions_counter.add(1, &[]);
            }
            node.status = next;
            let _ = node.control_tx.send(message.clone()).await;
        }
    }

    async fn stop(&mut self) {
        for node in self.nodes.values_mut() {
            node.status = node.status.on_stop();
            let _ = node.control_tx.send(NodeControlMessage::Stop).await;
            if let Some(input) = &node.input {
                input.close();
            }
        }
        self.cancellation.cancel();
        let waits: Vec<_> = self.nodes.values_mut().filter_map(|node| node.done_rx.take()).collect();
        futures::future::join_all(waits).await;
        self.emit_event(EventKind::GraphStopped, None, Value::Null);
    }

    /// Routes an injected payload to `node_id` as a `NodeControlMessage::Inject`,
    /// the same path a manual source's own control channel uses — injection
    /// never goes through the input buffer, since only a source node's `run`
    /// loop synthesizes a packet in response to it.
    async fn inject(&mut self, node_id: &str, payload: Value, metadata: Option<Value>) -> Result<(), FlowKitError> {
        let Some(node) = self.nodes.get(node_id) else {
            let error = FlowKitError::InvalidTarget(format!("no node named '{node_id}'"));
            self.emit_event(EventKind::GraphError, Some(node_id.to_string()), serde_json::json!({"error": error.to_string()}));
            return Err(error);
        };
        if !node.accepts_injection {
            let error = FlowKitError::InvalidTarget(format!("'{node_id}' is not a manual source"));
            self.emit_event(EventKind::GraphError, Some(node_id.to_string()), serde_json::json!({"error": error.to_string()}));
            return Err(error);
        }
        node.control_tx
            .send(NodeControlMessage::Inject { payload, metadata })
            .await
            .map_err(|_| FlowKitError::Runtime(format!("node '{node_id}' has shut down")))
    }

    fn refresh_metrics(&self) {
        let total_in: u64 = self.nodes.values().map(|n| n.metrics.snapshot().packets_in).sum();
        let active = self.nodes.values().filter(|n| n.status == NodeStatus::Running).count();
        self.nodes_active_gauge.record(u64::try_from(active).unwrap_or(u64::MAX), &[]);
        tracing::debug!(graph = %self.name, total_packets_in = total_in, active_nodes = active, "metrics tick");
    }

    fn emit_event(&self, kind: EventKind, node_id: Option<String>, detail: Value) {
        let Some(map) = self.listeners.get(&kind) else { return };
        let event = GraphEvent { kind, node_id, detail };
        for listener in map.values() {
            listener(&event);
        }
    }
}

impl GraphRunnerHandle {
    async fn send(&self, command: RunnerCommand) -> Result<(), FlowKitError> {
        self.command_tx.send(command).await.map_err(|_| FlowKitError::Runtime("runner has shut down".to_string()))
    }

    /// Transitions every node to `running` and fires `graph:started` once
    /// every node has reported `running`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner actor has shut down.
    pub async fn start(&self) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::Start).await
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner actor has shut down.
    pub async fn pause(&self) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::Pause).await
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner actor has shut down.
    pub async fn resume(&self) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::Resume).await
    }

    /// Stops every node and tears the runner down. Idempotent from the
    /// caller's perspective: a second call errors once the actor has exited.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner actor has already shut down.
    pub async fn stop(&self) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::Stop).await?;
        let handle = { self.task.lock().await.take() };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Injects a packet into a `manual` source node.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::InvalidTarget`] if `node_id` doesn't name a
    /// known node, or names a node that isn't a manual source. Returns
    /// [`FlowKitError::Runtime`] if the runner (or the target node) has shut
    /// down.
    pub async fn inject(&self, node_id: impl Into<String>, payload: Value, metadata: Option<Value>) -> Result<(), FlowKitError> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::Inject { node_id: node_id.into(), payload, metadata, reply }).await?;
        rx.await.map_err(|_| FlowKitError::Runtime("runner dropped inject reply".to_string()))?
    }

    /// Subscribes to every packet a node emits, optionally filtered by a
    /// predicate evaluated in the runner (not the node), so subscribers never
    /// burden downstream edges.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down.
    pub async fn subscribe(
        &self,
        node_id: impl Into<String>,
        callback: impl Fn(&Packet) + Send + Sync + 'static,
        predicate: Option<flowkit_nodes::function::FilterFn>,
    ) -> Result<u64, FlowKitError> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::Subscribe {
            node_id: node_id.into(),
            predicate,
            callback: Arc::new(callback),
            reply,
        })
        .await?;
        rx.await.map_err(|_| FlowKitError::Runtime("runner dropped subscription reply".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down.
    pub async fn unsubscribe(&self, id: u64) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::Unsubscribe { id }).await
    }

    /// Registers an event listener. Listener failures never propagate to the
    /// runner: a panicking listener only affects itself.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down.
    pub async fn on(&self, kind: EventKind, listener: impl Fn(&GraphEvent) + Send + Sync + 'static) -> Result<u64, FlowKitError> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::On { kind, listener: Arc::new(listener), reply }).await?;
        rx.await.map_err(|_| FlowKitError::Runtime("runner dropped listener reply".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down.
    pub async fn off(&self, kind: EventKind, id: u64) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::Off { kind, id }).await
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down.
    pub async fn set_variable(&self, key: impl Into<String>, value: Value) -> Result<(), FlowKitError> {
        self.send(RunnerCommand::SetVariable { key: key.into(), value }).await
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down or fails to respond.
    pub async fn get_variable(&self, key: impl Into<String>) -> Result<Option<Value>, FlowKitError> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::GetVariable { key: key.into(), reply }).await?;
        rx.await.map_err(|_| FlowKitError::Runtime("runner dropped variable reply".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down or fails to respond.
    pub async fn get_state(&self) -> Result<HashMap<String, NodeStatus>, FlowKitError> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::GetState { reply }).await?;
        rx.await.map_err(|_| FlowKitError::Runtime("runner dropped state reply".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`FlowKitError::Runtime`] if the runner has shut down or fails to respond.
    pub async fn get_metrics(&self) -> Result<HashMap<String, NodeMetrics>, FlowKitError> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::GetMetrics { reply }).await?;
        rx.await.map_err(|_| FlowKitError::Runtime("runner dropped metrics reply".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkit_nodes::{SinkKind, SinkNode, SourceKind, SourceNode};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn node_spec(id: &str, node: Box<dyn ProcessorNode>) -> NodeSpec {
        NodeSpec { id: id.to_string(), node, timeout_ms: None, buffer_size: None }
    }

    #[tokio::test]
    async fn linear_manual_source_to_sink_delivers_packet() {
        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = received.clone();

        let source = Box::new(SourceNode::new(SourceKind::Manual));
        let sink = Box::new(SinkNode::new(
            SinkKind::Custom(Arc::new(move |_payload, _meta| {
                received_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            None,
        ));

        let definition = GraphDefinition {
            name: "test".to_string(),
            description: None,
            nodes: vec![node_spec("source", source), node_spec("sink", sink)],
            edges: vec![Edge::new("e1", "source", "sink")],
            config: GraphConfig::default(),
            checkpoint_store: None,
        };

        let handle = GraphRunner::initialize(definition).await.unwrap();
        handle.start().await.unwrap();
        handle.inject("source", Value::from(42), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(received.load(Ordering::SeqCst), 1);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn inject_on_unknown_node_is_an_invalid_target_error() {
        let source = Box::new(SourceNode::new(SourceKind::Manual));
        let definition = GraphDefinition {
            name: "test".to_string(),
            description: None,
            nodes: vec![node_spec("source", source)],
            edges: vec![],
            config: GraphConfig::default(),
            checkpoint_store: None,
        };
        let handle = GraphRunner::initialize(definition).await.unwrap();
        handle.start().await.unwrap();
        let error = handle.inject("missing", Value::from(1), None).await.unwrap_err();
        assert!(matches!(error, FlowKitError::InvalidTarget(_)));
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn inject_on_a_non_manual_source_is_an_invalid_target_error() {
        let timer = Box::new(SourceNode::new(SourceKind::Timer { interval_ms: 1_000 }));
        let definition = GraphDefinition {
            name: "test".to_string(),
            description: None,
            nodes: vec![node_spec("timer", timer)],
            edges: vec![],
            config: GraphConfig::default(),
            checkpoint_store: None,
        };
        let handle = GraphRunner::initialize(definition).await.unwrap();
        handle.start().await.unwrap();
        let error = handle.inject("timer", Value::from(1), None).await.unwrap_err();
        assert!(matches!(error, FlowKitError::InvalidTarget(_)));
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn initialize_rejects_a_cyclic_graph_by_default() {
        let a = Box::new(SourceNode::new(SourceKind::Manual));
        let b = Box::new(SinkNode::new(SinkKind::Log, None));
        let definition = GraphDefinition {
            name: "test".to_string(),
            description: None,
            nodes: vec![node_spec("a", a), node_spec("b", b)],
            edges: vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "a")],
            config: GraphConfig::default(),
            checkpoint_store: None,
        };
        let error = GraphRunner::initialize(definition).await.unwrap_err();
        assert!(matches!(error, FlowKitError::Validation(_)));
    }
}
