// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Node lifecycle state machine.
//!
//! ## State Machine
//!
//! ```text
//!   idle --start--> running --pause--> paused --resume--> running
//!     |                 |                  |
//!     +------stop-------+------stop--------+---> completed
//!     |                 |                  |
//!     +------fatal------+------fatal-------+---> error
//! ```
//!
//! Transitions are total and guarded: `start` on `running` is a no-op,
//! `resume` on anything but `paused` is a no-op, `stop`/`fatal` are reachable
//! from every state.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use ts_rs::TS;

/// The five lifecycle states a node or runner can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Created but not yet started. Admits no packets.
    Idle,
    /// Actively processing. The only status that admits new packets.
    Running,
    /// Deliberately suspended by the user; admits no packets, state is kept.
    Paused,
    /// Stopped gracefully; terminal.
    Completed,
    /// Stopped due to a fatal error; terminal.
    Error,
}

impl NodeStatus {
    /// Whether this status admits new packets for processing.
    #[must_use]
    pub const fn admits_packets(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether this status is terminal (no further transitions are possible).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Applies the `start` transition. No-op on `running` and terminal states.
    #[must_use]
    pub const fn on_start(self) -> Self {
        match self {
            Self::Idle | Self::Paused => Self::Running,
            other => other,
        }
    }

    /// Applies the `pause` transition. Only `running` moves to `paused`.
    #[must_use]
    pub const fn on_pause(self) -> Self {
        match self {
            Self::Running => Self::Paused,
            other => other,
        }
    }

    /// Applies the `resume` transition. No-op on anything but `paused`.
    #[must_use]
    pub const fn on_resume(self) -> Self {
        match self {
            Self::Paused => Self::Running,
            other => other,
        }
    }

    /// Applies the `stop` transition. Always moves to `completed` unless
    /// already terminal.
    #[must_use]
    pub const fn on_stop(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::Completed
        }
    }

    /// Applies a fatal-error transition. Always moves to `error` unless
    /// already terminal.
    #[must_use]
    pub const fn on_fatal(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::Error
        }
    }
}

/// A state update message sent by a node (or the runner) to report a status
/// change, used for monitoring, debugging, and subscriber notification.
#[derive(Debug, Clone)]
pub struct NodeStateUpdate {
    pub node_id: String,
    pub status: NodeStatus,
    pub timestamp: SystemTime,
}

impl NodeStateUpdate {
    #[inline]
    pub fn new(node_id: String, status: NodeStatus) -> Self {
        Self { node_id, status, timestamp: SystemTime::now() }
    }
}

/// Helper functions for emitting node state updates, reducing boilerplate in
/// node run loops.
pub mod state_helpers {
    use super::{NodeStateUpdate, NodeStatus};
    use tokio::sync::mpsc;

    #[inline]
    pub fn emit_state(state_tx: &mpsc::Sender<NodeStateUpdate>, node_id: &str, status: NodeStatus) {
        let _ = state_tx.try_send(NodeStateUpdate::new(node_id.to_string(), status));
    }

    #[inline]
    pub fn emit_idle(state_tx: &mpsc::Sender<NodeStateUpdate>, node_id: &str) {
        emit_state(state_tx, node_id, NodeStatus::Idle);
    }

    #[inline]
    pub fn emit_running(state_tx: &mpsc::Sender<NodeStateUpdate>, node_id: &str) {
        emit_state(state_tx, node_id, NodeStatus::Running);
    }

    #[inline]
    pub fn emit_paused(state_tx: &mpsc::Sender<NodeStateUpdate>, node_id: &str) {
        emit_state(state_tx, node_id, NodeStatus::Paused);
    }

    #[inline]
    pub fn emit_completed(state_tx: &mpsc::Sender<NodeStateUpdate>, node_id: &str) {
        emit_state(state_tx, node_id, NodeStatus::Completed);
    }

    #[inline]
    pub fn emit_error(state_tx: &mpsc::Sender<NodeStateUpdate>, node_id: &str) {
        emit_state(state_tx, node_id, NodeStatus::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_on_running_is_noop() {
        assert_eq!(NodeStatus::Running.on_start(), NodeStatus::Running);
    }

    #[test]
    fn resume_on_non_paused_is_noop() {
        assert_eq!(NodeStatus::Running.on_resume(), NodeStatus::Running);
        assert_eq!(NodeStatus::Idle.on_resume(), NodeStatus::Idle);
    }

    #[test]
    fn full_cycle() {
        let mut s = NodeStatus::Idle;
        s = s.on_start();
        assert_eq!(s, NodeStatus::Running);
        s = s.on_pause();
        assert_eq!(s, NodeStatus::Paused);
        s = s.on_resume();
        assert_eq!(s, NodeStatus::Running);
        s = s.on_stop();
        assert_eq!(s, NodeStatus::Completed);
        // stop is idempotent
        assert_eq!(s.on_stop(), NodeStatus::Completed);
    }

    #[test]
    fn fatal_from_any_state() {
        assert_eq!(NodeStatus::Paused.on_fatal(), NodeStatus::Error);
        assert_eq!(NodeStatus::Error.on_fatal(), NodeStatus::Error);
    }
}
