// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Node metrics: atomic counters plus an EMA latency estimate.
//!
//! A running mean is unstable for long-lived nodes, so `averageLatency` is
//! tracked as an exponential moving average (α≈0.2) instead, while preserving
//! the contract that it reports a recent average latency in milliseconds.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use ts_rs::TS;

/// Atomic snapshot of a node's processing metrics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    pub packets_in: u64,
    pub packets_out: u64,
    pub packets_dropped: u64,
    pub packets_errored: u64,
    pub average_latency: f64,
    /// Milliseconds since the Unix epoch, or `None` if nothing processed yet.
    pub last_processed_at: Option<i64>,
}

/// EMA smoothing factor applied to latency samples.
const LATENCY_EMA_ALPHA: f64 = 0.2;

/// Thread-safe, lock-free counters backing a node's [`NodeMetrics`] snapshot.
#[derive(Debug, Default)]
pub struct MetricsCounters {
    packets_in: AtomicU64,
    packets_out: AtomicU64,
    packets_dropped: AtomicU64,
    packets_errored: AtomicU64,
    /// Latency EMA stored as bits of an f64 for atomic access.
    average_latency_bits: AtomicU64,
    last_processed_at: AtomicU64,
}

impl MetricsCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_in(&self) {
        self.packets_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out(&self) {
        self.packets_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_errored(&self) {
        self.packets_errored.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a processing latency sample, updating the EMA and
    /// `lastProcessedAt`.
    pub fn record_latency(&self, latency_ms: f64) {
        let prev_bits = self.average_latency_bits.load(Ordering::Relaxed);
        let prev = f64::from_bits(prev_bits);
        let next = if prev_bits == 0 {
            latency_ms
        } else {
            LATENCY_EMA_ALPHA.mul_add(latency_ms, (1.0 - LATENCY_EMA_ALPHA) * prev)
        };
        self.average_latency_bits.store(next.to_bits(), Ordering::Relaxed);
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let now = crate::packet::now_millis() as u64;
        self.last_processed_at.store(now, Ordering::Relaxed);
    }

    /// Takes an atomic snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> NodeMetrics {
        let last = self.last_processed_at.load(Ordering::Relaxed);
        NodeMetrics {
            packets_in: self.packets_in.load(Ordering::Relaxed),
            packets_out: self.packets_out.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            packets_errored: self.packets_errored.load(Ordering::Relaxed),
            average_latency: f64::from_bits(self.average_latency_bits.load(Ordering::Relaxed)),
            #[allow(clippy::cast_possible_wrap)]
            last_processed_at: if last == 0 { None } else { Some(last as i64) },
        }
    }
}

/// A metrics update message sent by a node to report its current snapshot,
/// throttled by the caller (e.g. every background tick).
#[derive(Debug, Clone)]
pub struct NodeMetricsUpdate {
    pub node_id: String,
    pub metrics: NodeMetrics,
    pub timestamp: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let c = MetricsCounters::new();
        c.record_in();
        c.record_in();
        c.record_out();
        c.record_dropped();
        c.record_errored();
        let snap = c.snapshot();
        assert_eq!(snap.packets_in, 2);
        assert_eq!(snap.packets_out, 1);
        assert_eq!(snap.packets_dropped, 1);
        assert_eq!(snap.packets_errored, 1);
    }

    #[test]
    fn latency_ema_converges_towards_samples() {
        let c = MetricsCounters::new();
        c.record_latency(10.0);
        assert!((c.snapshot().average_latency - 10.0).abs() < f64::EPSILON);
        c.record_latency(20.0);
        // 0.2*20 + 0.8*10 = 12.0
        assert!((c.snapshot().average_latency - 12.0).abs() < 1e-9);
    }
}
