// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A bounded, async, policy-driven queue backing every node's input buffer.
//!
//! `tokio::sync::mpsc` gives FIFO + backpressure but no way to evict the
//! oldest entry, so `sliding` buffers need their own structure. Rather than
//! special-case aggregate nodes, every node's admission path goes through
//! the same [`BoundedQueue`], with `bufferStrategy` applied uniformly.

use crate::control::BufferStrategy;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};

/// Outcome of a [`BoundedQueue::push`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The item was accepted into the queue.
    Admitted,
    /// The item was dropped; the caller should increment `packetsDropped`.
    Dropped,
}

/// A bounded FIFO queue with pluggable full-buffer policy.
pub struct BoundedQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    strategy: BufferStrategy,
    len: AtomicUsize,
    closed: AtomicBool,
    not_empty: Notify,
    not_full: Notify,
}

impl<T: Send> BoundedQueue<T> {
    #[must_use]
    pub fn new(capacity: usize, strategy: BufferStrategy) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity: capacity.max(1),
            strategy,
            len: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes an item according to the configured [`BufferStrategy`].
    /// Under `Block`, suspends the caller until space is available or the
    /// queue is closed (in which case the item is dropped).
    pub async fn push(&self, item: T) -> PushOutcome {
        loop {
            let not_full = self.not_full.notified();
            {
                let mut guard = self.inner.lock().await;
                if guard.len() < self.capacity {
                    guard.push_back(item);
                    self.len.store(guard.len(), Ordering::Release);
                    drop(guard);
                    self.not_empty.notify_one();
                    return PushOutcome::Admitted;
                }
                match self.strategy {
                    BufferStrategy::DropNewest => return PushOutcome::Dropped,
                    BufferStrategy::Sliding => {
                        guard.pop_front();
                        guard.push_back(item);
                        self.len.store(guard.len(), Ordering::Release);
                        drop(guard);
                        self.not_empty.notify_one();
                        return PushOutcome::Admitted;
                    },
                    BufferStrategy::Block => {
                        if self.closed.load(Ordering::Acquire) {
                            return PushOutcome::Dropped;
                        }
                    },
                }
            }
            not_full.await;
            if self.closed.load(Ordering::Acquire) {
                return PushOutcome::Dropped;
            }
        }
    }

    /// Pops the oldest item, waiting if the queue is empty. Returns `None`
    /// once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let not_empty = self.not_empty.notified();
            {
                let mut guard = self.inner.lock().await;
                if let Some(item) = guard.pop_front() {
                    self.len.store(guard.len(), Ordering::Release);
                    drop(guard);
                    self.not_full.notify_one();
                    return Some(item);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            not_empty.await;
        }
    }

    /// Drains every currently-buffered item without waiting. Used for
    /// flushing an aggregate window on `pause`/`stop`.
    pub async fn drain_all(&self) -> Vec<T> {
        let mut guard = self.inner.lock().await;
        let drained = guard.drain(..).collect();
        self.len.store(0, Ordering::Release);
        drop(guard);
        self.not_full.notify_waiters();
        drained
    }

    /// Marks the queue closed: pending `pop`/`push` waiters are released.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_newest_discards_overflow() {
        let q = BoundedQueue::new(1, BufferStrategy::DropNewest);
        assert_eq!(q.push(1).await, PushOutcome::Admitted);
        assert_eq!(q.push(2).await, PushOutcome::Dropped);
        assert_eq!(q.pop().await, Some(1));
    }

    #[tokio::test]
    async fn sliding_evicts_oldest() {
        let q = BoundedQueue::new(2, BufferStrategy::Sliding);
        assert_eq!(q.push(1).await, PushOutcome::Admitted);
        assert_eq!(q.push(2).await, PushOutcome::Admitted);
        assert_eq!(q.push(3).await, PushOutcome::Admitted);
        assert_eq!(q.pop().await, Some(2));
        assert_eq!(q.pop().await, Some(3));
    }

    #[tokio::test]
    async fn block_suspends_until_space() {
        let q = std::sync::Arc::new(BoundedQueue::new(1, BufferStrategy::Block));
        assert_eq!(q.push(1).await, PushOutcome::Admitted);

        let q2 = q.clone();
        let blocked = tokio::spawn(async move { q2.push(2).await });

        tokio::task::yield_now().await;
        assert!(!blocked.is_finished());

        assert_eq!(q.pop().await, Some(1));
        assert_eq!(blocked.await.unwrap(), PushOutcome::Admitted);
    }

    #[tokio::test]
    async fn closed_queue_drains_then_returns_none() {
        let q = BoundedQueue::new(4, BufferStrategy::DropNewest);
        q.push(1).await;
        q.close();
        assert_eq!(q.pop().await, Some(1));
        assert_eq!(q.pop().await, None);
    }
}
