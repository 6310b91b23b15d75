// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-packet exponential-backoff retry policy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

/// Exponential-backoff retry policy applied when a node's processing
/// function errors.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before retry attempt `retry_count` (0-indexed), clamped to
    /// `max_delay_ms`.
    #[must_use]
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        let scaled = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(retry_count as i32);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ms = scaled.min(self.max_delay_ms as f64).max(0.0) as u64;
        Duration::from_millis(ms)
    }

    #[must_use]
    pub const fn allows_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_clamps() {
        let policy =
            RetryPolicy { max_retries: 2, initial_delay_ms: 10, backoff_multiplier: 2.0, max_delay_ms: 100 };
        assert_eq!(policy.delay_for(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for(10), Duration::from_millis(100));
    }

    #[test]
    fn allows_retry_respects_max() {
        let policy =
            RetryPolicy { max_retries: 2, initial_delay_ms: 10, backoff_multiplier: 2.0, max_delay_ms: 100 };
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
    }
}
