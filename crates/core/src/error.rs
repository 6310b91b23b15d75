// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for FlowKit.
//!
//! This module provides the error kinds named by the runtime's error-handling
//! contract so callers can match on category instead of parsing messages.

use thiserror::Error;

/// Main error type for FlowKit operations.
#[derive(Debug, Error, Clone)]
pub enum FlowKitError {
    /// Graph structure is invalid: duplicate ids, dangling edges, disallowed
    /// cycles, or missing kind-specific fields. Fails `initialize()` and is
    /// non-recoverable.
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation was misapplied, e.g. `inject` on a non-manual source.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A user-supplied predicate, mapper, transform, filter, or aggregate
    /// function threw.
    #[error("user code error in node '{node_id}': {message}")]
    UserCode { node_id: String, message: String },

    /// A source or sink driver failed (connection, write, parse).
    #[error("driver error: {0}")]
    Driver(String),

    /// A per-packet timeout elapsed.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Only surfaced under `bufferStrategy = "block"` when the caller refuses
    /// to wait; otherwise buffer-full manifests as a `packet:dropped` event.
    #[error("buffer overflow on node '{node_id}'")]
    BufferOverflow { node_id: String },

    /// Catch-all runtime error for conditions that don't fit another kind.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Convenience type alias for Results using [`FlowKitError`].
pub type Result<T> = std::result::Result<T, FlowKitError>;

impl From<FlowKitError> for String {
    fn from(err: FlowKitError) -> Self {
        err.to_string()
    }
}

impl From<String> for FlowKitError {
    fn from(s: String) -> Self {
        Self::Runtime(s)
    }
}

impl From<&str> for FlowKitError {
    fn from(s: &str) -> Self {
        Self::Runtime(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowKitError::Validation("duplicate node id 'a'".to_string());
        assert_eq!(err.to_string(), "validation error: duplicate node id 'a'");

        let err = FlowKitError::Timeout(250);
        assert_eq!(err.to_string(), "timeout after 250ms");
    }

    #[test]
    fn test_error_to_string_conversion() {
        let err = FlowKitError::Runtime("processing failed".to_string());
        let s: String = err.into();
        assert_eq!(s, "runtime error: processing failed");
    }

    #[test]
    fn test_string_to_error_conversion() {
        let err: FlowKitError = "something went wrong".into();
        assert_eq!(err.to_string(), "runtime error: something went wrong");
    }
}
