// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Utility functions for parsing node configuration from JSON.

/// Helper functions for parsing node configuration from JSON values.
pub mod config_helpers {
    use crate::error::FlowKitError;
    use serde::Deserialize;

    /// Parses configuration from an optional JSON value, using defaults if not
    /// provided or if parsing fails. The preferred approach for nodes whose
    /// params are all optional.
    ///
    /// # Errors
    ///
    /// Always returns `Ok` in practice; the `Result` return type is kept for
    /// consistency with the other config helpers.
    pub fn parse_config_optional<T>(params: Option<&serde_json::Value>) -> Result<T, FlowKitError>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        Ok(serde_json::from_value(params.unwrap_or(&serde_json::Value::Null).clone())
            .unwrap_or_default())
    }

    /// Parses configuration from an optional JSON value, erroring if absent.
    /// Use for node kinds with required params (e.g. a transform's `expression`).
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Validation`] if `params` is `None` or fails to
    /// deserialize into `T`.
    pub fn parse_config_required<T>(params: Option<&serde_json::Value>) -> Result<T, FlowKitError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value =
            params.ok_or_else(|| FlowKitError::Validation("configuration required".to_string()))?.clone();
        serde_json::from_value(value)
            .map_err(|e| FlowKitError::Validation(format!("failed to parse config: {e}")))
    }

    /// Like [`parse_config_required`], with a node-kind label in the error
    /// message.
    ///
    /// # Errors
    ///
    /// Returns [`FlowKitError::Validation`] if `params` is `None` or fails to
    /// deserialize into `T`.
    pub fn parse_config_with_context<T>(
        params: Option<&serde_json::Value>,
        context: &str,
    ) -> Result<T, FlowKitError>
    where
        T: for<'de> Deserialize<'de>,
    {
        params.map_or_else(
            || Err(FlowKitError::Validation(format!("{context} configuration required"))),
            |p| {
                serde_json::from_value(p.clone())
                    .map_err(|e| FlowKitError::Validation(format!("failed to parse {context}: {e}")))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::config_helpers::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default, PartialEq)]
    struct Cfg {
        #[serde(default)]
        limit: u32,
    }

    #[test]
    fn optional_falls_back_to_default() {
        let cfg: Cfg = parse_config_optional(None).unwrap();
        assert_eq!(cfg, Cfg { limit: 0 });
    }

    #[test]
    fn required_errors_when_absent() {
        let result: Result<Cfg, _> = parse_config_required(None);
        assert!(result.is_err());
    }

    #[test]
    fn required_parses_present_value() {
        let value = serde_json::json!({ "limit": 5 });
        let cfg: Cfg = parse_config_required(Some(&value)).unwrap();
        assert_eq!(cfg, Cfg { limit: 5 });
    }
}
