//! Coder configuration

use serde::{Deserialize, Serialize};

use crate::idl::SchemaError;

/// Default marker of an event record in a program log
pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// Marker of a plain log message, which older programs also used for events
pub const PROGRAM_LOG_PREFIX: &str = "Program log: ";

/// Knobs shared by every category coder of one [`crate::IdlCoder`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoderConfig {
    /// Prefix marking a base64 event payload
    pub program_data_prefix: String,
    /// Prefix of plain log messages
    pub program_log_prefix: String,
    /// Also look for events behind `program_log_prefix`
    pub accept_log_prefix_events: bool,
    /// Maximum nesting through named type references during encode/decode
    pub max_depth: usize,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            program_data_prefix: PROGRAM_DATA_PREFIX.to_string(),
            program_log_prefix: PROGRAM_LOG_PREFIX.to_string(),
            accept_log_prefix_events: false,
            max_depth: 64,
        }
    }
}

impl CoderConfig {
    /// Parse a configuration; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(json).map_err(|e| SchemaError::Json(e.to_string()))
    }

    /// Builder pattern: set the recursion bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder pattern: accept events behind the plain log prefix
    pub fn with_log_prefix_events(mut self, accept: bool) -> Self {
        self.accept_log_prefix_events = accept;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoderConfig::default();
        assert_eq!(config.program_data_prefix, "Program data: ");
        assert_eq!(config.max_depth, 64);
        assert!(!config.accept_log_prefix_events);
    }

    #[test]
    fn test_partial_json() {
        let config = CoderConfig::from_json(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.program_log_prefix, "Program log: ");

        assert!(matches!(
            CoderConfig::from_json("{"),
            Err(SchemaError::Json(_))
        ));
    }
}
