//! Pipeline configuration
//!
//! This crate consumes configuration; it never parses configuration files.
//! External loaders deserialize into [PipelineConfig] and hand it over.

use crate::rift::governance::GovernanceThresholds;
use serde::{Deserialize, Serialize};

/// Knobs consumed by the orchestrator and the tokenize stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads available within a single stage
    pub thread_count: usize,

    /// Escalate WARNING transitions to halts instead of flagging for audit
    pub strict_mode: bool,

    /// Ask the bytecode stage to attach trust tags to emitted units
    pub trust_tags: bool,

    /// Optional cap on the token store
    pub token_capacity: Option<usize>,

    /// Governance thresholds, overridable from the shipped defaults
    pub thresholds: GovernanceThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            thread_count: 32,
            strict_mode: false,
            trust_tags: false,
            token_capacity: None,
            thresholds: GovernanceThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.thread_count, 32);
        assert!(!config.strict_mode);
        assert!(!config.trust_tags);
        assert_eq!(config.token_capacity, None);
        assert_eq!(config.thresholds, GovernanceThresholds::default());
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str("{\"thread_count\": 4, \"strict_mode\": true}").unwrap();
        assert_eq!(config.thread_count, 4);
        assert!(config.strict_mode);
        assert_eq!(config.thresholds, GovernanceThresholds::default());
    }
}
