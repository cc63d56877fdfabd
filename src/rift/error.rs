//! Error taxonomy shared across the pipeline core.
//!
//! Every failing operation returns a distinguishable variant; nothing is
//! silently swallowed or retried. Stage-level result codes live in
//! [crate::rift::pipeline::stage::StageStatus] and map onto these variants at
//! the orchestrator boundary.

use std::fmt;

/// Errors produced by the pipeline core
#[derive(Debug, Clone, PartialEq)]
pub enum RiftError {
    /// Malformed pattern literal; carries the offending literal for diagnostics
    InvalidSyntax { literal: String, reason: String },

    /// Contract violation by the caller (bad argument, invalid spec, bad config)
    InvalidArgument(String),

    /// A resource cap was exceeded; surrounding state remains destroyable
    MemoryExhausted(String),

    /// A matching strategy could not advance past the given byte position
    Processing {
        strategy: &'static str,
        position: usize,
    },

    /// Top-down and bottom-up runs emitted different token sequences
    ValidationMismatch { index: usize, detail: String },

    /// A stage transition was blocked by the governance gate
    GovernanceRejected {
        stage: usize,
        attack_risk: f64,
        rollback_cost: f64,
        stability_impact: f64,
    },

    /// The automaton or token store was driven while in an inconsistent state
    StateMachineFailure(String),
}

impl fmt::Display for RiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiftError::InvalidSyntax { literal, reason } => {
                write!(f, "Invalid pattern syntax in {:?}: {}", literal, reason)
            }
            RiftError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RiftError::MemoryExhausted(msg) => write!(f, "Memory exhausted: {}", msg),
            RiftError::Processing { strategy, position } => {
                write!(
                    f,
                    "{} matching stuck at byte {}: no state transition matches",
                    strategy, position
                )
            }
            RiftError::ValidationMismatch { index, detail } => {
                write!(
                    f,
                    "Dual-mode token sequences diverge at index {}: {}",
                    index, detail
                )
            }
            RiftError::GovernanceRejected {
                stage,
                attack_risk,
                rollback_cost,
                stability_impact,
            } => {
                write!(
                    f,
                    "Governance rejected transition out of stage {} (attack_risk={}, rollback_cost={}, stability_impact={})",
                    stage, attack_risk, rollback_cost, stability_impact
                )
            }
            RiftError::StateMachineFailure(msg) => write!(f, "State machine failure: {}", msg),
        }
    }
}

impl std::error::Error for RiftError {}
