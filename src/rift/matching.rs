//! Dual-strategy matching over a pattern automaton
//!
//! Two independent strategies drive the same automaton over the same input:
//! top-down recursive descent ([top_down]) and bottom-up shift-reduce
//! ([bottom_up]). A pattern literal selects one of them, or both; when both
//! run, their token sequences must agree element-wise, and any divergence is
//! a hard validation failure rather than a warning.
//!
//! The comparison order is fixed (top-down first) so that error messages for
//! a given input are reproducible.
//!
//! Both strategies share the same whitespace discipline: input not claimed
//! by any pattern is skipped when it is whitespace, and is the stuck case
//! (`Processing`) when it is not. A strategy that cannot advance reports the
//! stuck byte position instead of emitting an empty token.

pub mod bottom_up;
pub mod top_down;

use crate::rift::automaton::Automaton;
use crate::rift::error::RiftError;
use crate::rift::pattern::MatchMode;
use crate::rift::token::{SourceMap, Token};

pub use bottom_up::BottomUpStrategy;
pub use top_down::TopDownStrategy;

/// Trait for pluggable matching strategy implementations
pub trait MatchStrategy {
    /// Strategy name used in diagnostics
    fn name(&self) -> &'static str;

    /// Tokenize the whole input against the automaton
    fn run(
        &self,
        automaton: &Automaton,
        input: &str,
        map: &SourceMap,
    ) -> Result<Vec<Token>, RiftError>;
}

/// Advance past whitespace the automaton does not claim
pub(crate) fn skip_whitespace(input: &str, mut pos: usize) -> usize {
    while let Some(c) = input[pos..].chars().next() {
        if c.is_whitespace() {
            pos += c.len_utf8();
        } else {
            break;
        }
    }
    pos
}

/// Result of one matcher run: the sequences produced by the strategies the
/// automaton's mode requested
#[derive(Debug, Clone, PartialEq)]
pub struct DualRunReport {
    pub mode: MatchMode,
    pub top_down: Option<Vec<Token>>,
    pub bottom_up: Option<Vec<Token>>,
}

impl DualRunReport {
    /// The token sequence handed to downstream stages. In dual mode both
    /// sequences already validated equal, so top-down is returned.
    pub fn into_tokens(self) -> Vec<Token> {
        match (self.top_down, self.bottom_up) {
            (Some(tokens), _) => tokens,
            (None, Some(tokens)) => tokens,
            (None, None) => Vec::new(),
        }
    }
}

/// Drives an automaton through input once per requested strategy and checks
/// agreement
pub struct DualModeMatcher;

impl DualModeMatcher {
    /// Run the strategies the automaton's mode requests over `input`.
    ///
    /// In dual mode both strategies run (top-down first) and the sequences
    /// are validated for element-wise agreement; this function never returns
    /// `Ok` with differing sequences.
    pub fn run(automaton: &Automaton, input: &str) -> Result<DualRunReport, RiftError> {
        Self::run_from(automaton, input, 1)
    }

    /// Like [DualModeMatcher::run], with token line numbering starting at
    /// `base_line`. Worker partitions matching disjoint line ranges use this
    /// so merged sub-sequences carry global positions.
    pub fn run_from(
        automaton: &Automaton,
        input: &str,
        base_line: usize,
    ) -> Result<DualRunReport, RiftError> {
        if automaton.state_count() == 0 {
            return Err(RiftError::StateMachineFailure(
                "matching requested on an automaton with no states".to_string(),
            ));
        }
        let map = SourceMap::with_base_line(input, base_line);
        let mode = automaton.match_mode();
        match mode {
            MatchMode::TopDown => {
                let tokens = TopDownStrategy.run(automaton, input, &map)?;
                Ok(DualRunReport {
                    mode,
                    top_down: Some(tokens),
                    bottom_up: None,
                })
            }
            MatchMode::BottomUp => {
                let tokens = BottomUpStrategy.run(automaton, input, &map)?;
                Ok(DualRunReport {
                    mode,
                    top_down: None,
                    bottom_up: Some(tokens),
                })
            }
            MatchMode::Dual => {
                let top_down = TopDownStrategy.run(automaton, input, &map)?;
                let bottom_up = BottomUpStrategy.run(automaton, input, &map)?;
                Self::validate_consistency(&top_down, &bottom_up)?;
                Ok(DualRunReport {
                    mode,
                    top_down: Some(top_down),
                    bottom_up: Some(bottom_up),
                })
            }
        }
    }

    /// Sequences must have equal length and element-wise equal tokens
    /// (kind, value, position); the first diverging index is reported.
    pub fn validate_consistency(top_down: &[Token], bottom_up: &[Token]) -> Result<(), RiftError> {
        let limit = top_down.len().min(bottom_up.len());
        for i in 0..limit {
            if top_down[i] != bottom_up[i] {
                return Err(RiftError::ValidationMismatch {
                    index: i,
                    detail: format!(
                        "top-down {:?} vs bottom-up {:?}",
                        top_down[i], bottom_up[i]
                    ),
                });
            }
        }
        if top_down.len() != bottom_up.len() {
            return Err(RiftError::ValidationMismatch {
                index: limit,
                detail: format!(
                    "sequence lengths differ: top-down {} vs bottom-up {}",
                    top_down.len(),
                    bottom_up.len()
                ),
            });
        }
        Ok(())
    }
}
