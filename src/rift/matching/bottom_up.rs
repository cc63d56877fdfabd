//! Bottom-up shift-reduce matching
//!
//! The strategy shifts input characters onto a stack one at a time. After
//! each shift it checks whether the whole stack reduces to a complete
//! pattern, remembering the latest stack length where a reduction was
//! possible and which state accepted it (insertion order breaks ties at a
//! given length). When no further shift can help, it reduces at the last
//! accepting length and emits the token. No backtracking happens across
//! reductions; a position with no accepting stack prefix is the stuck case.

use crate::rift::automaton::{Automaton, AutomatonState, InputClass};
use crate::rift::error::RiftError;
use crate::rift::matching::{skip_whitespace, MatchStrategy};
use crate::rift::token::{SourceMap, Token};

pub struct BottomUpStrategy;

/// A complete reduction: the pattern's anchored match consumes the stack
/// exactly
fn reduces(state: &AutomatonState, stack: &str) -> bool {
    state.match_len_at(stack) == Some(stack.len())
}

impl MatchStrategy for BottomUpStrategy {
    fn name(&self) -> &'static str {
        "bottom-up"
    }

    fn run(
        &self,
        automaton: &Automaton,
        input: &str,
        map: &SourceMap,
    ) -> Result<Vec<Token>, RiftError> {
        if automaton.state_count() == 0 {
            return Err(RiftError::StateMachineFailure(
                "bottom-up matching requested on an automaton with no states".to_string(),
            ));
        }

        let mut tokens = Vec::new();
        let mut pos = 0;
        loop {
            pos = skip_whitespace(input, pos);
            let rest = &input[pos..];
            let first = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };

            let candidates: Vec<&AutomatonState> =
                automaton.candidates(InputClass::of(first)).collect();

            let mut reduction: Option<(usize, &AutomatonState)> = None;
            for (i, c) in rest.char_indices() {
                let shifted = &rest[..i + c.len_utf8()];
                if let Some(state) = candidates.iter().copied().find(|s| reduces(s, shifted)) {
                    reduction = Some((shifted.len(), state));
                }
            }

            match reduction {
                Some((len, state)) => {
                    let (line, column) = map.position(pos);
                    tokens.push(Token::new(state.kind(), &rest[..len], line, column));
                    pos += len;
                }
                None => {
                    return Err(RiftError::Processing {
                        strategy: "bottom-up",
                        position: pos,
                    });
                }
            }
        }
        Ok(tokens)
    }
}
