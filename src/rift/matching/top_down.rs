//! Top-down recursive-descent matching
//!
//! At each position the strategy collects the final states whose anchored
//! match consumes input, longest match first (insertion order breaks ties),
//! attempts the best candidate, and recurses into the remainder. When the
//! remainder cannot be tokenized the strategy backtracks and tries the next
//! candidate. The furthest position reached with no viable candidate is the
//! stuck position reported on failure.

use crate::rift::automaton::{Automaton, AutomatonState, InputClass};
use crate::rift::error::RiftError;
use crate::rift::matching::{skip_whitespace, MatchStrategy};
use crate::rift::token::{SourceMap, Token};

pub struct TopDownStrategy;

impl TopDownStrategy {
    fn descend(
        automaton: &Automaton,
        input: &str,
        pos: usize,
        map: &SourceMap,
        furthest: &mut usize,
    ) -> Option<Vec<Token>> {
        let pos = skip_whitespace(input, pos);
        let rest = &input[pos..];
        let first = match rest.chars().next() {
            Some(c) => c,
            None => return Some(Vec::new()),
        };

        let mut candidates: Vec<(usize, &AutomatonState)> = automaton
            .candidates(InputClass::of(first))
            .filter_map(|state| state.match_len_at(rest).map(|len| (len, state)))
            .collect();
        // Stable sort: longest first, insertion order among equal lengths
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        if candidates.is_empty() {
            *furthest = (*furthest).max(pos);
            return None;
        }

        for (len, state) in candidates {
            if let Some(tail) = Self::descend(automaton, input, pos + len, map, furthest) {
                let (line, column) = map.position(pos);
                let mut tokens = Vec::with_capacity(tail.len() + 1);
                tokens.push(Token::new(state.kind(), &rest[..len], line, column));
                tokens.extend(tail);
                return Some(tokens);
            }
        }
        None
    }
}

impl MatchStrategy for TopDownStrategy {
    fn name(&self) -> &'static str {
        "top-down"
    }

    fn run(
        &self,
        automaton: &Automaton,
        input: &str,
        map: &SourceMap,
    ) -> Result<Vec<Token>, RiftError> {
        if automaton.state_count() == 0 {
            return Err(RiftError::StateMachineFailure(
                "top-down matching requested on an automaton with no states".to_string(),
            ));
        }
        let mut furthest = 0;
        Self::descend(automaton, input, 0, map, &mut furthest).ok_or(RiftError::Processing {
            strategy: "top-down",
            position: furthest,
        })
    }
}
