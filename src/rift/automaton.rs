//! Matching automaton built from parsed pattern literals
//!
//! The automaton holds one state per registered pattern. The first state
//! added to an empty automaton is marked initial unconditionally, and later
//! additions never move that marker (first-wins is a design decision the
//! matcher relies on for deterministic candidate ordering, not an artifact).
//!
//! Each state carries a transition row mapping the coarse input classes its
//! pattern can begin with to the state entered when matching starts. The
//! matching strategies consult these rows to prune candidate states before
//! attempting the (more expensive) anchored regex match. Rows are computed
//! as an over-approximation of the pattern's leading characters, so pruning
//! never drops a viable state.

use crate::rift::error::RiftError;
use crate::rift::pattern::{MatchMode, PatternSpec};
use regex::Regex;
use std::collections::HashMap;

/// Identifier of a state within one automaton
pub type StateId = usize;

/// Coarse classification of input characters used for candidate dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputClass {
    Alpha,
    Digit,
    Space,
    Punct,
}

impl InputClass {
    pub const ALL: [InputClass; 4] = [
        InputClass::Alpha,
        InputClass::Digit,
        InputClass::Space,
        InputClass::Punct,
    ];

    pub fn of(c: char) -> InputClass {
        if c.is_alphabetic() {
            InputClass::Alpha
        } else if c.is_numeric() {
            InputClass::Digit
        } else if c.is_whitespace() {
            InputClass::Space
        } else {
            InputClass::Punct
        }
    }
}

/// One node in the matching graph
#[derive(Debug)]
pub struct AutomatonState {
    id: StateId,
    pattern: PatternSpec,
    regex: Regex,
    kind: String,
    is_initial: bool,
    is_final: bool,
    transitions: HashMap<InputClass, StateId>,
}

impl AutomatonState {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn pattern(&self) -> &PatternSpec {
        &self.pattern
    }

    /// Token kind emitted when this state terminates a lexeme
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn transitions(&self) -> &HashMap<InputClass, StateId> {
        &self.transitions
    }

    /// Length of the anchored match at the start of `rest`, if any.
    ///
    /// Zero-length matches are reported as no match: a token that consumes
    /// nothing cannot advance the strategy and must not be emitted.
    pub fn match_len_at(&self, rest: &str) -> Option<usize> {
        match self.regex.find(rest) {
            Some(m) if m.start() == 0 && m.end() > 0 => Some(m.end()),
            _ => None,
        }
    }
}

/// Mutable collection of states built from one or more parsed patterns
#[derive(Debug, Default)]
pub struct Automaton {
    states: Vec<AutomatonState>,
    final_count: usize,
}

impl Automaton {
    pub fn new() -> Automaton {
        Automaton {
            states: Vec::new(),
            final_count: 0,
        }
    }

    /// Append a state compiled from `pattern`.
    ///
    /// The first call on an empty automaton marks the state initial
    /// unconditionally. A regex body the engine rejects is `InvalidSyntax`;
    /// an invalid spec is an `InvalidArgument` contract violation.
    pub fn add_state(&mut self, pattern: &PatternSpec, is_final: bool) -> Result<StateId, RiftError> {
        if !pattern.is_valid() {
            return Err(RiftError::InvalidArgument(format!(
                "cannot add state for invalid pattern {:?}",
                pattern.raw()
            )));
        }

        let regex = compile_anchored(pattern)?;
        let id = self.states.len();
        let kind = pattern
            .tag()
            .map(str::to_string)
            .unwrap_or_else(|| format!("p{}", id));

        let mut transitions = HashMap::new();
        for class in leading_classes(pattern.body()) {
            transitions.insert(class, id);
        }

        self.states.push(AutomatonState {
            id,
            pattern: pattern.clone(),
            regex,
            kind,
            is_initial: id == 0,
            is_final,
            transitions,
        });
        if is_final {
            self.final_count += 1;
        }
        Ok(id)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn final_count(&self) -> usize {
        self.final_count
    }

    pub fn state(&self, id: StateId) -> Option<&AutomatonState> {
        self.states.get(id)
    }

    pub fn states(&self) -> &[AutomatonState] {
        &self.states
    }

    pub fn initial(&self) -> Option<&AutomatonState> {
        self.states.first()
    }

    /// Final states whose transition row admits `class`, in insertion order
    pub fn candidates(&self, class: InputClass) -> impl Iterator<Item = &AutomatonState> {
        self.states
            .iter()
            .filter(move |s| s.is_final() && s.transitions.contains_key(&class))
    }

    /// Release all states; the next `add_state` becomes initial again
    pub fn clear(&mut self) {
        self.states.clear();
        self.final_count = 0;
    }

    /// The matching mode this automaton requests: the union of its member
    /// patterns' modes. Mixed strategies or any dual member means both
    /// strategies must run and agree.
    pub fn match_mode(&self) -> MatchMode {
        let mut saw_top_down = false;
        let mut saw_bottom_up = false;
        for state in &self.states {
            match state.pattern.mode() {
                MatchMode::TopDown => saw_top_down = true,
                MatchMode::BottomUp => saw_bottom_up = true,
                MatchMode::Dual => return MatchMode::Dual,
            }
        }
        match (saw_top_down, saw_bottom_up) {
            (true, true) => MatchMode::Dual,
            (false, true) => MatchMode::BottomUp,
            _ => MatchMode::TopDown,
        }
    }

    /// Whether any member pattern carries the multiline flag. Line-boundary
    /// partitioning is unsound for such automata.
    pub fn has_multiline(&self) -> bool {
        self.states.iter().any(|s| s.pattern.flags().multiline)
    }
}

/// Compile a pattern body anchored to the start of the haystack, honoring
/// the `i` and `m` flags
fn compile_anchored(pattern: &PatternSpec) -> Result<Regex, RiftError> {
    let flags = pattern.flags();
    let mut inline = String::new();
    if flags.case_insensitive {
        inline.push('i');
    }
    if flags.multiline {
        inline.push('m');
    }
    let source = if inline.is_empty() {
        format!(r"\A(?:{})", pattern.body())
    } else {
        format!(r"\A(?{}:{})", inline, pattern.body())
    };
    Regex::new(&source).map_err(|e| RiftError::InvalidSyntax {
        literal: pattern.raw().to_string(),
        reason: format!("regex body rejected: {}", e),
    })
}

/// Over-approximate the input classes a pattern can begin with.
///
/// Returns all classes whenever the leading shape is not cheaply
/// determinable (alternation, optional first unit, anchors, groups). The
/// result is only ever used to prune candidates, so imprecision must always
/// err toward including more classes.
fn leading_classes(body: &str) -> Vec<InputClass> {
    if body.contains('|') {
        return InputClass::ALL.to_vec();
    }

    let chars: Vec<char> = body.chars().collect();
    let (classes, consumed) = match chars.first() {
        None => return InputClass::ALL.to_vec(),
        Some('[') => match char_class_classes(&chars) {
            Some((classes, end)) => (classes, end + 1),
            None => return InputClass::ALL.to_vec(),
        },
        Some('\\') => match chars.get(1) {
            Some('d') => (vec![InputClass::Digit], 2),
            Some('s') => (vec![InputClass::Space], 2),
            Some('w') => (
                vec![InputClass::Alpha, InputClass::Digit, InputClass::Punct],
                2,
            ),
            Some(c) if c.is_ascii_punctuation() => (vec![InputClass::of(*c)], 2),
            _ => return InputClass::ALL.to_vec(),
        },
        Some('(') | Some('.') | Some('^') | Some('$') => return InputClass::ALL.to_vec(),
        Some(c) => (vec![InputClass::of(*c)], 1),
    };

    // An optional or repeatable-from-zero first unit means the next unit can
    // begin the match instead; give up rather than analyze further.
    match chars.get(consumed) {
        Some('?') | Some('*') | Some('{') => InputClass::ALL.to_vec(),
        _ => classes,
    }
}

/// Classes admitted by a leading `[...]` character class, plus the index of
/// its closing bracket. `None` means "not determinable".
fn char_class_classes(chars: &[char]) -> Option<(Vec<InputClass>, usize)> {
    if chars.get(1) == Some(&'^') {
        return None;
    }
    let end = chars.iter().position(|c| *c == ']')?;
    let set = &chars[1..end];
    let mut classes: Vec<InputClass> = Vec::new();
    let push = |class: InputClass, classes: &mut Vec<InputClass>| {
        if !classes.contains(&class) {
            classes.push(class);
        }
    };

    let mut i = 0;
    while i < set.len() {
        if set[i] == '\\' {
            match set.get(i + 1) {
                Some('d') => push(InputClass::Digit, &mut classes),
                Some('s') => push(InputClass::Space, &mut classes),
                Some('w') => {
                    push(InputClass::Alpha, &mut classes);
                    push(InputClass::Digit, &mut classes);
                    push(InputClass::Punct, &mut classes);
                }
                Some(c) => push(InputClass::of(*c), &mut classes),
                None => return None,
            }
            i += 2;
            continue;
        }
        if i + 2 < set.len() && set[i + 1] == '-' {
            let (a, b) = (set[i], set[i + 2]);
            if a.is_ascii_digit() && b.is_ascii_digit() {
                push(InputClass::Digit, &mut classes);
            } else if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() {
                push(InputClass::Alpha, &mut classes);
            } else {
                // Range endpoints in different classes can cover anything
                return None;
            }
            i += 3;
            continue;
        }
        push(InputClass::of(set[i]), &mut classes);
        i += 1;
    }
    Some((classes, end))
}
