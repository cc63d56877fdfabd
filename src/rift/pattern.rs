//! Pattern literal parsing
//!
//! A pattern literal embeds a regular expression, a flag set, and a
//! parsing-mode selector in one delimited string:
//!
//!     R"<regex>/<flags>[<mode>]"
//!
//! (or the single-quote variant `R'...'`). The regex body is everything up to
//! the last unescaped `/` before the flags segment, so forward slashes inside
//! the body need no special treatment. Splitting on the first `/` loses part
//! of the body and is rejected by the regression tests in this module.
//!
//! Flags are drawn from `{g, m, i, b, t}`. The mode bracket holds exactly one
//! display character, `b` (bottom-up) or `t` (top-down); when both `b` and
//! `t` appear in the flag set, dual-mode matching is enabled and both
//! strategies run.

use crate::rift::error::RiftError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Valid flag-segment shape; individual characters are mapped by
/// [PatternFlags::from_segment]
static FLAGS_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[gmibt]*$").expect("flag segment shape is a valid regex"));

/// Flag set extracted from a pattern literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PatternFlags {
    pub global: bool,
    pub multiline: bool,
    pub case_insensitive: bool,
    pub bottom_up: bool,
    pub top_down: bool,
}

impl PatternFlags {
    /// Parse the flags segment of a literal. Unknown characters make the
    /// whole literal invalid.
    pub fn from_segment(segment: &str, literal: &str) -> Result<Self, RiftError> {
        if !FLAGS_SEGMENT.is_match(segment) {
            let offending = segment
                .chars()
                .find(|c| !matches!(c, 'g' | 'm' | 'i' | 'b' | 't'))
                .unwrap_or('?');
            return Err(RiftError::InvalidSyntax {
                literal: literal.to_string(),
                reason: format!("unknown flag character '{}'", offending),
            });
        }
        let mut flags = PatternFlags::default();
        for c in segment.chars() {
            match c {
                'g' => flags.global = true,
                'm' => flags.multiline = true,
                'i' => flags.case_insensitive = true,
                'b' => flags.bottom_up = true,
                't' => flags.top_down = true,
                _ => unreachable!("segment shape already validated"),
            }
        }
        Ok(flags)
    }

    /// Both strategy flags present: the literal requests dual-mode matching
    pub fn dual_mode_enabled(&self) -> bool {
        self.bottom_up && self.top_down
    }
}

/// Which matching strategy (or both) a pattern selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchMode {
    BottomUp,
    TopDown,
    Dual,
}

/// One parsed pattern literal. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSpec {
    raw: String,
    body: String,
    flags: PatternFlags,
    mode: MatchMode,
    valid: bool,
    tag: Option<String>,
}

impl PatternSpec {
    /// Parse a pattern literal into a spec.
    ///
    /// Pure function: no side effects, no caching. All failures are
    /// `InvalidSyntax` echoing the offending literal.
    pub fn parse(raw: &str) -> Result<PatternSpec, RiftError> {
        let invalid = |reason: String| RiftError::InvalidSyntax {
            literal: raw.to_string(),
            reason,
        };

        let bytes = raw.as_bytes();
        if bytes.len() < 2 || bytes[0] != b'R' || !(bytes[1] == b'"' || bytes[1] == b'\'') {
            return Err(invalid("expected R\" or R' opening delimiter".to_string()));
        }
        let quote = bytes[1];
        if bytes.len() < 4 || bytes[bytes.len() - 1] != quote {
            return Err(invalid("unterminated or mismatched closing delimiter".to_string()));
        }

        let inner = &raw[2..raw.len() - 1];
        let inner_bytes = inner.as_bytes();
        if inner_bytes.len() < 3
            || inner_bytes[inner_bytes.len() - 1] != b']'
            || inner_bytes[inner_bytes.len() - 3] != b'['
        {
            return Err(invalid(
                "expected single-character mode bracket before closing delimiter".to_string(),
            ));
        }
        let mode_char = inner_bytes[inner_bytes.len() - 2] as char;
        let head = &inner[..inner.len() - 3];

        // The body may contain both escaped and unescaped slashes; the
        // delimiter is the LAST unescaped one before the flags segment.
        let mut split = None;
        let head_bytes = head.as_bytes();
        for (i, b) in head_bytes.iter().enumerate() {
            if *b == b'/' {
                let mut backslashes = 0;
                let mut j = i;
                while j > 0 && head_bytes[j - 1] == b'\\' {
                    backslashes += 1;
                    j -= 1;
                }
                if backslashes % 2 == 0 {
                    split = Some(i);
                }
            }
        }
        let split = split.ok_or_else(|| invalid("missing /<flags> separator".to_string()))?;

        let body = &head[..split];
        if body.is_empty() {
            return Err(invalid("empty regex body".to_string()));
        }
        let flags = PatternFlags::from_segment(&head[split + 1..], raw)?;

        // The bracket carries a single display character even in dual mode;
        // it must name one of the two strategies.
        if !matches!(mode_char, 'b' | 't') {
            return Err(invalid(format!("invalid mode character '{}'", mode_char)));
        }
        let mode = if flags.dual_mode_enabled() {
            MatchMode::Dual
        } else if mode_char == 'b' {
            MatchMode::BottomUp
        } else {
            MatchMode::TopDown
        };

        Ok(PatternSpec {
            raw: raw.to_string(),
            body: body.to_string(),
            flags,
            mode,
            valid: true,
            tag: None,
        })
    }

    /// Construct a spec that records an unparseable literal. Stores that
    /// reject invalid specs use this in their contract tests.
    pub fn invalid(raw: &str) -> PatternSpec {
        PatternSpec {
            raw: raw.to_string(),
            body: String::new(),
            flags: PatternFlags::default(),
            mode: MatchMode::TopDown,
            valid: false,
            tag: None,
        }
    }

    /// Attach the symbolic tag emitted as the token kind for this pattern
    pub fn tagged(mut self, tag: impl Into<String>) -> PatternSpec {
        self.tag = Some(tag.into());
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_literal() {
        let spec = PatternSpec::parse("R\"[A-Z]+/gmi[t]\"").unwrap();
        assert_eq!(spec.body(), "[A-Z]+");
        assert_eq!(
            spec.flags(),
            PatternFlags {
                global: true,
                multiline: true,
                case_insensitive: true,
                bottom_up: false,
                top_down: false,
            }
        );
        assert_eq!(spec.mode(), MatchMode::TopDown);
        assert!(spec.is_valid());
        assert_eq!(spec.raw(), "R\"[A-Z]+/gmi[t]\"");
    }

    #[test]
    fn test_single_quote_variant() {
        let spec = PatternSpec::parse("R'[0-9]+/g[b]'").unwrap();
        assert_eq!(spec.body(), "[0-9]+");
        assert_eq!(spec.mode(), MatchMode::BottomUp);
    }

    #[test]
    fn test_body_with_unescaped_slashes() {
        // The body contains two slashes; only the last one before the flags
        // segment splits. First-slash splitting would recover just "a".
        let spec = PatternSpec::parse("R\"a/b/c/gi[t]\"").unwrap();
        assert_eq!(spec.body(), "a/b/c");
        assert!(spec.flags().global);
        assert!(spec.flags().case_insensitive);
    }

    #[test]
    fn test_body_with_escaped_slash() {
        let spec = PatternSpec::parse("R\"a\\/b/g[t]\"").unwrap();
        assert_eq!(spec.body(), "a\\/b");
    }

    #[test]
    fn test_escaped_backslash_before_slash_still_splits() {
        // "\\/" is an escaped backslash followed by a real slash separator
        let spec = PatternSpec::parse("R\"a\\\\/g[t]\"").unwrap();
        assert_eq!(spec.body(), "a\\\\");
        assert!(spec.flags().global);
    }

    #[test]
    fn test_dual_mode_from_flags() {
        let spec = PatternSpec::parse("R\"[a-z]+/gbt[t]\"").unwrap();
        assert!(spec.flags().dual_mode_enabled());
        assert_eq!(spec.mode(), MatchMode::Dual);
    }

    #[test]
    fn test_empty_flags_segment() {
        let spec = PatternSpec::parse("R\"x+/[b]\"").unwrap();
        assert_eq!(spec.body(), "x+");
        assert_eq!(spec.flags(), PatternFlags::default());
        assert_eq!(spec.mode(), MatchMode::BottomUp);
    }

    #[test]
    fn test_missing_opening_delimiter() {
        let err = PatternSpec::parse("\"[A-Z]+/g[t]\"").unwrap_err();
        assert!(matches!(err, RiftError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_mismatched_closing_delimiter() {
        let err = PatternSpec::parse("R\"[A-Z]+/g[t]'").unwrap_err();
        assert!(matches!(err, RiftError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_empty_body() {
        let err = PatternSpec::parse("R\"/g[t]\"").unwrap_err();
        match err {
            RiftError::InvalidSyntax { literal, reason } => {
                assert_eq!(literal, "R\"/g[t]\"");
                assert!(reason.contains("empty regex body"));
            }
            other => panic!("expected InvalidSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_flag() {
        let err = PatternSpec::parse("R\"[A-Z]+/gx[t]\"").unwrap_err();
        match err {
            RiftError::InvalidSyntax { reason, .. } => {
                assert!(reason.contains("unknown flag character 'x'"));
            }
            other => panic!("expected InvalidSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_mode_bracket() {
        let err = PatternSpec::parse("R\"[A-Z]+/g\"").unwrap_err();
        assert!(matches!(err, RiftError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_multi_character_mode_bracket() {
        let err = PatternSpec::parse("R\"[A-Z]+/g[bt]\"").unwrap_err();
        assert!(matches!(err, RiftError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_invalid_mode_character() {
        let err = PatternSpec::parse("R\"[A-Z]+/g[x]\"").unwrap_err();
        match err {
            RiftError::InvalidSyntax { reason, .. } => {
                assert!(reason.contains("invalid mode character 'x'"));
            }
            other => panic!("expected InvalidSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_flags_separator() {
        let err = PatternSpec::parse("R\"abc[t]\"").unwrap_err();
        match err {
            RiftError::InvalidSyntax { reason, .. } => {
                assert!(reason.contains("missing /<flags> separator"));
            }
            other => panic!("expected InvalidSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_tagged_spec() {
        let spec = PatternSpec::parse("R\"[a-z]+/g[t]\"").unwrap().tagged("WORD");
        assert_eq!(spec.tag(), Some("WORD"));
    }

    #[test]
    fn test_invalid_constructor() {
        let spec = PatternSpec::invalid("garbage");
        assert!(!spec.is_valid());
        assert_eq!(spec.raw(), "garbage");
    }

    #[test]
    fn test_parse_is_pure() {
        let a = PatternSpec::parse("R\"[A-Z]+/gmi[t]\"").unwrap();
        let b = PatternSpec::parse("R\"[A-Z]+/gmi[t]\"").unwrap();
        assert_eq!(a, b);
    }
}
