//! Token record and source position index
//!
//! A token keeps its category and its raw matched text in separate fields.
//! That separation is the core correctness property of the store: no
//! operation may collapse the two into one field, and a token is never
//! mutated after creation (all fields are private, accessors only).
//!
//! Positions are 1-based line/column pairs derived from a [SourceMap] so
//! that both matching strategies, and every worker partition, report
//! identical locations for the same byte offset.

use serde::Serialize;

/// One recognized lexical unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    line: usize,
    column: usize,
}

impl Token {
    pub fn new(
        kind: impl Into<String>,
        value: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Token {
        Token {
            kind: kind.into(),
            value: value.into(),
            line,
            column,
        }
    }

    /// Symbolic category tag
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Raw matched text
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 1-based source line
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based source column
    pub fn column(&self) -> usize {
        self.column
    }
}

/// Byte-offset to line/column index for one input
pub struct SourceMap {
    line_starts: Vec<usize>,
    base_line: usize,
}

impl SourceMap {
    pub fn new(source: &str) -> SourceMap {
        SourceMap::with_base_line(source, 1)
    }

    /// Index a partition whose first line is `base_line` in the full input.
    /// Workers matching disjoint line ranges use this so merged tokens carry
    /// global line numbers.
    pub fn with_base_line(source: &str, base_line: usize) -> SourceMap {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap {
            line_starts,
            base_line,
        }
    }

    /// Resolve a byte offset to a (line, column) pair, both 1-based
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let idx = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let line = self.base_line + idx;
        let column = offset - self.line_starts[idx] + 1;
        (line, column)
    }
}
