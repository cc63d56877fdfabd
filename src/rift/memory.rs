//! Thread-safe store of emitted tokens and pattern definitions
//!
//! One mutex guards both the pattern list and the token buffer. Matching
//! never runs under the lock: `process` takes a snapshot of the pattern
//! list, releases the lock, matches against the snapshot, and appends the
//! produced tokens in a single locked step (drain-and-append; no reader ever
//! observes a partially updated pattern list or token buffer).
//!
//! Tokens are immutable once emitted. Later pattern-list changes never touch
//! tokens already in the buffer.

use crate::rift::automaton::Automaton;
use crate::rift::error::RiftError;
use crate::rift::matching::DualModeMatcher;
use crate::rift::pattern::PatternSpec;
use crate::rift::token::Token;
use rayon::prelude::*;
use std::sync::Mutex;

/// Outcome of an enhancement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceOutcome {
    /// The enrichment point ran but no enrichment is implemented yet;
    /// the token sequence is unchanged
    PassThrough,
    /// A real enrichment pass rewrote this many tokens
    Enriched(usize),
}

#[derive(Default)]
struct MemoryInner {
    patterns: Vec<PatternSpec>,
    tokens: Vec<Token>,
    enhancement_passes: u32,
}

/// Mutex-guarded token and pattern store
pub struct TokenMemory {
    inner: Mutex<MemoryInner>,
    capacity: Option<usize>,
}

impl TokenMemory {
    pub fn new() -> TokenMemory {
        TokenMemory {
            inner: Mutex::new(MemoryInner::default()),
            capacity: None,
        }
    }

    /// Store that refuses to hold more than `capacity` tokens
    pub fn with_capacity_limit(capacity: usize) -> TokenMemory {
        TokenMemory {
            inner: Mutex::new(MemoryInner::default()),
            capacity: Some(capacity),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock means a worker panicked mid-append; the data is
        // still structurally sound (append is a single extend)
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a pattern. Invalid specs are rejected; untagged specs get an
    /// index-derived tag. Tokens already emitted are never touched.
    pub fn add_pattern(&self, spec: PatternSpec) -> Result<(), RiftError> {
        if !spec.is_valid() {
            return Err(RiftError::InvalidArgument(format!(
                "refusing to register invalid pattern {:?}",
                spec.raw()
            )));
        }
        let mut inner = self.lock();
        let spec = if spec.tag().is_none() {
            let tag = format!("pattern{}", inner.patterns.len());
            spec.tagged(tag)
        } else {
            spec
        };
        inner.patterns.push(spec);
        Ok(())
    }

    pub fn pattern_count(&self) -> usize {
        self.lock().patterns.len()
    }

    /// Snapshot of the registered patterns
    pub fn patterns(&self) -> Vec<PatternSpec> {
        self.lock().patterns.clone()
    }

    /// Build an automaton from the current pattern snapshot. Every
    /// registered pattern terminates a token, so all states are final.
    pub fn build_automaton(&self) -> Result<Automaton, RiftError> {
        let snapshot = self.patterns();
        let mut automaton = Automaton::new();
        for spec in &snapshot {
            automaton.add_state(spec, true)?;
        }
        Ok(automaton)
    }

    /// Match `input` against the registered patterns and append the produced
    /// tokens to the store. Returns the tokens produced by this call.
    pub fn process(&self, input: &str) -> Result<Vec<Token>, RiftError> {
        let automaton = self.build_automaton()?;
        let report = DualModeMatcher::run(&automaton, input)?;
        let produced = report.into_tokens();
        self.append(produced.clone())?;
        Ok(produced)
    }

    /// Like [TokenMemory::process], with the input partitioned at line
    /// boundaries across a pool of `threads` workers. Sub-sequences are
    /// merged in position order, so the emitted order is identical to the
    /// sequential path.
    ///
    /// Partitioning is bypassed when any pattern is multiline (a token could
    /// span a partition boundary) or when one worker suffices.
    pub fn process_parallel(&self, input: &str, threads: usize) -> Result<Vec<Token>, RiftError> {
        let automaton = self.build_automaton()?;
        let partitions = partition_lines(input, threads);
        if threads <= 1 || automaton.has_multiline() || partitions.len() <= 1 {
            let report = DualModeMatcher::run(&automaton, input)?;
            let produced = report.into_tokens();
            self.append(produced.clone())?;
            return Ok(produced);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| RiftError::InvalidArgument(format!("worker pool: {}", e)))?;

        let results: Vec<Result<Vec<Token>, RiftError>> = pool.install(|| {
            partitions
                .par_iter()
                .map(|part| {
                    DualModeMatcher::run_from(&automaton, part.text, part.base_line)
                        .map(|report| report.into_tokens())
                        .map_err(|e| part.globalize(e))
                })
                .collect()
        });

        let mut produced = Vec::new();
        for result in results {
            produced.extend(result?);
        }
        self.append(produced.clone())?;
        Ok(produced)
    }

    fn append(&self, produced: Vec<Token>) -> Result<(), RiftError> {
        let mut inner = self.lock();
        if let Some(capacity) = self.capacity {
            if inner.tokens.len() + produced.len() > capacity {
                return Err(RiftError::MemoryExhausted(format!(
                    "token store capacity {} exceeded ({} stored, {} incoming)",
                    capacity,
                    inner.tokens.len(),
                    produced.len()
                )));
            }
        }
        inner.tokens.extend(produced);
        Ok(())
    }

    /// Snapshot of all tokens emitted so far, in emission order
    pub fn tokens(&self) -> Vec<Token> {
        self.lock().tokens.clone()
    }

    pub fn token_count(&self) -> usize {
        self.lock().tokens.len()
    }

    /// Check the stored tokens against the store's structural invariants:
    /// non-empty kind and value, 1-based positions
    pub fn validate_tokens(&self) -> Result<(), RiftError> {
        let inner = self.lock();
        for (i, token) in inner.tokens.iter().enumerate() {
            if token.kind().is_empty() {
                return Err(RiftError::StateMachineFailure(format!(
                    "token {} has an empty kind",
                    i
                )));
            }
            if token.value().is_empty() {
                return Err(RiftError::StateMachineFailure(format!(
                    "token {} ({}) has an empty value",
                    i,
                    token.kind()
                )));
            }
            if token.line() == 0 || token.column() == 0 {
                return Err(RiftError::StateMachineFailure(format!(
                    "token {} ({}) has a zero position",
                    i,
                    token.kind()
                )));
            }
        }
        Ok(())
    }

    /// Enrichment point for later passes. Applying it any number of times
    /// leaves the token sequence unchanged.
    pub fn enhance_tokens(&self) -> Result<EnhanceOutcome, RiftError> {
        let mut inner = self.lock();
        inner.enhancement_passes += 1;
        Ok(EnhanceOutcome::PassThrough)
    }

    /// How many enhancement passes have run
    pub fn enhancement_passes(&self) -> u32 {
        self.lock().enhancement_passes
    }

    /// Release all patterns and tokens
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.patterns.clear();
        inner.tokens.clear();
        inner.enhancement_passes = 0;
    }
}

impl Default for TokenMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// One worker partition: a chunk of whole lines and its global coordinates
struct Partition<'a> {
    text: &'a str,
    byte_offset: usize,
    base_line: usize,
}

impl Partition<'_> {
    /// Rebase a chunk-local error position onto the full input
    fn globalize(&self, error: RiftError) -> RiftError {
        match error {
            RiftError::Processing { strategy, position } => RiftError::Processing {
                strategy,
                position: position + self.byte_offset,
            },
            other => other,
        }
    }
}

/// Split `input` at line boundaries into at most `parts` chunks of roughly
/// equal line counts
fn partition_lines(input: &str, parts: usize) -> Vec<Partition<'_>> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut line_starts = vec![0];
    for (i, b) in input.bytes().enumerate() {
        if b == b'\n' && i + 1 < input.len() {
            line_starts.push(i + 1);
        }
    }
    let total_lines = line_starts.len();
    let parts = parts.max(1).min(total_lines);
    let per_chunk = total_lines.div_ceil(parts);

    let mut partitions = Vec::new();
    let mut line = 0;
    while line < total_lines {
        let end_line = (line + per_chunk).min(total_lines);
        let start = line_starts[line];
        let end = if end_line < total_lines {
            line_starts[end_line]
        } else {
            input.len()
        };
        partitions.push(Partition {
            text: &input[start..end],
            byte_offset: start,
            base_line: line + 1,
        });
        line = end_line;
    }
    partitions
}
