//! Stage interface and concrete stage implementations
//!
//! One generic interface covers all seven stages instead of repeating the
//! struct/function shape per stage. Stages with no defined algorithm yet
//! (semantic, validate, verify, emit) are explicit pass-through
//! implementations, so tests can distinguish "not yet implemented" from
//! "implemented as identity". The bytecode stage is pass-through in content
//! but attaches trust tags when asked to.

use crate::rift::error::RiftError;
use crate::rift::governance::{GovernanceTriangle, Verdict};
use crate::rift::memory::TokenMemory;
use crate::rift::token::Token;
use serde::Serialize;
use std::fmt;

/// The seven ordered stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    Tokenize,
    Parse,
    Semantic,
    Validate,
    Bytecode,
    Verify,
    Emit,
}

impl StageId {
    pub const ALL: [StageId; 7] = [
        StageId::Tokenize,
        StageId::Parse,
        StageId::Semantic,
        StageId::Validate,
        StageId::Bytecode,
        StageId::Verify,
        StageId::Emit,
    ];

    /// Position of this stage in the pipeline, 0-6
    pub fn index(&self) -> usize {
        match self {
            StageId::Tokenize => 0,
            StageId::Parse => 1,
            StageId::Semantic => 2,
            StageId::Validate => 3,
            StageId::Bytecode => 4,
            StageId::Verify => 5,
            StageId::Emit => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageId::Tokenize => "tokenize",
            StageId::Parse => "parse",
            StageId::Semantic => "semantic",
            StageId::Validate => "validate",
            StageId::Bytecode => "bytecode",
            StageId::Verify => "verify",
            StageId::Emit => "emit",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result code exposed by every stage, consumed by the orchestrator and by
/// external CLI layers for exit-code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageStatus {
    Success,
    InvalidInput,
    ProcessingError,
    ValidationError,
    MemoryError,
}

impl StageStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            StageStatus::Success => 0,
            StageStatus::InvalidInput => 2,
            StageStatus::ProcessingError => 3,
            StageStatus::ValidationError => 4,
            StageStatus::MemoryError => 5,
        }
    }
}

/// Map an error to the stage result code reported for it
pub fn status_for(error: &RiftError) -> StageStatus {
    match error {
        RiftError::InvalidSyntax { .. } | RiftError::InvalidArgument(_) => StageStatus::InvalidInput,
        RiftError::MemoryExhausted(_) => StageStatus::MemoryError,
        RiftError::ValidationMismatch { .. } => StageStatus::ValidationError,
        RiftError::Processing { .. }
        | RiftError::StateMachineFailure(_)
        | RiftError::GovernanceRejected { .. } => StageStatus::ProcessingError,
    }
}

/// Whether a stage carries a real algorithm or forwards its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageExecution {
    Implemented,
    PassThrough,
}

/// A line's worth of tokens, the parse stage's output unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxUnit {
    pub line: usize,
    pub tokens: Vec<Token>,
}

/// Governance metadata attached to an emitted bytecode unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrustTag {
    /// The verdict that approved the transition into the bytecode stage
    pub verdict: Verdict,
    /// Whether any transition so far was WARNING-flagged
    pub flagged: bool,
}

/// One emitted bytecode unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BytecodeUnit {
    pub unit: SyntaxUnit,
    pub tag: Option<TrustTag>,
}

/// Tagged stage output; the orchestrator pattern-matches on the concrete
/// shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StagePayload {
    Source(String),
    Tokens(Vec<Token>),
    Syntax(Vec<SyntaxUnit>),
    Bytecode(Vec<BytecodeUnit>),
}

impl StagePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            StagePayload::Source(_) => "source",
            StagePayload::Tokens(_) => "tokens",
            StagePayload::Syntax(_) => "syntax",
            StagePayload::Bytecode(_) => "bytecode",
        }
    }
}

/// Context threaded through one pipeline run, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct StageContext {
    pub current: StageId,
    pub last_verdict: Option<Verdict>,
    pub flagged_for_audit: bool,
}

impl StageContext {
    pub fn new() -> StageContext {
        StageContext {
            current: StageId::Tokenize,
            last_verdict: None,
            flagged_for_audit: false,
        }
    }
}

impl Default for StageContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What a stage returns: a result code, the next payload on success, the
/// error detail on failure
#[derive(Debug)]
pub struct StageOutcome {
    pub status: StageStatus,
    pub payload: Option<StagePayload>,
    pub error: Option<RiftError>,
}

impl StageOutcome {
    pub fn success(payload: StagePayload) -> StageOutcome {
        StageOutcome {
            status: StageStatus::Success,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failed(error: RiftError) -> StageOutcome {
        StageOutcome {
            status: status_for(&error),
            payload: None,
            error: Some(error),
        }
    }

    fn invalid_input(stage: StageId, payload: &StagePayload) -> StageOutcome {
        StageOutcome::failed(RiftError::InvalidArgument(format!(
            "{} stage received a {} payload",
            stage.name(),
            payload.kind()
        )))
    }
}

/// Generic stage interface: every concrete stage supplies its identity, its
/// entry risk profile, and its processing step
pub trait Stage {
    fn id(&self) -> StageId;

    fn execution(&self) -> StageExecution {
        StageExecution::Implemented
    }

    /// The risk of transitioning *into* this stage, computed fresh per
    /// transition attempt
    fn entry_triangle(&self) -> GovernanceTriangle;

    fn process(&self, payload: StagePayload, ctx: &StageContext) -> StageOutcome;
}

/// Stage 0: tokenize source text against the registered patterns
pub struct TokenizeStage {
    memory: TokenMemory,
    threads: usize,
}

impl TokenizeStage {
    pub fn new(memory: TokenMemory, threads: usize) -> TokenizeStage {
        TokenizeStage { memory, threads }
    }

    pub fn memory(&self) -> &TokenMemory {
        &self.memory
    }
}

impl Stage for TokenizeStage {
    fn id(&self) -> StageId {
        StageId::Tokenize
    }

    fn entry_triangle(&self) -> GovernanceTriangle {
        GovernanceTriangle::clamped(0.02, 0.02, 0.01)
    }

    fn process(&self, payload: StagePayload, _ctx: &StageContext) -> StageOutcome {
        let source = match payload {
            StagePayload::Source(source) => source,
            other => return StageOutcome::invalid_input(self.id(), &other),
        };
        match self.memory.process_parallel(&source, self.threads) {
            Ok(tokens) => match self.memory.validate_tokens() {
                Ok(()) => StageOutcome::success(StagePayload::Tokens(tokens)),
                Err(e) => StageOutcome::failed(e),
            },
            Err(e) => StageOutcome::failed(e),
        }
    }
}

/// Stage 1: group the token stream into line units for downstream stages
pub struct ParseStage;

impl Stage for ParseStage {
    fn id(&self) -> StageId {
        StageId::Parse
    }

    fn entry_triangle(&self) -> GovernanceTriangle {
        GovernanceTriangle::clamped(0.05, 0.05, 0.02)
    }

    fn process(&self, payload: StagePayload, _ctx: &StageContext) -> StageOutcome {
        let tokens = match payload {
            StagePayload::Tokens(tokens) => tokens,
            other => return StageOutcome::invalid_input(self.id(), &other),
        };
        let mut units: Vec<SyntaxUnit> = Vec::new();
        for token in tokens {
            match units.last_mut() {
                Some(unit) if unit.line == token.line() => unit.tokens.push(token),
                _ => units.push(SyntaxUnit {
                    line: token.line(),
                    tokens: vec![token],
                }),
            }
        }
        StageOutcome::success(StagePayload::Syntax(units))
    }
}

/// Stage 4: bytecode emission. Content is forwarded unchanged until a real
/// generator exists, but trust tags record the verdict that approved entry
/// into this stage, including any WARNING flag raised earlier in the run.
pub struct BytecodeStage {
    trust_tags: bool,
}

impl BytecodeStage {
    pub fn new(trust_tags: bool) -> BytecodeStage {
        BytecodeStage { trust_tags }
    }
}

impl Stage for BytecodeStage {
    fn id(&self) -> StageId {
        StageId::Bytecode
    }

    fn execution(&self) -> StageExecution {
        if self.trust_tags {
            StageExecution::Implemented
        } else {
            StageExecution::PassThrough
        }
    }

    fn entry_triangle(&self) -> GovernanceTriangle {
        // Generated code is the costliest stage to roll back
        GovernanceTriangle::clamped(0.08, 0.18, 0.06)
    }

    fn process(&self, payload: StagePayload, ctx: &StageContext) -> StageOutcome {
        let units = match payload {
            StagePayload::Syntax(units) => units,
            other => return StageOutcome::invalid_input(self.id(), &other),
        };
        let tag = if self.trust_tags {
            Some(TrustTag {
                verdict: ctx.last_verdict.unwrap_or(Verdict::Approved),
                flagged: ctx.flagged_for_audit,
            })
        } else {
            None
        };
        let emitted = units
            .into_iter()
            .map(|unit| BytecodeUnit { unit, tag })
            .collect();
        StageOutcome::success(StagePayload::Bytecode(emitted))
    }
}

/// Explicit pass-through for the stages with no defined algorithm yet
pub struct PassThroughStage {
    id: StageId,
    triangle: GovernanceTriangle,
}

impl PassThroughStage {
    pub fn semantic() -> PassThroughStage {
        PassThroughStage {
            id: StageId::Semantic,
            triangle: GovernanceTriangle::clamped(0.05, 0.08, 0.03),
        }
    }

    pub fn validate() -> PassThroughStage {
        PassThroughStage {
            id: StageId::Validate,
            triangle: GovernanceTriangle::clamped(0.04, 0.06, 0.02),
        }
    }

    pub fn verify() -> PassThroughStage {
        PassThroughStage {
            id: StageId::Verify,
            triangle: GovernanceTriangle::clamped(0.05, 0.1, 0.04),
        }
    }

    pub fn emit() -> PassThroughStage {
        PassThroughStage {
            id: StageId::Emit,
            triangle: GovernanceTriangle::clamped(0.06, 0.12, 0.05),
        }
    }
}

impl Stage for PassThroughStage {
    fn id(&self) -> StageId {
        self.id
    }

    fn execution(&self) -> StageExecution {
        StageExecution::PassThrough
    }

    fn entry_triangle(&self) -> GovernanceTriangle {
        self.triangle
    }

    fn process(&self, payload: StagePayload, _ctx: &StageContext) -> StageOutcome {
        StageOutcome::success(payload)
    }
}
