//! Seven-stage pipeline orchestration
//!
//! Stages execute strictly in order; stage N+1 never starts before stage N
//! completed successfully and the transition into N+1 was approved by the
//! governance gate. Stage outputs travel as a tagged payload sum, so the
//! orchestrator pattern-matches on concrete shapes instead of casting blind
//! blobs.

pub mod config;
pub mod executor;
pub mod stage;

pub use config::PipelineConfig;
pub use executor::{PipelineOutcome, PipelineReport, StagePipeline, StageRecord};
pub use stage::{Stage, StageContext, StageExecution, StageId, StageOutcome, StagePayload, StageStatus};
