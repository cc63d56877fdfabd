//! Pipeline orchestrator
//!
//! Runs the seven stages strictly in order. Before entering stage N+1 the
//! orchestrator computes that stage's entry triangle and asks the governance
//! gate: APPROVED proceeds, WARNING proceeds but flags the context for audit
//! (and halts instead under strict mode), REJECTED halts at stage N without
//! invoking stage N+1. A non-success stage result halts at that stage
//! regardless of governance; stage failure always dominates approval.
//!
//! The report records, per executed stage, the result code and the verdict
//! with its full triangle values, so external tooling can render diagnostics
//! without re-deriving the computation.

use crate::rift::definitions::parse_definitions;
use crate::rift::error::RiftError;
use crate::rift::governance::{GovernanceGate, GovernanceTriangle, Verdict};
use crate::rift::memory::TokenMemory;
use crate::rift::pattern::PatternSpec;
use crate::rift::pipeline::config::PipelineConfig;
use crate::rift::pipeline::stage::{
    BytecodeStage, ParseStage, PassThroughStage, Stage, StageContext, StageExecution, StageId,
    StageOutcome, StagePayload, StageStatus, TokenizeStage,
};
use serde::Serialize;

/// Per-stage entry in the pipeline report
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: StageId,
    pub execution: StageExecution,
    /// `None` when the stage was never invoked (its entry was rejected)
    pub status: Option<StageStatus>,
    /// Verdict for the transition into this stage; `None` for stage 0
    pub verdict: Option<Verdict>,
    pub triangle: Option<GovernanceTriangle>,
}

/// What a finished (or halted) run looked like
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub records: Vec<StageRecord>,
    pub flagged_for_audit: bool,
    /// Final payload of a completed run
    pub payload: Option<StagePayload>,
}

/// Terminal state of one pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(PipelineReport),
    Halted {
        stage: StageId,
        error: RiftError,
        report: PipelineReport,
    },
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }

    pub fn report(&self) -> &PipelineReport {
        match self {
            PipelineOutcome::Completed(report) => report,
            PipelineOutcome::Halted { report, .. } => report,
        }
    }
}

/// Orchestrates the seven stages over one source input
pub struct StagePipeline {
    stages: Vec<Box<dyn Stage>>,
    gate: GovernanceGate,
    config: PipelineConfig,
}

impl std::fmt::Debug for StagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagePipeline")
            .field("stages", &self.stages.len())
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish()
    }
}

impl StagePipeline {
    /// Build a pipeline from already-parsed pattern specs
    pub fn new(config: PipelineConfig, patterns: Vec<PatternSpec>) -> Result<StagePipeline, RiftError> {
        let memory = match config.token_capacity {
            Some(capacity) => TokenMemory::with_capacity_limit(capacity),
            None => TokenMemory::new(),
        };
        for spec in patterns {
            memory.add_pattern(spec)?;
        }

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(TokenizeStage::new(memory, config.thread_count)),
            Box::new(ParseStage),
            Box::new(PassThroughStage::semantic()),
            Box::new(PassThroughStage::validate()),
            Box::new(BytecodeStage::new(config.trust_tags)),
            Box::new(PassThroughStage::verify()),
            Box::new(PassThroughStage::emit()),
        ];
        Ok(StagePipeline {
            stages,
            gate: GovernanceGate::new(config.thresholds),
            config,
        })
    }

    /// Build a pipeline from a pattern-definitions source
    pub fn from_definitions(config: PipelineConfig, source: &str) -> Result<StagePipeline, RiftError> {
        let patterns = parse_definitions(source)?;
        Self::new(config, patterns)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all seven stages over `source`
    pub fn run(&self, source: &str) -> PipelineOutcome {
        let mut ctx = StageContext::new();
        let mut records: Vec<StageRecord> = Vec::new();
        let mut payload = StagePayload::Source(source.to_string());

        for stage in &self.stages {
            let mut verdict = None;
            let mut triangle = None;
            if stage.id().index() > 0 {
                let entry = stage.entry_triangle();
                let decision = self.gate.evaluate(&entry);
                triangle = Some(entry);
                verdict = Some(decision);

                let halt = match decision {
                    Verdict::Approved => false,
                    Verdict::Warning => {
                        ctx.flagged_for_audit = true;
                        self.config.strict_mode
                    }
                    Verdict::Rejected => true,
                };
                if halt {
                    records.push(StageRecord {
                        stage: stage.id(),
                        execution: stage.execution(),
                        status: None,
                        verdict,
                        triangle,
                    });
                    let completed = StageId::ALL[stage.id().index() - 1];
                    return PipelineOutcome::Halted {
                        stage: completed,
                        error: RiftError::GovernanceRejected {
                            stage: completed.index(),
                            attack_risk: entry.attack_risk(),
                            rollback_cost: entry.rollback_cost(),
                            stability_impact: entry.stability_impact(),
                        },
                        report: PipelineReport {
                            records,
                            flagged_for_audit: ctx.flagged_for_audit,
                            payload: None,
                        },
                    };
                }
                ctx.last_verdict = Some(decision);
            }

            ctx.current = stage.id();
            let outcome: StageOutcome = stage.process(payload, &ctx);
            records.push(StageRecord {
                stage: stage.id(),
                execution: stage.execution(),
                status: Some(outcome.status),
                verdict,
                triangle,
            });

            if outcome.status != StageStatus::Success {
                let error = outcome.error.unwrap_or_else(|| {
                    RiftError::StateMachineFailure(format!(
                        "{} stage failed without error detail",
                        stage.id()
                    ))
                });
                return PipelineOutcome::Halted {
                    stage: stage.id(),
                    error,
                    report: PipelineReport {
                        records,
                        flagged_for_audit: ctx.flagged_for_audit,
                        payload: None,
                    },
                };
            }
            payload = match outcome.payload {
                Some(next) => next,
                None => {
                    let error = RiftError::StateMachineFailure(format!(
                        "{} stage reported success without a payload",
                        stage.id()
                    ));
                    return PipelineOutcome::Halted {
                        stage: stage.id(),
                        error,
                        report: PipelineReport {
                            records,
                            flagged_for_audit: ctx.flagged_for_audit,
                            payload: None,
                        },
                    };
                }
            };
        }

        PipelineOutcome::Completed(PipelineReport {
            records,
            flagged_for_audit: ctx.flagged_for_audit,
            payload: Some(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rift::governance::GovernanceThresholds;
    use crate::rift::pipeline::stage::BytecodeUnit;

    const DEFS: &str = "WORD R\"[a-z]+/gbt[t]\"\nNUMBER R\"[0-9]+/gbt[t]\"\n";

    fn pipeline(config: PipelineConfig) -> StagePipeline {
        StagePipeline::from_definitions(config, DEFS).unwrap()
    }

    fn bytecode_units(report: &PipelineReport) -> Vec<BytecodeUnit> {
        match &report.payload {
            Some(StagePayload::Bytecode(units)) => units.clone(),
            other => panic!("expected bytecode payload, got {:?}", other),
        }
    }

    #[test]
    fn test_completed_run_covers_all_seven_stages() {
        let outcome = pipeline(PipelineConfig::default()).run("abc 42\ndef 7");
        assert!(outcome.is_completed());
        let report = outcome.report();
        assert_eq!(report.records.len(), 7);
        for (i, record) in report.records.iter().enumerate() {
            assert_eq!(record.stage.index(), i);
            assert_eq!(record.status, Some(StageStatus::Success));
            if i == 0 {
                assert!(record.verdict.is_none());
            } else {
                assert_eq!(record.verdict, Some(Verdict::Approved));
                assert!(record.triangle.is_some());
            }
        }
        assert!(!report.flagged_for_audit);
        assert_eq!(bytecode_units(report).len(), 2);
    }

    #[test]
    fn test_stage_failure_halts_at_that_stage() {
        let outcome = pipeline(PipelineConfig::default()).run("abc @@@");
        match outcome {
            PipelineOutcome::Halted { stage, error, report } => {
                assert_eq!(stage, StageId::Tokenize);
                assert!(matches!(error, RiftError::Processing { .. }));
                assert_eq!(report.records.len(), 1);
                assert_eq!(
                    report.records[0].status,
                    Some(StageStatus::ProcessingError)
                );
            }
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[test]
    fn test_rejection_halts_before_invoking_next_stage() {
        // A zero attack-risk threshold rejects the very first transition
        let config = PipelineConfig {
            thresholds: GovernanceThresholds {
                attack_risk: 0.0,
                ..GovernanceThresholds::default()
            },
            ..PipelineConfig::default()
        };
        let outcome = pipeline(config).run("abc");
        match outcome {
            PipelineOutcome::Halted { stage, error, report } => {
                assert_eq!(stage, StageId::Tokenize);
                match error {
                    RiftError::GovernanceRejected { stage, .. } => assert_eq!(stage, 0),
                    other => panic!("expected GovernanceRejected, got {:?}", other),
                }
                // Tokenize ran; the rejected parse stage was never invoked
                assert_eq!(report.records.len(), 2);
                assert_eq!(report.records[0].status, Some(StageStatus::Success));
                assert_eq!(report.records[1].status, None);
                assert_eq!(report.records[1].verdict, Some(Verdict::Rejected));
            }
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[test]
    fn test_warning_flags_context_and_completes() {
        // Relaxed axes with a tiny aggregate make every transition WARNING
        let config = PipelineConfig {
            thresholds: GovernanceThresholds {
                attack_risk: 1.0,
                rollback_cost: 1.0,
                stability_impact: 1.0,
                aggregate: 0.01,
            },
            ..PipelineConfig::default()
        };
        let outcome = pipeline(config).run("abc");
        assert!(outcome.is_completed());
        let report = outcome.report();
        assert!(report.flagged_for_audit);
        for record in &report.records[1..] {
            assert_eq!(record.verdict, Some(Verdict::Warning));
        }
    }

    #[test]
    fn test_strict_mode_halts_on_warning() {
        let config = PipelineConfig {
            strict_mode: true,
            thresholds: GovernanceThresholds {
                attack_risk: 1.0,
                rollback_cost: 1.0,
                stability_impact: 1.0,
                aggregate: 0.01,
            },
            ..PipelineConfig::default()
        };
        let outcome = pipeline(config).run("abc");
        match outcome {
            PipelineOutcome::Halted { stage, error, .. } => {
                assert_eq!(stage, StageId::Tokenize);
                assert!(matches!(error, RiftError::GovernanceRejected { .. }));
            }
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[test]
    fn test_warning_propagates_into_trust_tags() {
        let config = PipelineConfig {
            trust_tags: true,
            thresholds: GovernanceThresholds {
                attack_risk: 1.0,
                rollback_cost: 1.0,
                stability_impact: 1.0,
                aggregate: 0.01,
            },
            ..PipelineConfig::default()
        };
        let outcome = pipeline(config).run("abc");
        assert!(outcome.is_completed());
        for unit in bytecode_units(outcome.report()) {
            let tag = unit.tag.expect("trust tags requested");
            assert_eq!(tag.verdict, Verdict::Warning);
            assert!(tag.flagged);
        }
    }

    #[test]
    fn test_trust_tags_record_approval_on_clean_run() {
        let config = PipelineConfig {
            trust_tags: true,
            ..PipelineConfig::default()
        };
        let outcome = pipeline(config).run("abc");
        assert!(outcome.is_completed());
        for unit in bytecode_units(outcome.report()) {
            let tag = unit.tag.expect("trust tags requested");
            assert_eq!(tag.verdict, Verdict::Approved);
            assert!(!tag.flagged);
        }
    }

    #[test]
    fn test_governance_failure_surfaces_full_triangle() {
        let config = PipelineConfig {
            thresholds: GovernanceThresholds {
                rollback_cost: 0.0,
                ..GovernanceThresholds::default()
            },
            ..PipelineConfig::default()
        };
        let outcome = pipeline(config).run("abc");
        match outcome {
            PipelineOutcome::Halted { error, .. } => match error {
                RiftError::GovernanceRejected {
                    attack_risk,
                    rollback_cost,
                    stability_impact,
                    ..
                } => {
                    assert!(attack_risk > 0.0);
                    assert!(rollback_cost > 0.0);
                    assert!(stability_impact > 0.0);
                }
                other => panic!("expected GovernanceRejected, got {:?}", other),
            },
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_for_audit_tooling() {
        let outcome = pipeline(PipelineConfig::default()).run("abc");
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(json["records"].as_array().unwrap().len(), 7);
        assert_eq!(json["records"][0]["stage"], "tokenize");
        assert_eq!(json["records"][4]["verdict"], "APPROVED");
    }

    #[test]
    fn test_invalid_definitions_fail_construction() {
        let err = StagePipeline::from_definitions(PipelineConfig::default(), "WORD R\"/g[t]\"\n")
            .unwrap_err();
        assert!(matches!(err, RiftError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_empty_source_completes_with_empty_program() {
        let outcome = pipeline(PipelineConfig::default()).run("");
        assert!(outcome.is_completed());
        assert_eq!(bytecode_units(outcome.report()).len(), 0);
    }
}
