//! End-to-end runs of the staged pipeline
//!
//! These tests drive the public surface the way an embedding tool would:
//! definitions text in, source text in, report and bytecode out.

use rift::rift::error::RiftError;
use rift::rift::governance::{GovernanceThresholds, Verdict};
use rift::rift::memory::TokenMemory;
use rift::rift::pattern::PatternSpec;
use rift::rift::pipeline::stage::{BytecodeUnit, StagePayload, StageStatus};
use rift::rift::pipeline::{PipelineConfig, PipelineOutcome, StageId, StagePipeline};

const DEFS: &str = "\
# rift lexical categories
WORD    R\"[a-z]+/gbt[t]\"
NUMBER  R\"[0-9]+/gbt[t]\"
";

fn bytecode_units(outcome: &PipelineOutcome) -> Vec<BytecodeUnit> {
    match &outcome.report().payload {
        Some(StagePayload::Bytecode(units)) => units.clone(),
        other => panic!("expected bytecode payload, got {:?}", other),
    }
}

#[test]
fn full_run_produces_line_grouped_bytecode() {
    let pipeline = StagePipeline::from_definitions(PipelineConfig::default(), DEFS).unwrap();
    let outcome = pipeline.run("alpha 1\nbeta 22\ngamma 333");
    assert!(outcome.is_completed());

    let units = bytecode_units(&outcome);
    assert_eq!(units.len(), 3);
    for (i, unit) in units.iter().enumerate() {
        assert_eq!(unit.unit.line, i + 1);
        assert_eq!(unit.unit.tokens.len(), 2);
        assert_eq!(unit.unit.tokens[0].kind(), "WORD");
        assert_eq!(unit.unit.tokens[1].kind(), "NUMBER");
        assert_eq!(unit.tag, None);
    }
}

#[test]
fn line_initial_tokens_carry_column_one() {
    let pipeline = StagePipeline::from_definitions(PipelineConfig::default(), DEFS).unwrap();
    let outcome = pipeline.run("first\nsecond\nthird");
    assert!(outcome.is_completed());

    let units = bytecode_units(&outcome);
    let positions: Vec<(usize, usize, &str)> = units
        .iter()
        .flat_map(|u| u.unit.tokens.iter())
        .map(|t| (t.line(), t.column(), t.value()))
        .collect();
    assert_eq!(
        positions,
        vec![(1, 1, "first"), (2, 1, "second"), (3, 1, "third")]
    );
}

#[test]
fn worker_count_does_not_change_emission_order() {
    let source = "one 1\ntwo 22\nthree 333\nfour 4444\nfive 55555";
    let single = StagePipeline::from_definitions(
        PipelineConfig {
            thread_count: 1,
            ..PipelineConfig::default()
        },
        DEFS,
    )
    .unwrap();
    let many = StagePipeline::from_definitions(
        PipelineConfig {
            thread_count: 8,
            ..PipelineConfig::default()
        },
        DEFS,
    )
    .unwrap();

    let a = bytecode_units(&single.run(source));
    let b = bytecode_units(&many.run(source));
    assert_eq!(a, b);
}

#[test]
fn unmatched_input_halts_tokenize_with_processing_error() {
    let pipeline = StagePipeline::from_definitions(PipelineConfig::default(), DEFS).unwrap();
    match pipeline.run("alpha ???") {
        PipelineOutcome::Halted { stage, error, report } => {
            assert_eq!(stage, StageId::Tokenize);
            assert!(matches!(error, RiftError::Processing { .. }));
            assert_eq!(report.records[0].status, Some(StageStatus::ProcessingError));
        }
        other => panic!("expected halt, got {:?}", other),
    }
}

#[test]
fn dual_mode_divergence_is_a_hard_halt() {
    // Bottom-up evaluates the end anchor against its shifted stack, top-down
    // against the full remainder, so both succeed with different kinds.
    let defs = "\
END_PAIR R\"ab$/bt[t]\"
PAIR     R\"ab/bt[t]\"
LONE_A   R\"a/bt[t]\"
LONE_B   R\"b/bt[t]\"
";
    let pipeline = StagePipeline::from_definitions(PipelineConfig::default(), defs).unwrap();
    match pipeline.run("abab") {
        PipelineOutcome::Halted { stage, error, .. } => {
            assert_eq!(stage, StageId::Tokenize);
            match error {
                RiftError::ValidationMismatch { index, .. } => assert_eq!(index, 0),
                other => panic!("expected ValidationMismatch, got {:?}", other),
            }
        }
        other => panic!("expected halt, got {:?}", other),
    }
}

#[test]
fn governance_rejection_names_stage_and_triangle() {
    let config = PipelineConfig {
        thresholds: GovernanceThresholds {
            rollback_cost: 0.0,
            ..GovernanceThresholds::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = StagePipeline::from_definitions(config, DEFS).unwrap();
    match pipeline.run("alpha") {
        PipelineOutcome::Halted { stage, error, .. } => {
            assert_eq!(stage, StageId::Tokenize);
            match error {
                RiftError::GovernanceRejected {
                    stage,
                    rollback_cost,
                    ..
                } => {
                    assert_eq!(stage, 0);
                    assert!(rollback_cost > 0.0);
                }
                other => panic!("expected GovernanceRejected, got {:?}", other),
            }
        }
        other => panic!("expected halt, got {:?}", other),
    }
}

#[test]
fn warning_band_flags_run_and_tags_bytecode() {
    // Per-axis maxima sum exactly to the default aggregate, so the warning
    // band only opens under adjusted thresholds.
    let config = PipelineConfig {
        trust_tags: true,
        thresholds: GovernanceThresholds {
            attack_risk: 1.0,
            rollback_cost: 1.0,
            stability_impact: 1.0,
            aggregate: 0.05,
        },
        ..PipelineConfig::default()
    };
    let pipeline = StagePipeline::from_definitions(config, DEFS).unwrap();
    let outcome = pipeline.run("alpha 1");
    assert!(outcome.is_completed());
    assert!(outcome.report().flagged_for_audit);

    for unit in bytecode_units(&outcome) {
        let tag = unit.tag.expect("trust tags requested");
        assert_eq!(tag.verdict, Verdict::Warning);
        assert!(tag.flagged);
    }
}

#[test]
fn strict_mode_turns_warnings_into_halts() {
    let config = PipelineConfig {
        strict_mode: true,
        thresholds: GovernanceThresholds {
            attack_risk: 1.0,
            rollback_cost: 1.0,
            stability_impact: 1.0,
            aggregate: 0.05,
        },
        ..PipelineConfig::default()
    };
    let pipeline = StagePipeline::from_definitions(config, DEFS).unwrap();
    match pipeline.run("alpha 1") {
        PipelineOutcome::Halted { stage, error, .. } => {
            assert_eq!(stage, StageId::Tokenize);
            assert!(matches!(error, RiftError::GovernanceRejected { .. }));
        }
        other => panic!("expected halt, got {:?}", other),
    }
}

#[test]
fn token_capacity_halts_tokenize_with_memory_error() {
    let config = PipelineConfig {
        token_capacity: Some(2),
        ..PipelineConfig::default()
    };
    let pipeline = StagePipeline::from_definitions(config, DEFS).unwrap();
    match pipeline.run("a b c d") {
        PipelineOutcome::Halted { stage, error, report } => {
            assert_eq!(stage, StageId::Tokenize);
            assert!(matches!(error, RiftError::MemoryExhausted(_)));
            assert_eq!(report.records[0].status, Some(StageStatus::MemoryError));
        }
        other => panic!("expected halt, got {:?}", other),
    }
}

#[test]
fn enhancement_point_is_idempotent_over_the_store() {
    let memory = TokenMemory::new();
    memory
        .add_pattern(PatternSpec::parse("R\"[a-z]+/g[t]\"").unwrap().tagged("WORD"))
        .unwrap();
    memory.process("alpha beta gamma").unwrap();

    memory.enhance_tokens().unwrap();
    let once = memory.tokens();
    memory.enhance_tokens().unwrap();
    assert_eq!(memory.tokens(), once);
}

#[test]
fn mode_selection_skips_the_unused_strategy() {
    // A bottom-up-only pattern set still completes the pipeline; no
    // consistency check runs because only one sequence exists.
    let defs = "WORD R\"[a-z]+/g[b]\"\n";
    let pipeline = StagePipeline::from_definitions(PipelineConfig::default(), defs).unwrap();
    let outcome = pipeline.run("abc def");
    assert!(outcome.is_completed());
    assert_eq!(bytecode_units(&outcome)[0].unit.tokens.len(), 2);
}
