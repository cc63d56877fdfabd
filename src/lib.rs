//! # rift
//!
//! Core library for the rift staged translation pipeline.
//!
//! The pipeline takes source text through seven ordered stages (tokenize,
//! parse, semantic, validate, bytecode, verify, emit). Tokenization is driven
//! by pattern literals of the form `R"<regex>/<flags>[<mode>]"` compiled into
//! a finite automaton, and can run in two independent matching strategies
//! whose outputs must agree. Every transition between stages is authorized by
//! a three-axis governance gate.
//!
//! ## Testing
//!
//! Parser and matcher tests assert exact token sequences; governance tests
//! cover the threshold tables from the risk model, including the boundary
//! where the warning band only becomes reachable under adjusted thresholds.

pub mod rift;
