//! Command-line driver for the rift pipeline
//!
//! This binary is a thin collaborator around the library: it loads a
//! pattern-definitions file and a source file, runs the staged pipeline, and
//! prints the run report as JSON for audit tooling. Stage result codes map
//! onto process exit codes.
//!
//! Usage:
//!   riftc run `<patterns>` `<source>` [--strict] [--trust-tags] [--threads N]
//!   riftc tokens `<patterns>` `<source>`
//!   riftc check `<patterns>`

use clap::{Arg, ArgAction, Command};
use rift::rift::definitions::parse_definitions;
use rift::rift::memory::TokenMemory;
use rift::rift::pipeline::{PipelineConfig, PipelineOutcome, StagePipeline};
use rift::rift::pipeline::stage::status_for;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = Command::new("riftc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Staged source-to-bytecode pipeline for the rift format")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run the full seven-stage pipeline")
                .arg(Arg::new("patterns").help("Pattern definitions file").required(true))
                .arg(Arg::new("source").help("Source file to translate").required(true))
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Halt on WARNING verdicts instead of flagging for audit"),
                )
                .arg(
                    Arg::new("trust-tags")
                        .long("trust-tags")
                        .action(ArgAction::SetTrue)
                        .help("Attach governance trust tags to emitted bytecode"),
                )
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .value_parser(clap::value_parser!(usize))
                        .help("Worker threads for the tokenize stage"),
                ),
        )
        .subcommand(
            Command::new("tokens")
                .about("Tokenize a source file and print the token records")
                .arg(Arg::new("patterns").help("Pattern definitions file").required(true))
                .arg(Arg::new("source").help("Source file to tokenize").required(true)),
        )
        .subcommand(
            Command::new("check")
                .about("Validate a pattern definitions file")
                .arg(Arg::new("patterns").help("Pattern definitions file").required(true)),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", sub)) => {
            let config = PipelineConfig {
                strict_mode: sub.get_flag("strict"),
                trust_tags: sub.get_flag("trust-tags"),
                thread_count: sub
                    .get_one::<usize>("threads")
                    .copied()
                    .unwrap_or_else(|| PipelineConfig::default().thread_count),
                ..PipelineConfig::default()
            };
            handle_run(path_arg(sub, "patterns"), path_arg(sub, "source"), config)
        }
        Some(("tokens", sub)) => {
            handle_tokens(path_arg(sub, "patterns"), path_arg(sub, "source"))
        }
        Some(("check", sub)) => handle_check(path_arg(sub, "patterns")),
        _ => ExitCode::FAILURE,
    }
}

fn path_arg<'a>(matches: &'a clap::ArgMatches, name: &str) -> &'a str {
    // Required by clap; missing means the definition above is wrong
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn read_file(path: &str) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read {}: {}", path, e);
        ExitCode::FAILURE
    })
}

fn handle_run(patterns_path: &str, source_path: &str, config: PipelineConfig) -> ExitCode {
    let definitions = match read_file(patterns_path) {
        Ok(text) => text,
        Err(code) => return code,
    };
    let source = match read_file(source_path) {
        Ok(text) => text,
        Err(code) => return code,
    };

    let pipeline = match StagePipeline::from_definitions(config, &definitions) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("error: {}", e);
            return exit_for_error(&e);
        }
    };

    match pipeline.run(&source) {
        PipelineOutcome::Completed(report) => {
            print_json(&report);
            ExitCode::SUCCESS
        }
        PipelineOutcome::Halted { stage, error, report } => {
            print_json(&report);
            eprintln!("error: pipeline halted at stage {}: {}", stage, error);
            exit_for_error(&error)
        }
    }
}

fn handle_tokens(patterns_path: &str, source_path: &str) -> ExitCode {
    let definitions = match read_file(patterns_path) {
        Ok(text) => text,
        Err(code) => return code,
    };
    let source = match read_file(source_path) {
        Ok(text) => text,
        Err(code) => return code,
    };

    let memory = TokenMemory::new();
    let result = parse_definitions(&definitions)
        .and_then(|specs| {
            for spec in specs {
                memory.add_pattern(spec)?;
            }
            Ok(())
        })
        .and_then(|()| memory.process(&source));

    match result {
        Ok(tokens) => {
            print_json(&tokens);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            exit_for_error(&e)
        }
    }
}

fn handle_check(patterns_path: &str) -> ExitCode {
    let definitions = match read_file(patterns_path) {
        Ok(text) => text,
        Err(code) => return code,
    };
    match parse_definitions(&definitions) {
        Ok(specs) => {
            println!("{} pattern(s) ok", specs.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            exit_for_error(&e)
        }
    }
}

fn exit_for_error(error: &rift::rift::error::RiftError) -> ExitCode {
    ExitCode::from(status_for(error).exit_code() as u8)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: cannot serialize report: {}", e),
    }
}
