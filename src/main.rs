// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// main.rs
//
// This file contains the main entry point for the Tomasulo simulator.
// It provides a command-line interface that parses an assembly program,
// drives the cycle engine to completion, and reports the resulting
// cycle trace and metrics (§6).

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use tomasulo_rust::core::FunctionalUnitClass;
use tomasulo_rust::utils::logger::{LogLevel, Logger};
use tomasulo_rust::utils::parser::parse_program;
use tomasulo_rust::{Engine, EngineConfig, RunOutcome};

#[derive(Parser)]
#[command(name = "tomasulo_rust")]
#[command(about = "A cycle-accurate Tomasulo out-of-order execution simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and run a program to completion, printing the cycle trace
    /// and final metrics.
    Run {
        /// Assembly source file (§6 grammar).
        program: PathBuf,

        #[arg(long, default_value = "1")]
        add_sub_rs: usize,
        #[arg(long, default_value = "1")]
        mul_div_rs: usize,
        #[arg(long, default_value = "1")]
        load_store_rs: usize,
        #[arg(long, default_value = "1")]
        branch_rs: usize,

        #[arg(long, default_value = "2")]
        add_sub_latency: u64,
        #[arg(long, default_value = "3")]
        mul_div_latency: u64,
        #[arg(long, default_value = "6")]
        load_store_latency: u64,
        #[arg(long, default_value = "4")]
        branch_latency: u64,

        #[arg(long, default_value = "16")]
        rob_size: usize,
        #[arg(long, default_value = "32")]
        registers: usize,

        /// Safety cap on simulated cycles (§6 exit code 2).
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Log level for the `log`/`env_logger` facade (error, warn, info, debug, trace).
        #[arg(long, default_value = "info")]
        log_level: String,

        /// Mirror stage events to this file via the secondary file logger.
        #[arg(long)]
        trace_file: Option<PathBuf>,

        /// Write the full per-cycle JSON report (§6) to this path.
        #[arg(long)]
        json_report: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Run {
            program,
            add_sub_rs,
            mul_div_rs,
            load_store_rs,
            branch_rs,
            add_sub_latency,
            mul_div_latency,
            load_store_latency,
            branch_latency,
            rob_size,
            registers,
            max_cycles,
            log_level,
            trace_file,
            json_report,
        } => run(
            &program,
            RsCounts { add_sub: add_sub_rs, mul_div: mul_div_rs, load_store: load_store_rs, branch: branch_rs },
            Latencies {
                add_sub: add_sub_latency,
                mul_div: mul_div_latency,
                load_store: load_store_latency,
                branch: branch_latency,
            },
            rob_size,
            registers,
            max_cycles,
            &log_level,
            trace_file.as_deref(),
            json_report.as_deref(),
        ),
    };
    std::process::exit(exit_code);
}

struct RsCounts {
    add_sub: usize,
    mul_div: usize,
    load_store: usize,
    branch: usize,
}

struct Latencies {
    add_sub: u64,
    mul_div: u64,
    load_store: u64,
    branch: u64,
}

#[allow(clippy::too_many_arguments)]
fn run(
    program_path: &PathBuf,
    rs_counts: RsCounts,
    latencies: Latencies,
    rob_size: usize,
    registers: usize,
    max_cycles: Option<u64>,
    log_level: &str,
    trace_file: Option<&std::path::Path>,
    json_report: Option<&std::path::Path>,
) -> i32 {
    init_logging(log_level);
    let mut file_logger = trace_file.map(|path| Logger::new(path.to_str(), LogLevel::Debug));

    let source = match fs::read_to_string(program_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error reading {}: {}", program_path.display(), e);
            return 1;
        }
    };

    let instructions = match parse_program(&source) {
        Ok(instructions) => instructions,
        Err(err) => {
            eprintln!("parse error: {}", err);
            return 1;
        }
    };

    let config = EngineConfig::new()
        .with_rs_count(FunctionalUnitClass::AddSub, rs_counts.add_sub)
        .with_rs_count(FunctionalUnitClass::MulDiv, rs_counts.mul_div)
        .with_rs_count(FunctionalUnitClass::LoadStore, rs_counts.load_store)
        .with_rs_count(FunctionalUnitClass::Branch, rs_counts.branch)
        .with_latency(FunctionalUnitClass::AddSub, latencies.add_sub)
        .with_latency(FunctionalUnitClass::MulDiv, latencies.mul_div)
        .with_latency(FunctionalUnitClass::LoadStore, latencies.load_store)
        .with_latency(FunctionalUnitClass::Branch, latencies.branch)
        .with_rob_size(rob_size)
        .with_register_count(registers);

    if let Err(err) = config.validate() {
        eprintln!("invalid engine configuration: {}", err);
        return 1;
    }

    let mut engine = Engine::new(config);
    engine.load_program(instructions);
    log_trace(&mut file_logger, "simulation started");

    let outcome = engine.run_to_end(max_cycles);

    for instr in engine.instructions() {
        let line = instr.to_string();
        if instr.squashed {
            println!("{}", line.red());
        } else if instr.is_committed() {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }
    println!("{}", engine.metrics());
    if let Some(warning) = engine.last_commit_warning() {
        println!("warning: {}", warning);
        log_trace(&mut file_logger, warning);
    }

    if let Some(path) = json_report {
        let report = engine.to_json_report();
        match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    eprintln!("failed to write JSON report to {}: {}", path.display(), e);
                    return 1;
                }
            }
            Err(e) => {
                eprintln!("failed to serialize JSON report: {}", e);
                return 1;
            }
        }
    }

    match outcome {
        RunOutcome::Completed => 0,
        RunOutcome::CycleCapReached => {
            eprintln!("run_to_end hit its safety cap before the program completed");
            2
        }
    }
}

fn init_logging(level: &str) {
    let filter = match level.to_ascii_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    let _ = env_logger::Builder::new().filter_level(filter).try_init();
}

fn log_trace(logger: &mut Option<Logger>, message: &str) {
    if let Some(logger) = logger {
        logger.info(message);
    }
}
