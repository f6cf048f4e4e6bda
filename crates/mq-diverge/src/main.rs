//! mq-diverge
//!
//! Runs the instrumented MQ coder test (or reads a saved capture), pairs the
//! encoder and decoder trace operations and prints where they first
//! disagree.

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use tracing::info;

use mq_compare::config::DEFAULT_WINDOW;
use mq_compare::{
    AlignmentMode, CommandSource, CompareOptions, FileSource, HarnessConfig, TraceSource,
};

/// Find the first encoder/decoder divergence in MQ coder traces
#[derive(Parser, Debug)]
#[command(name = "mq-diverge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read a saved trace instead of running the harness
    #[arg(short = 'i', long = "input", conflicts_with_all = ["save_output", "command"])]
    input: Option<PathBuf>,

    /// Working directory for the harness command (ignored with --input)
    #[arg(short = 'C', long = "dir", env = "MQ_DIVERGE_DIR")]
    dir: Option<PathBuf>,

    /// Keep a copy of the captured harness output
    #[arg(long = "save-output")]
    save_output: Option<PathBuf>,

    /// Maximum number of operations to compare
    #[arg(short = 'w', long = "window", env = "MQ_DIVERGE_WINDOW", default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// How trace lines are grouped into operations
    #[arg(
        long = "alignment",
        default_value_t = AlignmentMode::Indexed,
        value_parser = PossibleValuesParser::new(["indexed", "positional"])
            .try_map(|s| s.parse::<AlignmentMode>()),
    )]
    alignment: AlignmentMode,

    /// Also compare context, state, A register and bit before each operation
    #[arg(long = "check-registers")]
    check_registers: bool,

    /// Print the report as JSON
    #[arg(long = "json")]
    json: bool,

    /// Emit logs as JSON
    #[arg(long = "log-json")]
    log_json: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Harness command and arguments (default: go test -run TestSimple5x5Debug)
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl Args {
    fn options(&self) -> CompareOptions {
        CompareOptions::default()
            .with_window(self.window)
            .with_alignment(self.alignment)
            .with_register_checks(self.check_registers)
    }

    fn harness(&self) -> HarnessConfig {
        let mut harness = HarnessConfig::default();
        if let Some((program, args)) = self.command.split_first() {
            harness.program = program.clone();
            harness.args = args.to_vec();
        }
        if let Some(dir) = &self.dir {
            harness.working_dir = dir.clone();
        }
        harness.save_to = self.save_output.clone();
        harness
    }

    fn source(&self) -> Box<dyn TraceSource> {
        match &self.input {
            Some(path) => Box::new(FileSource::new(path.clone())),
            None => Box::new(CommandSource::new(self.harness())),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.log_json);

    let mut source = args.source();
    let description = source.describe();
    info!(source = %description, "collecting trace");

    let report = mq_compare::run(source.as_mut(), args.options())
        .with_context(|| format!("comparing traces from {}", description))?;

    if args.json {
        println!("{}", report.to_json());
    } else {
        report.print();
    }
    Ok(())
}
