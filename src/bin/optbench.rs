use clap::{Parser, Subcommand, ValueEnum};
use optbench::driver::run_suite;
use optbench::harness::{
    resolve_executable, timeout_from_secs, Profile, SuiteConfig, DEFAULT_EXECUTABLE,
    DEFAULT_REPORT_PATH, DEFAULT_TIMEOUT, DEFAULT_WORKDIR,
};
use optbench::report::write_report;
use optbench::runner::ProcessRunner;
use optbench::schema::{BenchmarkCase, RunMeta, SuiteReport};
use optbench::timer::time_trial;
use optbench::{BenchError, Mode};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every case optimized and baseline, then write the CSV report.
    Suite {
        /// Benchmark source file, relative to --workdir. Repeatable; replaces the default list.
        #[arg(long = "case", value_name = "PATH", action = clap::ArgAction::Append)]
        cases: Vec<PathBuf>,

        /// Measured trials per mode (defaults to the profile's count).
        #[arg(long)]
        iterations: Option<u32>,

        /// Where to write the CSV report. Any existing file is replaced.
        #[arg(long, default_value = DEFAULT_REPORT_PATH)]
        out: PathBuf,

        /// Also write a JSON run summary (metadata, records, skipped cases).
        #[arg(long, value_name = "FILE")]
        json_out: Option<PathBuf>,
    },

    /// Time a single trial and print its outcome as JSON.
    Trial {
        /// Benchmark source file, relative to --workdir.
        #[arg(long = "case", value_name = "PATH")]
        case: PathBuf,

        #[arg(long, value_enum, default_value_t = Mode::Optimized)]
        mode: Mode,
    },
}

#[derive(Parser, Debug)]
#[command(name = "optbench")]
#[command(about = "Optimized vs. baseline wall-clock benchmark runner (CSV output)")]
struct Args {
    /// Target executable, invoked as `<compiler> <source> [--no-opt] --profile`.
    #[arg(long, default_value = DEFAULT_EXECUTABLE, global = true)]
    compiler: PathBuf,

    /// Directory benchmark sources are resolved in; the target runs here.
    #[arg(long, default_value = DEFAULT_WORKDIR, global = true)]
    workdir: PathBuf,

    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Per-trial timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs_f64(), global = true)]
    timeout_secs: f64,

    /// Log per-trial timings.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<(), BenchError> {
    let cwd = std::env::current_dir().map_err(|source| BenchError::Spawn {
        executable: args.compiler.clone(),
        source,
    })?;
    let executable = resolve_executable(&args.compiler, &cwd);
    let runner = ProcessRunner::new(&executable).with_working_dir(&args.workdir);

    let mut cfg = SuiteConfig::new(args.profile.into());
    cfg.workdir = args.workdir.clone();
    cfg.timeout = timeout_from_secs(args.timeout_secs)?;

    match args.cmd {
        Command::Suite {
            cases,
            iterations,
            out,
            json_out,
        } => {
            if !cases.is_empty() {
                cfg.cases = cases.into_iter().map(BenchmarkCase::new).collect();
            }
            if let Some(n) = iterations {
                cfg.iterations = n;
            }

            let outcome = run_suite(&runner, &cfg)?;
            write_report(&outcome.records, &out)?;
            info!(
                rows = outcome.records.len(),
                skipped = outcome.skipped.len(),
                "results written to {}",
                out.display()
            );

            if let Some(path) = json_out {
                let report = SuiteReport {
                    run: RunMeta::capture(&cfg, &executable),
                    records: outcome.records,
                    skipped: outcome.skipped,
                };
                let json = serde_json::to_string_pretty(&report)?;
                fs::write(&path, json).map_err(|source| BenchError::ReportWrite { path, source })?;
            }
        }
        Command::Trial { case, mode } => {
            let case = BenchmarkCase::new(case);
            let outcome = time_trial(&runner, &case, mode, &cfg.flags, cfg.timeout)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
