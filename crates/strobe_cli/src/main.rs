//! Strobe CLI. Runs the AXI4-Stream harness against the reference designs.
//!
//! Provides `strobe init` to write a starter `strobe.toml`, `strobe check` to
//! validate it, and `strobe run` to drive random traffic through a loopback
//! or FIFO design and report pass or fail.

#![warn(missing_docs)]

mod check;
mod init;
mod project;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Strobe: transaction-level AXI4-Stream verification.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe AXI4-Stream verification harness")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `strobe.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter `strobe.toml`.
    Init {
        /// Directory to write into. Defaults to the current directory.
        dir: Option<String>,
    },
    /// Load and validate the configuration, then print a summary.
    Check,
    /// Run the harness against a reference design.
    Run(RunArgs),
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Master seed, overriding `seed` from the configuration.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reference design, overriding `[design] kind`.
    #[arg(long, value_enum)]
    pub design: Option<DesignChoice>,

    /// Transactions to drive, overriding `[stimulus] transactions`.
    #[arg(long)]
    pub transactions: Option<u64>,

    /// Output format for the outcome.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Reference design selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DesignChoice {
    /// Combinational slave-to-master wiring.
    Loopback,
    /// Registered FIFO.
    Fifo,
}

/// Outcome output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// The default log filter for these flags. `RUST_LOG` takes precedence.
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

/// Installs the stderr `tracing` subscriber.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(global.log_level());

    let result = match cli.command {
        Command::Init { dir } => init::run(dir, &global),
        Command::Check => check::run(&global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
