//! # Hatch CLI
//!
//! Scaffolds projects and components from catalog templates and runs
//! plugin commands in isolated child processes.
//!
//! ## Startup sequence
//!
//! 1. Parse CLI arguments (clap handles `--help` / `--version` early-exit).
//! 2. Load configuration (defaults, config file, `~/.hatch.env`, environment).
//! 3. Initialise the tracing subscriber.
//! 4. Check for a newer release, at most once a day.
//! 5. Dispatch to the command handler.
//! 6. Translate any [`CliError`] into a user-facing message and exit code.
//!
//! ## Exit codes
//!
//! | Code | Meaning                                     |
//! |------|---------------------------------------------|
//! |  0   | Success                                     |
//! |  1   | Internal, network, or child process error   |
//! |  2   | User error (invalid input, conflicts)       |
//! |  3   | Resource not found                          |
//! |  4   | Configuration error                         |
//!
//! A plugin or custom installer that exits non-zero passes its own code
//! through.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod envfile;
mod error;
mod logging;
mod output;
mod update;
mod wiring;

fn main() -> ExitCode {
    // ── 1. Parse arguments ────────────────────────────────────────────────
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", e.render().ansi());
            return ExitCode::from(2);
        }
    };

    // ── 2. Load configuration ─────────────────────────────────────────────
    let config = match AppConfig::load(cli.global.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::from(4);
        }
    };

    // ── 3. Initialise tracing ─────────────────────────────────────────────
    let log_dir = config.logging.file.then(|| config.log_dir());
    let _guard = match init_logging(&cli.global, log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e:#}");
            return ExitCode::from(1);
        }
    };

    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        home = %config.cli_home().display(),
        "CLI started"
    );

    let output = OutputManager::new(&cli.global, &config);

    // ── 4. Update check ───────────────────────────────────────────────────
    if let Some(latest) = update::check(&config) {
        let _ = output.warning(&format!(
            "hatch {latest} is available (you have {}); update with: npm i -g {}",
            env!("CARGO_PKG_VERSION"),
            update::PACKAGE
        ));
    }

    // ── 5. Dispatch + 6. Error handling ──────────────────────────────────
    let verbose = cli.global.verbose > 0 || cli.global.debug;
    match run(cli, config, output) {
        Ok(0) => {
            info!("hatch completed successfully");
            ExitCode::SUCCESS
        }
        Ok(code) => {
            info!(code, "command exited with a non-zero code");
            ExitCode::from(code)
        }
        Err(e) => handle_error(e, verbose),
    }
}

/// Dispatch to the correct command handler. Returns the exit code.
#[instrument(skip_all)]
fn run(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<u8> {
    match cli.command {
        Commands::Init(cmd) => commands::init::execute(cmd, cli.global, config, output)?,
        Commands::Add(cmd) => commands::add::execute(cmd, cli.global, config, output)?,
        Commands::List(cmd) => commands::list::execute(cmd, cli.global, config, output)?,
        Commands::Config(cmd) => commands::config::execute(cmd, config, output)?,
        Commands::Completions(cmd) => commands::completions::execute(cmd)?,
        Commands::Plugin(argv) => return commands::plugin::execute(argv, cli.global, config),
    }
    Ok(0)
}

/// Translate a `CliError` into a user message and an exit code.
fn handle_error(err: CliError, verbose: bool) -> ExitCode {
    err.log();

    let msg = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}

// ── tests ─────────────────────────────────────────────────────────────────────
