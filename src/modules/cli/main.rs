//! sqlwrap CLI
//!
//! Command-line interface for the sqlwrap connection wrapper.

use clap::Parser;
use sqlwrap_cli::{Cli, CliError, Commands};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    // Initialize logging; stdout is reserved for results
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e.report(verbose));
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Query(cmd) => cmd.execute(&cli.load_settings()?, &mut out),
        Commands::Proc(cmd) => cmd.execute(&cli.load_settings()?, &mut out),
        Commands::Resolve(cmd) => cmd.execute(&cli.load_settings()?, &mut out),
        Commands::Completion(cmd) => {
            cmd.execute(&mut out);
            Ok(())
        }
    }
}
