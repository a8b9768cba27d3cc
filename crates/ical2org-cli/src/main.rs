//! ical2org CLI entry point.

use std::io;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;

use ical2org_cli::{Cli, CliError, Ical2OrgConfig};
use ical2org_core::{TracingConfig, init_tracing};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Ical2OrgConfig::for_cli(&cli) {
        Ok(config) => config,
        Err(e) => return report(&e),
    };

    let tracing = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match ical2org_cli::run(&cli, &config, Utc::now(), io::stdin().lock(), io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(error: &CliError) -> ExitCode {
    if let Some(tz) = error.invalid_timezone() {
        eprintln!("Invalid timezone value {}.", tz);
        eprintln!("Use --print-timezones to show acceptable values.");
    } else {
        eprintln!("error: {}", error);
    }
    ExitCode::FAILURE
}
