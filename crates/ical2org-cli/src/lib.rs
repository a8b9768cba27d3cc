//! The `ical2org` command line.
//!
//! [`run`] performs one conversion: it resolves settings, reads the
//! calendar, converts it and only then opens the output, so a failed run
//! never creates or truncates the org file.

pub mod cli;
pub mod config;
pub mod error;

use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use ical2org_backends::{HtmlSniffer, HtmlToOrg, IcsBackend, OrgConverter, PandocConverter};
use ical2org_core::{Converter, timezone_names};

pub use cli::{Cli, ConverterKind};
pub use config::{Ical2OrgConfig, Settings};
pub use error::{CliError, CliResult};

/// Runs the command described by `cli`.
///
/// `stdin` and `stdout` back the `-` file arguments and the timezone
/// listing. Returns the number of events written.
///
/// # Errors
///
/// Returns timezone errors before any input is read; read, conversion and
/// write errors leave the output untouched.
pub fn run<R: Read, W: Write>(
    cli: &Cli,
    config: &Ical2OrgConfig,
    now: DateTime<Utc>,
    mut stdin: R,
    mut stdout: W,
) -> CliResult<usize> {
    if cli.print_timezones {
        print_timezones(&mut stdout)?;
        return Ok(0);
    }

    let settings = Settings::resolve(cli, config)?;
    let ics_file = cli
        .ics_file
        .as_deref()
        .ok_or(CliError::MissingArgument("ICS_FILE"))?;
    let org_file = cli
        .org_file
        .as_deref()
        .ok_or(CliError::MissingArgument("ORG_FILE"))?;
    debug!(?settings, "Resolved settings");

    let input = read_input(ics_file, &mut stdin)?;

    let converter = Converter::new(
        settings.options,
        now,
        IcsBackend::new(settings.options.timezone),
        HtmlSniffer,
        org_converter(&settings),
    )
    .with_progress(progress_bar());
    let mut rendered = Vec::new();
    let count = converter.convert_to(&input, &mut rendered)?;

    write_output(org_file, &rendered, &mut stdout)?;
    info!(events = count, output = %org_file.display(), "Wrote org file");
    Ok(count)
}

/// Writes every known timezone identifier, one per line.
fn print_timezones<W: Write>(out: &mut W) -> CliResult<()> {
    let write_err = |source: io::Error| CliError::Write {
        path: "-".into(),
        source,
    };
    for name in timezone_names() {
        writeln!(out, "{name}").map_err(write_err)?;
    }
    out.flush().map_err(write_err)
}

fn org_converter(settings: &Settings) -> OrgConverter {
    match settings.converter {
        ConverterKind::Builtin => OrgConverter::Builtin(HtmlToOrg),
        ConverterKind::Pandoc => OrgConverter::Pandoc(
            settings
                .pandoc
                .as_deref()
                .map(PandocConverter::new)
                .unwrap_or_default(),
        ),
    }
}

/// Progress bar on stderr, hidden when stderr is not a terminal.
fn progress_bar() -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} events")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn read_input<R: Read>(path: &Path, stdin: &mut R) -> CliResult<String> {
    let read_err = |source: io::Error| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    if cli::is_stdio(path) {
        let mut input = String::new();
        stdin.read_to_string(&mut input).map_err(read_err)?;
        Ok(input)
    } else {
        fs::read_to_string(path).map_err(read_err)
    }
}

fn write_output<W: Write>(path: &Path, rendered: &[u8], stdout: &mut W) -> CliResult<()> {
    let write_err = |source: io::Error| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if cli::is_stdio(path) {
        stdout.write_all(rendered).map_err(write_err)?;
        stdout.flush().map_err(write_err)
    } else {
        fs::write(path, rendered).map_err(write_err)
    }
}
