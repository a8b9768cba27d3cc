//! Command-line interface definition.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Convert iCalendar events into org-mode outline entries
#[derive(Debug, Parser)]
#[command(name = "ical2org")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Calendar file to read (`-` for stdin)
    #[arg(required_unless_present = "print_timezones")]
    pub ics_file: Option<PathBuf>,

    /// Org file to write (`-` for stdout)
    #[arg(required_unless_present = "print_timezones")]
    pub org_file: Option<PathBuf>,

    /// Print acceptable timezone names and exit
    #[arg(long, short = 'p')]
    pub print_timezones: bool,

    /// Window length in days (left & right from current time)
    #[arg(long, short = 'd', allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Timezone to use (local timezone by default)
    #[arg(long, short = 't')]
    pub timezone: Option<String>,

    /// Include event location in headlines
    #[arg(long, overrides_with = "no_location")]
    pub location: bool,

    /// Leave event location out of headlines
    #[arg(long, overrides_with = "location")]
    pub no_location: bool,

    /// HTML to org converter for event descriptions
    #[arg(long, value_enum)]
    pub converter: Option<ConverterKind>,

    /// Path to configuration file
    #[arg(long, short, env = "ICAL2ORG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}

impl Cli {
    /// Location flag, if one was given.
    pub fn include_location(&self) -> Option<bool> {
        if self.no_location {
            Some(false)
        } else if self.location {
            Some(true)
        } else {
            None
        }
    }
}

/// Available description converters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// Built-in HTML to org converter
    #[default]
    Builtin,
    /// External `pandoc` binary
    Pandoc,
}

/// Returns true if `path` stands for stdin/stdout.
pub fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ical2org").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn positional_files() {
        let cli = parse(&["in.ics", "out.org"]);
        assert_eq!(cli.ics_file, Some(PathBuf::from("in.ics")));
        assert_eq!(cli.org_file, Some(PathBuf::from("out.org")));
        assert_eq!(cli.days, None);
        assert_eq!(cli.include_location(), None);
    }

    #[test]
    fn files_required_without_print_timezones() {
        assert!(Cli::try_parse_from(["ical2org", "in.ics"]).is_err());
        assert!(Cli::try_parse_from(["ical2org", "-p"]).is_ok());
    }

    #[test]
    fn options() {
        let cli = parse(&[
            "-d", "30", "-t", "Europe/Paris", "--converter", "pandoc", "-v", "-", "-",
        ]);
        assert_eq!(cli.days, Some(30));
        assert_eq!(cli.timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(cli.converter, Some(ConverterKind::Pandoc));
        assert!(cli.debug);
        assert!(is_stdio(cli.ics_file.as_deref().unwrap()));
    }

    #[test]
    fn negative_days_are_accepted() {
        assert_eq!(parse(&["--days", "-5", "a", "b"]).days, Some(-5));
    }

    #[test]
    fn last_location_flag_wins() {
        assert_eq!(parse(&["--location", "--no-location", "a", "b"]).include_location(), Some(false));
        assert_eq!(parse(&["--no-location", "--location", "a", "b"]).include_location(), Some(true));
    }
}
