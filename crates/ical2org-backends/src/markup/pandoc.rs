//! HTML to org conversion through an external `pandoc` binary.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use ical2org_core::{Error, MarkupConverter, Result};

/// Runs `pandoc -f html -t org` on each body.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl PandocConverter {
    /// Creates a converter that runs `program` instead of `pandoc` from `PATH`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program that is executed.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl MarkupConverter for PandocConverter {
    fn convert(&self, text: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(["-f", "html", "-t", "org"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::conversion(format!("failed to run `{}`: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| Error::conversion(format!("failed to write to `{}`: {}", self.program, e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::conversion(format!("failed to wait for `{}`: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::conversion(format!(
                "`{}` failed ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let converted = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = converted.len(), "pandoc conversion done");
        Ok(converted.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program() {
        assert_eq!(PandocConverter::default().program(), "pandoc");
    }

    #[test]
    fn missing_binary_is_conversion_error() {
        let converter = PandocConverter::new("ical2org-no-such-pandoc-12345");
        let err = converter.convert("<p>x</p>").unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
        assert!(err.to_string().contains("failed to run"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_conversion_error() {
        let converter = PandocConverter::new("false");
        let err = converter.convert("<p>x</p>").unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }
}
