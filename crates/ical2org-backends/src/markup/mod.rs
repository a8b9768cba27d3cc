//! Markup detection and HTML to org conversion.

mod html;
mod pandoc;

pub use html::{HtmlSniffer, HtmlToOrg};
pub use pandoc::PandocConverter;

use ical2org_core::{MarkupConverter, Result};

/// A converter chosen at runtime.
#[derive(Debug, Clone)]
pub enum OrgConverter {
    /// The built-in [`HtmlToOrg`] converter.
    Builtin(HtmlToOrg),
    /// An external pandoc process.
    Pandoc(PandocConverter),
}

impl Default for OrgConverter {
    fn default() -> Self {
        Self::Builtin(HtmlToOrg)
    }
}

impl MarkupConverter for OrgConverter {
    fn convert(&self, text: &str) -> Result<String> {
        match self {
            Self::Builtin(converter) => converter.convert(text),
            Self::Pandoc(converter) => converter.convert(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_builtin() {
        let converter = OrgConverter::default();
        assert!(matches!(converter, OrgConverter::Builtin(_)));
        assert_eq!(converter.convert("<b>x</b>").unwrap(), "*x*");
    }
}
