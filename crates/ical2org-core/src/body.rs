//! Event body rendering.
//!
//! Descriptions are passed through unchanged unless they carry markup, in
//! which case the configured [`MarkupConverter`] turns them into org text.
//! Detection and conversion are capabilities supplied by the caller; this
//! module only decides when to use them.

use tracing::debug;

use crate::error::Result;
use crate::event::unescape_commas;

/// Detects whether a text contains structural markup elements.
pub trait MarkupSniffer {
    /// Returns true if `text` contains at least one markup element.
    fn looks_like_markup(&self, text: &str) -> bool;
}

/// Converts rich markup (HTML) into org outline markup.
pub trait MarkupConverter {
    /// Converts `text` from HTML to org.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conversion`] when the conversion fails.
    fn convert(&self, text: &str) -> Result<String>;
}

impl<T: MarkupSniffer + ?Sized> MarkupSniffer for &T {
    fn looks_like_markup(&self, text: &str) -> bool {
        (**self).looks_like_markup(text)
    }
}

impl<T: MarkupConverter + ?Sized> MarkupConverter for &T {
    fn convert(&self, text: &str) -> Result<String> {
        (**self).convert(text)
    }
}

impl<T: MarkupSniffer + ?Sized> MarkupSniffer for Box<T> {
    fn looks_like_markup(&self, text: &str) -> bool {
        (**self).looks_like_markup(text)
    }
}

impl<T: MarkupConverter + ?Sized> MarkupConverter for Box<T> {
    fn convert(&self, text: &str) -> Result<String> {
        (**self).convert(text)
    }
}

/// Renders a raw DESCRIPTION into the text placed under the headline.
///
/// Markup is converted only when the sniffer finds an element. Literal
/// `\n` sequences then become line breaks and `\,` becomes `,`.
///
/// # Errors
///
/// Propagates converter failures unchanged.
pub fn render_body(
    raw_body: &str,
    sniffer: &impl MarkupSniffer,
    converter: &impl MarkupConverter,
) -> Result<String> {
    let text = if sniffer.looks_like_markup(raw_body) {
        debug!(len = raw_body.len(), "Converting markup body");
        converter.convert(raw_body)?
    } else {
        raw_body.to_string()
    };

    Ok(unescape_commas(&text.replace("\\n", "\n")))
}
