//! Event types for the conversion pipeline.
//!
//! - [`RawEvent`]: one concrete occurrence as delivered by the expansion backend
//! - [`NormalizedEvent`]: title and raw body after unescaping and location suffixing
//! - [`CanonicalEvent`]: a fully rendered outline block, ready to be written

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// Title used when an event has neither a summary nor a location.
pub const NO_TITLE: &str = "(No title)";

/// A single event occurrence, as produced by a calendar backend.
///
/// Recurring events arrive already expanded: each occurrence is its own
/// `RawEvent` with concrete start and end values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// The event title (SUMMARY), still escaped.
    pub summary: Option<String>,
    /// The event location (LOCATION), still escaped.
    pub location: Option<String>,
    /// The free-text body (DESCRIPTION), possibly HTML.
    pub description: Option<String>,
    /// When the occurrence starts (DTSTART).
    pub start: EventTime,
    /// When the occurrence ends (DTEND). Exclusive for all-day events.
    pub end: EventTime,
}

impl RawEvent {
    /// Creates a new raw event with only its time range set.
    pub fn new(start: EventTime, end: EventTime) -> Self {
        Self {
            summary: None,
            location: None,
            description: None,
            start,
            end,
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if this occurrence is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }
}

/// Title and raw body of an event after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    /// Headline text.
    pub title: String,
    /// The DESCRIPTION verbatim, left for the body renderer.
    pub body: Option<String>,
}

/// Replaces the `\,` escapes calendar encoders leave in text values.
pub fn unescape_commas(text: &str) -> String {
    text.replace("\\,", ",")
}

/// Derives the headline and raw body of an event.
///
/// The title is the unescaped SUMMARY, suffixed with `" - " + LOCATION` when
/// `include_location` is set and a location exists. Events with neither
/// field get [`NO_TITLE`].
pub fn normalize(raw: &RawEvent, include_location: bool) -> NormalizedEvent {
    let summary = raw.summary.as_deref().map(unescape_commas).unwrap_or_default();
    let location = raw
        .location
        .as_deref()
        .filter(|location| !location.is_empty())
        .map(unescape_commas);

    let title = match location {
        None if summary.is_empty() => NO_TITLE.to_string(),
        Some(location) if include_location => format!("{summary} - {location}"),
        _ => summary,
    };

    let body = raw
        .description
        .as_ref()
        .filter(|description| !description.is_empty())
        .cloned();

    NormalizedEvent { title, body }
}

/// A rendered outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEvent {
    /// Headline text.
    pub title: String,
    /// Rendered start stamp, e.g. `<2024-03-01 Fri 09:00>`.
    pub start_stamp: String,
    /// Rendered end stamp.
    pub end_stamp: String,
    /// Rendered body text.
    pub body: Option<String>,
}

impl CanonicalEvent {
    /// Appends this event's outline block to `out`.
    ///
    /// The block is a `* ` headline, an indented `start--end` line, the body
    /// (if any), and a terminating blank line.
    pub fn write_block(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "* {}", self.title)?;
        writeln!(out, "  {}--{}", self.start_stamp, self.end_stamp)?;
        if let Some(ref body) = self.body {
            writeln!(out, "{body}")?;
        }
        writeln!(out)
    }
}

impl fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_block(f)
    }
}
