//! iCalendar backend.
//!
//! Decoding is done by the `icalendar` crate; occurrences of recurring
//! events are generated with `rrule`.
//!
//! # Example
//!
//! ```ignore
//! use ical2org_backends::IcsBackend;
//! use ical2org_core::{CalendarBackend, TargetZone, TimeWindow};
//!
//! let backend = IcsBackend::new(TargetZone::UTC);
//! let calendar = backend.decode(&ics_text)?;
//! let events = backend.expand(&calendar, &TimeWindow::around(now, 90))?;
//! ```

mod expand;
mod parse;

use icalendar::Calendar;
use tracing::debug;

use ical2org_core::{CalendarBackend, Error, RawEvent, Result, TargetZone, TimeWindow};

pub use expand::{ExpansionOptions, MAX_OCCURRENCES};

use expand::expand_records;
use parse::{EventRecord, extract_events};

/// A decoded calendar: its events, with date values kept in source form.
#[derive(Debug, Clone)]
pub struct IcsCalendar {
    events: Vec<EventRecord>,
}

impl IcsCalendar {
    /// Number of `VEVENT` components with a usable start.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the calendar has no usable events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// [`CalendarBackend`] for RFC 5545 text.
#[derive(Debug, Clone, Default)]
pub struct IcsBackend {
    options: ExpansionOptions,
}

impl IcsBackend {
    /// Creates a backend that reads floating times in `zone`.
    pub fn new(zone: TargetZone) -> Self {
        Self::with_options(ExpansionOptions::with_floating_zone(zone))
    }

    /// Creates a backend with explicit expansion options.
    pub fn with_options(options: ExpansionOptions) -> Self {
        Self { options }
    }

    /// Returns the expansion options.
    pub fn options(&self) -> &ExpansionOptions {
        &self.options
    }
}

impl CalendarBackend for IcsBackend {
    type Calendar = IcsCalendar;

    fn decode(&self, input: &str) -> Result<IcsCalendar> {
        // icalendar is lenient; anything not shaped like a calendar is rejected here
        if !input.trim_start().starts_with("BEGIN:VCALENDAR") {
            return Err(Error::decode("Expected BEGIN:VCALENDAR"));
        }
        let calendar = input.parse::<Calendar>().map_err(Error::decode)?;
        let events = extract_events(&calendar);
        debug!(events = events.len(), "Decoded calendar");
        Ok(IcsCalendar { events })
    }

    fn expand(&self, calendar: &IcsCalendar, window: &TimeWindow) -> Result<Vec<RawEvent>> {
        expand_records(&calendar.events, window, &self.options)
    }
}
