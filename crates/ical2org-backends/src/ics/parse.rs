//! ICS/iCalendar parsing utilities.
//!
//! Turns the `VEVENT` components of a parsed [`icalendar::Calendar`] into
//! [`EventRecord`]s that keep each date value in its source form, so that
//! recurrence expansion can happen in the event's own zone.

use std::sync::LazyLock;

use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
    Property,
};
use regex::Regex;
use tracing::{debug, warn};

use ical2org_core::{EventTime, TargetZone};

/// ISO 8601 durations as used by the DURATION property, e.g. `PT1H30M` or `-P1W`.
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("Invalid duration regex")
});

/// A DATE or DATE-TIME value as written in the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceTime {
    /// `VALUE=DATE`, an all-day value.
    Date(NaiveDate),
    /// A UTC value (`...Z`).
    Utc(DateTime<Utc>),
    /// A value qualified by a known `TZID`.
    Zoned(DateTime<chrono_tz::Tz>),
    /// A value without zone information.
    Floating(NaiveDateTime),
}

impl SourceTime {
    /// Returns true for `VALUE=DATE` values.
    pub(crate) fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Resolves this value to an [`EventTime`].
    ///
    /// Floating values are read as wall-clock time in `floating`.
    pub(crate) fn resolve(&self, floating: &TargetZone) -> EventTime {
        match self {
            Self::Date(date) => EventTime::from_date(*date),
            Self::Utc(dt) => EventTime::from_utc(*dt),
            Self::Zoned(dt) => EventTime::from_local(*dt),
            Self::Floating(naive) => EventTime::from_utc(localize_in(floating, naive)),
        }
    }
}

/// Maps a local wall-clock time onto an instant in `tz`.
///
/// Ambiguous times take the earlier instant; times inside a DST gap are
/// moved forward by an hour.
pub(crate) fn localize<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| {
            let shifted = naive.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(naive))
}

/// Maps a floating wall-clock time onto a UTC instant in the target zone.
pub(crate) fn localize_in(zone: &TargetZone, naive: &NaiveDateTime) -> DateTime<Utc> {
    match zone {
        TargetZone::Local => localize(&Local, naive).with_timezone(&Utc),
        TargetZone::Named(tz) => localize(tz, naive).with_timezone(&Utc),
    }
}

/// One `VEVENT`, as written in the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EventRecord {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: SourceTime,
    pub end: Option<SourceTime>,
    pub duration: Option<Duration>,
    pub rrules: Vec<String>,
    pub rdates: Vec<SourceTime>,
    pub exdates: Vec<SourceTime>,
    pub recurrence_id: Option<SourceTime>,
}

impl EventRecord {
    /// Returns the UID, or a placeholder for diagnostics.
    pub(crate) fn uid_or_placeholder(&self) -> &str {
        self.uid.as_deref().unwrap_or("(no uid)")
    }

    /// Returns true if this record carries recurrence information.
    pub(crate) fn is_recurring(&self) -> bool {
        !self.rrules.is_empty() || !self.rdates.is_empty()
    }

    /// Resolves start and end of the record's first occurrence.
    ///
    /// Without DTEND the end comes from DURATION; without either, or when
    /// the DURATION runs past the representable range, all-day events last
    /// one day and timed events have no length.
    pub(crate) fn resolve_span(&self, floating: &TargetZone) -> (EventTime, EventTime) {
        let start = self.start.resolve(floating);
        let end = match self.end {
            Some(end) => end.resolve(floating),
            None => self
                .duration
                .and_then(|duration| {
                    let end = end_after(&start, duration);
                    if end.is_none() {
                        warn!(uid = %self.uid_or_placeholder(), "DURATION out of range, ignored");
                    }
                    end
                })
                .unwrap_or_else(|| default_end(&start)),
        };
        (start, end)
    }
}

/// Adds a DURATION to a start value, or `None` if the result overflows.
///
/// All-day values only move by whole days.
fn end_after(start: &EventTime, duration: Duration) -> Option<EventTime> {
    match start {
        EventTime::AllDay(date) => {
            let days = Duration::try_days(duration.num_days())?;
            date.checked_add_signed(days).map(EventTime::from_date)
        }
        EventTime::DateTime(dt) => dt.checked_add_signed(duration).map(EventTime::from_utc),
    }
}

fn default_end(start: &EventTime) -> EventTime {
    match start {
        EventTime::AllDay(date) => EventTime::from_date(date.succ_opt().unwrap_or(*date)),
        EventTime::DateTime(dt) => EventTime::from_utc(*dt),
    }
}

/// Extracts every `VEVENT` of a parsed calendar.
///
/// Events without DTSTART cannot be placed on a timeline and are skipped.
pub(crate) fn extract_events(calendar: &Calendar) -> Vec<EventRecord> {
    calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => parse_event(event),
            _ => None,
        })
        .collect()
}

/// Parses a single VEVENT component into an EventRecord.
fn parse_event(event: &Event) -> Option<EventRecord> {
    let uid = event.get_uid().map(str::to_string);
    let Some(start) = event.get_start().map(convert_date_time) else {
        warn!(uid = ?uid, summary = ?event.get_summary(), "Skipping event without DTSTART");
        return None;
    };

    let record = EventRecord {
        uid,
        summary: event.get_summary().map(str::to_string),
        location: event.get_location().map(str::to_string),
        description: event.get_description().map(str::to_string),
        start,
        end: event.get_end().map(convert_date_time),
        duration: event.property_value("DURATION").and_then(parse_duration),
        rrules: all_properties(event, "RRULE")
            .map(|prop| prop.value().to_string())
            .collect(),
        rdates: all_properties(event, "RDATE")
            .flat_map(property_times)
            .collect(),
        exdates: all_properties(event, "EXDATE")
            .flat_map(property_times)
            .collect(),
        recurrence_id: all_properties(event, "RECURRENCE-ID")
            .flat_map(property_times)
            .next(),
    };

    debug!(
        uid = %record.uid_or_placeholder(),
        summary = ?record.summary,
        start = ?record.start,
        recurring = record.is_recurring(),
        "Parsed event from ICS"
    );

    Some(record)
}

/// Returns every occurrence of a property, single- or multi-valued.
fn all_properties<'a>(event: &'a Event, name: &'a str) -> impl Iterator<Item = &'a Property> {
    event
        .properties()
        .get(name)
        .into_iter()
        .chain(event.multi_properties().get(name).into_iter().flatten())
}

/// Converts icalendar DatePerhapsTime to SourceTime.
fn convert_date_time(dt: DatePerhapsTime) -> SourceTime {
    match dt {
        DatePerhapsTime::Date(date) => SourceTime::Date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => SourceTime::Utc(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => SourceTime::Floating(naive),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            zoned(&date_time, &tzid)
        }
    }
}

/// Attaches a TZID to a wall-clock time.
///
/// Identifiers outside the tz database are read as UTC.
fn zoned(naive: &NaiveDateTime, tzid: &str) -> SourceTime {
    match resolve_tzid(tzid) {
        Some(tz) => SourceTime::Zoned(localize(&tz, naive)),
        None => {
            warn!(tzid, "Unknown TZID, assuming UTC");
            SourceTime::Utc(naive.and_utc())
        }
    }
}

/// Looks up a TZID in the tz database.
///
/// Accepts plain IANA names as well as the path-prefixed forms some
/// producers emit (`/mozilla.org/20050126_1/Europe/Berlin`).
pub(crate) fn resolve_tzid(tzid: &str) -> Option<chrono_tz::Tz> {
    let tzid = tzid.trim().trim_matches('"');
    if let Ok(tz) = tzid.parse() {
        return Some(tz);
    }

    let segments: Vec<&str> = tzid.split('/').filter(|s| !s.is_empty()).collect();
    (1..=segments.len().min(3))
        .rev()
        .find_map(|n| segments[segments.len() - n..].join("/").parse().ok())
}

/// Parses the (possibly comma-separated) values of a date-list property.
fn property_times(prop: &Property) -> Vec<SourceTime> {
    let tzid = prop.params().get("TZID").map(|param| param.value());
    prop.value()
        .split(',')
        .filter_map(|value| {
            // RDATE;VALUE=PERIOD: only the start matters
            let value = value.split('/').next().unwrap_or(value);
            parse_ical_time(value, tzid)
        })
        .collect()
}

/// Parses a single DATE or DATE-TIME value.
///
/// Handles formats like:
/// - 20250205T100000Z (UTC)
/// - 20250205T100000 (floating, or zoned when `tzid` is given)
/// - 20250205 (date only)
pub(crate) fn parse_ical_time(value: &str, tzid: Option<&str>) -> Option<SourceTime> {
    let value = value.trim();

    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(SourceTime::Date);
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(SourceTime::Utc(naive.and_utc()));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    Some(match tzid {
        Some(tzid) => zoned(&naive, tzid),
        None => SourceTime::Floating(naive),
    })
}

/// Parses an ISO 8601 duration (`P1D`, `PT1H30M`, `-P2W`).
///
/// Returns `None` for malformed values and for durations too large to
/// represent.
pub(crate) fn parse_duration(value: &str) -> Option<Duration> {
    let caps = DURATION_REGEX.captures(value.trim())?;
    let part = |idx: usize, unit: fn(i64) -> Option<Duration>| -> Option<Duration> {
        match caps.get(idx) {
            Some(m) => unit(m.as_str().parse().ok()?),
            None => Some(Duration::zero()),
        }
    };

    let duration = part(2, Duration::try_weeks)?
        .checked_add(&part(3, Duration::try_days)?)?
        .checked_add(&part(4, Duration::try_hours)?)?
        .checked_add(&part(5, Duration::try_minutes)?)?
        .checked_add(&part(6, Duration::try_seconds)?)?;

    Some(if caps.get(1).is_some_and(|m| m.as_str() == "-") {
        -duration
    } else {
        duration
    })
}

/// Midnight of a date, for callers that need a wall-clock value.
pub(crate) fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}
