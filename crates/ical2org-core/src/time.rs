//! Time types and org timestamp rendering.
//!
//! This module provides [`EventTime`] for event start/end values (either a
//! specific instant or an all-day date), [`TimeWindow`] for the range of
//! occurrences a run covers, [`TargetZone`] for the zone stamps are shown
//! in, and the two formatting functions used to render org timestamps.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// strftime pattern for timed org stamps, e.g. `<2024-03-01 Fri 09:30>`.
const INSTANT_FORMAT: &str = "<%Y-%m-%d %a %H:%M>";

/// strftime pattern for date-only org stamps, e.g. `<2024-03-01 Fri>`.
const DATE_FORMAT: &str = "<%Y-%m-%d %a>";

/// Represents the start or end of a calendar event.
///
/// - **DateTime**: a specific point in time, stored as UTC
/// - **AllDay**: a calendar date without a time component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns `true` if this is a specific datetime.
    pub fn is_datetime(&self) -> bool {
        matches!(self, Self::DateTime(_))
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Returns the date portion of this event time (UTC for datetimes).
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// The range of occurrences a conversion run covers.
///
/// Represents a closed interval `[start, end]` in UTC, centered on the
/// moment the run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the window `[center - days, center + days]`.
    ///
    /// Radii reaching past the representable range saturate at chrono's
    /// minimum/maximum instants.
    pub fn around(center: DateTime<Utc>, days: u32) -> Self {
        let radius = Duration::days(i64::from(days));
        Self {
            start: center
                .checked_sub_signed(radius)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: center
                .checked_add_signed(radius)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window, boundaries included.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }

    /// Checks if an occurrence spanning `[start, end]` touches this window.
    ///
    /// All-day values are compared at midnight UTC.
    pub fn overlaps_event(&self, event_start: &EventTime, event_end: &EventTime) -> bool {
        let start = event_start.to_utc_datetime();
        let end = event_end.to_utc_datetime().max(start);
        start <= self.end && end >= self.start
    }
}

/// The zone org stamps of timed events are rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetZone {
    /// The process local timezone.
    #[default]
    Local,
    /// An IANA timezone from the tz database.
    Named(chrono_tz::Tz),
}

impl TargetZone {
    /// UTC, used for all-day stamps.
    pub const UTC: Self = Self::Named(chrono_tz::UTC);

    /// Converts an instant into this zone and formats it with `pattern`.
    fn format<Tz: TimeZone>(&self, instant: &DateTime<Tz>, pattern: &str) -> String {
        match self {
            Self::Local => instant.with_timezone(&Local).format(pattern).to_string(),
            Self::Named(tz) => instant.with_timezone(tz).format(pattern).to_string(),
        }
    }
}

impl fmt::Display for TargetZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Resolves an optional timezone identifier.
///
/// `None` selects the process local zone.
///
/// # Errors
///
/// Returns [`Error::InvalidTimezone`] when the identifier is not in the tz
/// database.
pub fn resolve_timezone(name: Option<&str>) -> Result<TargetZone> {
    match name {
        None => Ok(TargetZone::Local),
        Some(name) => name
            .parse::<chrono_tz::Tz>()
            .map(TargetZone::Named)
            .map_err(|_| Error::InvalidTimezone(name.to_string())),
    }
}

/// Returns every timezone identifier accepted by [`resolve_timezone`].
pub fn timezone_names() -> impl Iterator<Item = &'static str> {
    chrono_tz::TZ_VARIANTS.iter().map(|tz| tz.name())
}

/// Formats an instant as `<YYYY-MM-DD Dow HH:MM>` in the target zone.
pub fn format_instant<Tz: TimeZone>(instant: &DateTime<Tz>, zone: &TargetZone) -> String {
    zone.format(instant, INSTANT_FORMAT)
}

/// Formats a calendar date as `<YYYY-MM-DD Dow>`.
///
/// The date is taken as midnight UTC and converted to `zone`; with
/// [`TargetZone::UTC`] the label is exactly the given date.
pub fn format_date(date: NaiveDate, zone: &TargetZone) -> String {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    zone.format(&midnight, DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_time {
        use super::*;

        #[test]
        fn to_utc_datetime() {
            let dt = utc(2025, 2, 5, 10, 30, 0);
            assert_eq!(EventTime::from_utc(dt).to_utc_datetime(), dt);
            assert_eq!(
                EventTime::from_date(date(2025, 2, 5)).to_utc_datetime(),
                utc(2025, 2, 5, 0, 0, 0)
            );
        }

        #[test]
        fn from_local_normalizes_to_utc() {
            let berlin = chrono_tz::Europe::Berlin
                .with_ymd_and_hms(2024, 7, 1, 12, 0, 0)
                .unwrap();
            assert_eq!(
                EventTime::from_local(berlin),
                EventTime::from_utc(utc(2024, 7, 1, 10, 0, 0))
            );
        }

        #[test]
        fn ordering() {
            let et1 = EventTime::from_utc(utc(2025, 2, 5, 10, 0, 0));
            let et2 = EventTime::from_utc(utc(2025, 2, 5, 11, 0, 0));
            let et3 = EventTime::from_date(date(2025, 2, 5));

            assert!(et3 < et1); // midnight < 10:00
            assert!(et1 < et2);
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn around_is_symmetric() {
            let now = utc(2024, 3, 1, 12, 0, 0);
            let window = TimeWindow::around(now, 90);
            assert_eq!(window.start, utc(2023, 12, 2, 12, 0, 0));
            assert_eq!(window.end, utc(2024, 5, 30, 12, 0, 0));
            assert_eq!(window.duration(), Duration::days(180));
        }

        #[test]
        fn zero_radius_is_a_single_instant() {
            let now = utc(2024, 3, 1, 12, 0, 0);
            let window = TimeWindow::around(now, 0);
            assert!(window.contains(now));
            assert!(!window.contains(now + Duration::seconds(1)));
        }

        #[test]
        fn huge_radius_saturates() {
            let window = TimeWindow::around(utc(2024, 3, 1, 12, 0, 0), u32::MAX);
            assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
            assert_eq!(window.end, DateTime::<Utc>::MAX_UTC);
        }

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn invalid_window() {
            TimeWindow::new(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 9, 0, 0));
        }

        #[test]
        fn boundaries_are_inclusive() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 17, 0, 0));
            assert!(window.contains(utc(2025, 2, 5, 9, 0, 0)));
            assert!(window.contains(utc(2025, 2, 5, 17, 0, 0)));
            assert!(!window.contains(utc(2025, 2, 5, 8, 59, 59)));
            assert!(!window.contains(utc(2025, 2, 5, 17, 0, 1)));
        }

        #[test]
        fn overlaps_event() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 17, 0, 0));
            let at = |h, m| EventTime::from_utc(utc(2025, 2, 5, h, m, 0));

            // inside, straddling either edge, covering the window
            assert!(window.overlaps_event(&at(10, 0), &at(11, 0)));
            assert!(window.overlaps_event(&at(8, 0), &at(10, 0)));
            assert!(window.overlaps_event(&at(16, 0), &at(18, 0)));
            assert!(window.overlaps_event(&at(8, 0), &at(18, 0)));

            // starts exactly at the window end
            assert!(window.overlaps_event(&at(17, 0), &at(18, 0)));

            // entirely before / after
            assert!(!window.overlaps_event(&at(7, 0), &at(8, 59)));
            assert!(!window.overlaps_event(&at(17, 1), &at(18, 0)));
        }
    }

    mod formatting {
        use super::*;

        #[test]
        fn instant_in_named_zone() {
            let zone = resolve_timezone(Some("America/New_York")).unwrap();
            let stamp = format_instant(&utc(2024, 3, 1, 14, 5, 0), &zone);
            assert_eq!(stamp, "<2024-03-01 Fri 09:05>");
        }

        #[test]
        fn weekday_follows_target_zone() {
            // 23:30 UTC on a Friday is already Saturday in Tokyo
            let zone = resolve_timezone(Some("Asia/Tokyo")).unwrap();
            let stamp = format_instant(&utc(2024, 3, 1, 23, 30, 0), &zone);
            assert_eq!(stamp, "<2024-03-02 Sat 08:30>");
        }

        #[test]
        fn source_zone_is_irrelevant() {
            let paris = chrono_tz::Europe::Paris
                .with_ymd_and_hms(2024, 3, 1, 10, 0, 0)
                .unwrap();
            assert_eq!(format_instant(&paris, &TargetZone::UTC), "<2024-03-01 Fri 09:00>");
        }

        #[test]
        fn date_in_utc() {
            assert_eq!(format_date(date(2024, 3, 1), &TargetZone::UTC), "<2024-03-01 Fri>");
            assert_eq!(format_date(date(2024, 2, 29), &TargetZone::UTC), "<2024-02-29 Thu>");
        }

        #[test]
        fn zero_padding() {
            let stamp = format_instant(&utc(2024, 1, 7, 3, 4, 0), &TargetZone::UTC);
            assert_eq!(stamp, "<2024-01-07 Sun 03:04>");
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn none_means_local() {
            assert_eq!(resolve_timezone(None).unwrap(), TargetZone::Local);
        }

        #[test]
        fn rejects_unknown_identifier() {
            let err = resolve_timezone(Some("Europe/Atlantis")).unwrap_err();
            assert!(matches!(err, Error::InvalidTimezone(ref name) if name == "Europe/Atlantis"));
        }

        #[test]
        fn lists_known_identifiers() {
            let names: Vec<_> = timezone_names().collect();
            assert!(names.contains(&"Europe/Helsinki"));
            assert!(names.contains(&"UTC"));
            assert!(names.iter().all(|name| resolve_timezone(Some(name)).is_ok()));
        }

        #[test]
        fn display() {
            assert_eq!(TargetZone::Local.to_string(), "local");
            assert_eq!(TargetZone::UTC.to_string(), "UTC");
        }
    }
}
