//! The conversion engine.
//!
//! A [`Converter`] owns everything that stays fixed for one run: the
//! options, the time window derived from "now", and the collaborators that
//! decode calendars and convert markup. A run is a single pass:
//!
//! 1. decode the input and ask the backend for the occurrences in the window
//! 2. normalize each occurrence, render its body and stamps
//! 3. write one outline block per occurrence
//!
//! All blocks are rendered before anything is written, so a failure leaves
//! the sink untouched. An optional progress bar follows step 2.

use std::fmt;
use std::io;

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tracing::{debug, info, instrument};

use crate::body::{MarkupConverter, MarkupSniffer, render_body};
use crate::error::Result;
use crate::event::{CanonicalEvent, RawEvent, normalize};
use crate::time::{EventTime, TargetZone, TimeWindow, format_date, format_instant};

/// Default window radius in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 90;

/// Decodes calendar sources and expands them into occurrences.
pub trait CalendarBackend {
    /// The decoded calendar representation.
    type Calendar;

    /// Decodes raw calendar text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Decode`] on malformed input.
    fn decode(&self, input: &str) -> Result<Self::Calendar>;

    /// Returns every occurrence intersecting `window`, ordered by start.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Recurrence`] when a recurrence set cannot be
    /// expanded.
    fn expand(&self, calendar: &Self::Calendar, window: &TimeWindow) -> Result<Vec<RawEvent>>;
}

/// Options fixed for one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Window radius in days, left and right of "now".
    pub window_days: u32,
    /// Zone timed stamps are rendered in.
    pub timezone: TargetZone,
    /// Whether the location is appended to headlines.
    pub include_location: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            timezone: TargetZone::Local,
            include_location: true,
        }
    }
}

impl ConversionOptions {
    /// Set the window radius.
    #[must_use]
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Set the target zone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: TargetZone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set whether locations are appended to headlines.
    #[must_use]
    pub fn with_location(mut self, include_location: bool) -> Self {
        self.include_location = include_location;
        self
    }
}

/// Converts a calendar source into org outline text.
pub struct Converter<B, S, C> {
    options: ConversionOptions,
    window: TimeWindow,
    backend: B,
    sniffer: S,
    converter: C,
    progress: Option<ProgressBar>,
}

impl<B: fmt::Debug, S: fmt::Debug, C: fmt::Debug> fmt::Debug for Converter<B, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("window", &self.window)
            .field("backend", &self.backend)
            .field("sniffer", &self.sniffer)
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}

impl<B, S, C> Converter<B, S, C>
where
    B: CalendarBackend,
    S: MarkupSniffer,
    C: MarkupConverter,
{
    /// Creates a converter whose window is centered on `now`.
    pub fn new(
        options: ConversionOptions,
        now: DateTime<Utc>,
        backend: B,
        sniffer: S,
        converter: C,
    ) -> Self {
        Self {
            window: TimeWindow::around(now, options.window_days),
            options,
            backend,
            sniffer,
            converter,
            progress: None,
        }
    }

    /// Reports rendering progress on `progress`, one tick per occurrence.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Returns the options of this run.
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Returns the window occurrences are selected from.
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Decodes `input` and returns the occurrences inside the window.
    ///
    /// # Errors
    ///
    /// Propagates decode and expansion failures.
    pub fn fetch(&self, input: &str) -> Result<Vec<RawEvent>> {
        let calendar = self.backend.decode(input)?;
        self.backend.expand(&calendar, &self.window)
    }

    /// Renders one occurrence into its outline block representation.
    ///
    /// # Errors
    ///
    /// Propagates markup conversion failures.
    pub fn render_event(&self, raw: &RawEvent) -> Result<CanonicalEvent> {
        let normalized = normalize(raw, self.options.include_location);
        let body = normalized
            .body
            .as_deref()
            .map(|body| render_body(body, &self.sniffer, &self.converter))
            .transpose()?;
        let (start_stamp, end_stamp) = self.stamps(raw);

        Ok(CanonicalEvent {
            title: normalized.title,
            start_stamp,
            end_stamp,
            body,
        })
    }

    /// Converts a calendar source into org text.
    ///
    /// # Errors
    ///
    /// Returns the first decode, expansion or conversion error; no partial
    /// output is produced.
    pub fn convert(&self, input: &str) -> Result<String> {
        self.render_all(input).map(|(text, _)| text)
    }

    /// Converts a calendar source and writes the org text to `out`.
    ///
    /// Returns the number of events written. Nothing is written when the
    /// conversion fails.
    ///
    /// # Errors
    ///
    /// Returns conversion errors, or [`crate::Error::Io`] if writing fails.
    #[instrument(skip_all, fields(window_days = self.options.window_days, zone = %self.options.timezone))]
    pub fn convert_to<W: io::Write>(&self, input: &str, out: &mut W) -> Result<usize> {
        let (text, count) = self.render_all(input)?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        info!(events = count, bytes = text.len(), "Conversion finished");
        Ok(count)
    }

    fn render_all(&self, input: &str) -> Result<(String, usize)> {
        let events = self.fetch(input)?;
        debug!(
            count = events.len(),
            start = %self.window.start,
            end = %self.window.end,
            "Fetched occurrences"
        );

        if let Some(pb) = &self.progress {
            pb.set_length(events.len() as u64);
            pb.set_position(0);
        }
        let text = self.render_events(&events);
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        Ok((text?, events.len()))
    }

    fn render_events(&self, events: &[RawEvent]) -> Result<String> {
        let mut text = String::new();
        for raw in events {
            let event = self.render_event(raw)?;
            debug!(title = %event.title, start = %event.start_stamp, "Rendered event");
            text.push_str(&event.to_string());
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }
        Ok(text)
    }

    /// Renders the start and end stamps of an occurrence.
    ///
    /// Timed events use the target zone. All-day events are shown in UTC
    /// with the exclusive end turned into the last included day.
    fn stamps(&self, raw: &RawEvent) -> (String, String) {
        match raw.start {
            EventTime::DateTime(start) => (
                format_instant(&start, &self.options.timezone),
                format_instant(&raw.end.to_utc_datetime(), &self.options.timezone),
            ),
            EventTime::AllDay(start) => {
                let end = raw.end.date();
                let last_day = end.pred_opt().unwrap_or(end);
                (
                    format_date(start, &TargetZone::UTC),
                    format_date(last_day, &TargetZone::UTC),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::tests::{FailingConverter, StripConverter, TagSniffer};
    use crate::error::Error;
    use crate::time::resolve_timezone;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Backend whose "calendar" is a fixed list of occurrences.
    ///
    /// Input `"broken"` fails to decode; the window filter mirrors what a
    /// real expansion service does.
    struct FixedBackend(Vec<RawEvent>);

    impl CalendarBackend for FixedBackend {
        type Calendar = Vec<RawEvent>;

        fn decode(&self, input: &str) -> Result<Self::Calendar> {
            if input == "broken" {
                return Err(Error::decode("Expected BEGIN:VCALENDAR"));
            }
            Ok(self.0.clone())
        }

        fn expand(&self, calendar: &Self::Calendar, window: &TimeWindow) -> Result<Vec<RawEvent>> {
            Ok(calendar
                .iter()
                .filter(|event| window.overlaps_event(&event.start, &event.end))
                .cloned()
                .collect())
        }
    }

    fn now() -> DateTime<Utc> {
        utc(2024, 3, 1, 12, 0)
    }

    fn converter_for(
        events: Vec<RawEvent>,
        options: ConversionOptions,
    ) -> Converter<FixedBackend, TagSniffer, StripConverter> {
        Converter::new(options, now(), FixedBackend(events), TagSniffer, StripConverter)
    }

    fn utc_options() -> ConversionOptions {
        ConversionOptions::default().with_timezone(TargetZone::UTC)
    }

    fn standup() -> RawEvent {
        RawEvent::new(
            EventTime::from_utc(utc(2024, 3, 1, 9, 0)),
            EventTime::from_utc(utc(2024, 3, 1, 9, 15)),
        )
        .with_summary("Standup")
        .with_location("Room\\, 5")
    }

    fn offsite() -> RawEvent {
        RawEvent::new(
            EventTime::from_date(date(2024, 3, 1)),
            EventTime::from_date(date(2024, 3, 3)),
        )
        .with_summary("Offsite")
        .with_description("<p>Bring\\, laptops</p>")
    }

    mod stamps {
        use super::*;

        #[test]
        fn timed_event_in_target_zone() {
            let options = utc_options().with_timezone(resolve_timezone(Some("Europe/Helsinki")).unwrap());
            let converter = converter_for(vec![], options);
            let event = converter.render_event(&standup()).unwrap();
            assert_eq!(event.start_stamp, "<2024-03-01 Fri 11:00>");
            assert_eq!(event.end_stamp, "<2024-03-01 Fri 11:15>");
        }

        #[test]
        fn timed_stamps_stay_ordered_across_dst() {
            let stamp_time = |stamp: &str| {
                NaiveDateTime::parse_from_str(stamp.trim_matches(['<', '>']), "%Y-%m-%d %a %H:%M")
                    .unwrap()
            };
            let new_york = chrono_tz::America::New_York;
            let berlin = chrono_tz::Europe::Berlin;
            // New York springs forward on 2024-03-10, Berlin on 2024-03-31
            let cases = [
                (
                    new_york.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap(),
                    new_york.with_ymd_and_hms(2024, 3, 10, 3, 30, 0).unwrap(),
                    "Europe/Helsinki",
                    ("<2024-03-10 Sun 08:30>", "<2024-03-10 Sun 09:30>"),
                ),
                (
                    berlin.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap(),
                    berlin.with_ymd_and_hms(2024, 3, 31, 3, 30, 0).unwrap(),
                    "Asia/Tokyo",
                    ("<2024-03-31 Sun 09:30>", "<2024-03-31 Sun 10:30>"),
                ),
            ];

            for (start, end, zone, expected) in cases {
                let raw = RawEvent::new(EventTime::from_local(start), EventTime::from_local(end));
                let options = utc_options().with_timezone(resolve_timezone(Some(zone)).unwrap());
                let event = converter_for(vec![], options).render_event(&raw).unwrap();

                assert_eq!((event.start_stamp.as_str(), event.end_stamp.as_str()), expected);
                assert!(stamp_time(&event.end_stamp) >= stamp_time(&event.start_stamp));
            }
        }

        #[test]
        fn all_day_end_is_inclusive() {
            let converter = converter_for(vec![], utc_options());
            let event = converter.render_event(&offsite()).unwrap();
            assert_eq!(event.start_stamp, "<2024-03-01 Fri>");
            assert_eq!(event.end_stamp, "<2024-03-02 Sat>");
        }

        #[test]
        fn all_day_ignores_target_zone() {
            let options = utc_options().with_timezone(resolve_timezone(Some("Pacific/Kiritimati")).unwrap());
            let converter = converter_for(vec![], options);
            let event = converter.render_event(&offsite()).unwrap();
            assert_eq!(event.start_stamp, "<2024-03-01 Fri>");
        }

        #[test]
        fn single_day_event() {
            let raw = RawEvent::new(
                EventTime::from_date(date(2024, 2, 29)),
                EventTime::from_date(date(2024, 3, 1)),
            );
            let converter = converter_for(vec![], utc_options());
            let event = converter.render_event(&raw).unwrap();
            assert_eq!(event.start_stamp, "<2024-02-29 Thu>");
            assert_eq!(event.end_stamp, "<2024-02-29 Thu>");
        }
    }

    mod conversion {
        use super::*;

        #[test]
        fn renders_blocks_in_backend_order() {
            let converter = converter_for(vec![standup(), offsite()], utc_options());
            insta::assert_debug_snapshot!(
                converter.convert("calendar").unwrap(),
                @r#""* Standup - Room, 5\n  <2024-03-01 Fri 09:00>--<2024-03-01 Fri 09:15>\n\n* Offsite\n  <2024-03-01 Fri>--<2024-03-02 Sat>\nconverted: Bring, laptops\n\n""#
            );
        }

        #[test]
        fn location_can_be_left_out() {
            let converter = converter_for(vec![standup()], utc_options().with_location(false));
            let text = converter.convert("calendar").unwrap();
            assert!(text.starts_with("* Standup\n"));
        }

        #[test]
        fn output_is_idempotent() {
            let converter = converter_for(vec![standup(), offsite()], utc_options());
            assert_eq!(
                converter.convert("calendar").unwrap(),
                converter.convert("calendar").unwrap()
            );
        }

        #[test]
        fn progress_counts_rendered_events() {
            let pb = ProgressBar::hidden();
            let converter =
                converter_for(vec![standup(), offsite()], utc_options()).with_progress(pb.clone());
            converter.convert("calendar").unwrap();
            assert_eq!(pb.length(), Some(2));
            assert_eq!(pb.position(), 2);
            assert!(pb.is_finished());
        }

        #[test]
        fn events_outside_window_are_dropped() {
            let far = RawEvent::new(
                EventTime::from_utc(utc(2025, 1, 1, 9, 0)),
                EventTime::from_utc(utc(2025, 1, 1, 10, 0)),
            )
            .with_summary("Far away");
            let converter = converter_for(vec![far], utc_options().with_window_days(30));
            assert_eq!(converter.convert("calendar").unwrap(), "");
        }

        #[test]
        fn event_on_window_boundary_is_kept() {
            let edge = RawEvent::new(
                EventTime::from_utc(utc(2024, 3, 11, 12, 0)),
                EventTime::from_utc(utc(2024, 3, 11, 13, 0)),
            )
            .with_summary("Edge");
            let converter = converter_for(vec![edge], utc_options().with_window_days(10));
            assert!(converter.convert("calendar").unwrap().starts_with("* Edge\n"));
        }

        #[test]
        fn window_is_centered_on_now() {
            let converter = converter_for(vec![], utc_options().with_window_days(1));
            assert_eq!(converter.window().start, utc(2024, 2, 29, 12, 0));
            assert_eq!(converter.window().end, utc(2024, 3, 2, 12, 0));
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn decode_error_writes_nothing() {
            let converter = converter_for(vec![standup()], utc_options());
            let mut out = Vec::new();
            let err = converter.convert_to("broken", &mut out).unwrap_err();
            assert!(matches!(err, Error::Decode(_)));
            assert!(out.is_empty());
        }

        #[test]
        fn conversion_error_writes_nothing() {
            let converter = Converter::new(
                utc_options(),
                now(),
                FixedBackend(vec![standup(), offsite()]),
                TagSniffer,
                FailingConverter,
            );
            let mut out = Vec::new();
            let err = converter.convert_to("calendar", &mut out).unwrap_err();
            assert!(matches!(err, Error::Conversion(_)));
            assert!(out.is_empty());
        }

        #[test]
        fn convert_to_reports_event_count() {
            let converter = converter_for(vec![standup(), offsite()], utc_options());
            let mut out = Vec::new();
            assert_eq!(converter.convert_to("calendar", &mut out).unwrap(), 2);
            assert!(String::from_utf8(out).unwrap().contains("* Offsite\n"));
        }
    }

    #[test]
    fn default_options() {
        let options = ConversionOptions::default();
        assert_eq!(options.window_days, 90);
        assert_eq!(options.timezone, TargetZone::Local);
        assert!(options.include_location);
    }
}
