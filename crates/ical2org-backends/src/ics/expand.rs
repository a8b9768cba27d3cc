//! Recurrence expansion using the `rrule` crate.
//!
//! Every record is turned into the list of its occurrences inside a
//! [`TimeWindow`]. Recurring records are expanded in their own zone so
//! wall-clock times survive DST transitions; instances overridden by a
//! `RECURRENCE-ID` record are replaced by that record.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use rrule::{RRule, RRuleSet, Tz, Unvalidated};
use tracing::{debug, warn};

use ical2org_core::{Error, EventTime, RawEvent, Result, TargetZone, TimeWindow};

use super::parse::{EventRecord, SourceTime, localize, localize_in, midnight};

/// Upper bound on occurrences generated per recurrence set.
///
/// Stops runaway rules (e.g. `FREQ=SECONDLY` started decades ago).
pub const MAX_OCCURRENCES: usize = 100_000;

/// UNTIL part of an RRULE, captured so it can be rewritten in UTC.
static UNTIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)UNTIL=([0-9]{8}(?:T[0-9]{6})?Z?)").expect("Invalid UNTIL regex"));

/// Options for recurrence expansion.
#[derive(Debug, Clone)]
pub struct ExpansionOptions {
    /// Zone floating times are read in.
    pub floating_zone: TargetZone,
    /// Maximum number of occurrences generated per event.
    pub max_occurrences: usize,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            floating_zone: TargetZone::Local,
            max_occurrences: MAX_OCCURRENCES,
        }
    }
}

impl ExpansionOptions {
    /// Creates expansion options reading floating times in `zone`.
    #[must_use]
    pub fn with_floating_zone(zone: TargetZone) -> Self {
        Self {
            floating_zone: zone,
            ..Self::default()
        }
    }

    /// Sets the maximum number of occurrences per event.
    #[must_use]
    pub fn with_max_occurrences(mut self, max: usize) -> Self {
        self.max_occurrences = max;
        self
    }
}

/// Identifies one instance of a recurring event: its UID plus start instant.
type InstanceKey = (String, DateTime<Utc>);

/// Expands records into the occurrences that touch `window`.
///
/// The result is sorted by occurrence start; ties keep calendar order.
///
/// # Errors
///
/// Returns [`Error::Recurrence`] if an RRULE cannot be parsed or validated.
pub(crate) fn expand_records(
    records: &[EventRecord],
    window: &TimeWindow,
    options: &ExpansionOptions,
) -> Result<Vec<RawEvent>> {
    let overridden: HashSet<InstanceKey> = records
        .iter()
        .filter_map(|record| {
            let uid = record.uid.clone()?;
            let recurrence_id = record.recurrence_id?;
            Some((uid, recurrence_id.resolve(&options.floating_zone).to_utc_datetime()))
        })
        .collect();

    let mut occurrences = Vec::new();
    for record in records {
        let spans = if record.is_recurring() && record.recurrence_id.is_none() {
            expand_recurring(record, window, options)?
        } else {
            vec![record.resolve_span(&options.floating_zone)]
        };

        let mut kept = 0usize;
        for (start, end) in spans {
            if !window.overlaps_event(&start, &end) {
                continue;
            }
            if record.recurrence_id.is_none()
                && let Some(ref uid) = record.uid
                && overridden.contains(&(uid.clone(), start.to_utc_datetime()))
            {
                continue;
            }
            occurrences.push(occurrence(record, start, end));
            kept += 1;
        }

        debug!(uid = %record.uid_or_placeholder(), occurrences = kept, "Expanded event");
    }

    // stable: equal starts keep calendar order
    occurrences.sort_by_key(|event: &RawEvent| event.start);
    Ok(occurrences)
}

/// Builds the RawEvent for one occurrence of a record.
fn occurrence(record: &EventRecord, start: EventTime, end: EventTime) -> RawEvent {
    RawEvent {
        summary: record.summary.clone(),
        location: record.location.clone(),
        description: record.description.clone(),
        start,
        end,
    }
}

/// Expands a recurring record into the `(start, end)` spans that can reach
/// the window.
///
/// Instances ending before the window are skipped without counting toward
/// the occurrence limit.
fn expand_recurring(
    record: &EventRecord,
    window: &TimeWindow,
    options: &ExpansionOptions,
) -> Result<Vec<(EventTime, EventTime)>> {
    let (first_start, first_end) = record.resolve_span(&options.floating_zone);
    let length = (first_end.to_utc_datetime() - first_start.to_utc_datetime()).max(Duration::zero());
    let earliest = window
        .start
        .checked_sub_signed(length)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut set = recurrence_set(record)?;
    // floating instances move by up to a day once placed in their zone
    if let Some(after) = earliest.checked_sub_signed(Duration::days(1)) {
        set = set.after(after.with_timezone(&Tz::UTC));
    }

    let mut spans = Vec::new();
    for instance in set.into_iter() {
        let start = from_rule_zone(&record.start, &instance, &options.floating_zone);
        let instant = start.to_utc_datetime();
        if instant > window.end {
            break;
        }
        if instant < earliest {
            continue;
        }
        if spans.len() == options.max_occurrences {
            warn!(
                uid = %record.uid_or_placeholder(),
                limit = options.max_occurrences,
                "Recurrence truncated"
            );
            break;
        }
        spans.push((start, shift_end(&first_start, &first_end, &start)));
    }

    Ok(spans)
}

/// Builds the rrule set (RRULE + RDATE - EXDATE) anchored at DTSTART.
fn recurrence_set(record: &EventRecord) -> Result<RRuleSet> {
    let uid = record.uid_or_placeholder();
    let zone = rule_zone(&record.start);
    let dtstart = to_rule_zone(&record.start, &zone);

    let mut set = RRuleSet::new(dtstart.clone());
    for rule in &record.rrules {
        let rule = normalize_until(rule, &zone);
        let rrule: RRule<Unvalidated> = rule
            .parse()
            .map_err(|e| Error::recurrence(uid, e))?;
        let rrule = rrule
            .validate(dtstart.clone())
            .map_err(|e| Error::recurrence(uid, e))?;
        set = set.rrule(rrule);
    }

    // RDATE-only sets still start at DTSTART
    if record.rrules.is_empty() {
        set = set.rdate(dtstart);
    }
    for rdate in &record.rdates {
        set = set.rdate(to_rule_zone(rdate, &zone));
    }
    for exdate in &record.exdates {
        set = set.exdate(to_rule_zone(exdate, &zone));
    }

    Ok(set)
}

/// The zone a record's recurrence is computed in.
///
/// Zoned values keep their zone; dates, UTC and floating values are
/// expanded on a UTC wall clock and mapped back afterwards.
fn rule_zone(start: &SourceTime) -> Tz {
    match start {
        SourceTime::Zoned(dt) => Tz::Tz(dt.timezone()),
        SourceTime::Date(_) | SourceTime::Utc(_) | SourceTime::Floating(_) => Tz::UTC,
    }
}

/// Expresses a source value in the rule zone.
fn to_rule_zone(value: &SourceTime, zone: &Tz) -> DateTime<Tz> {
    match value {
        SourceTime::Date(date) => localize(zone, &midnight(*date)),
        SourceTime::Utc(dt) => dt.with_timezone(zone),
        SourceTime::Zoned(dt) => dt.with_timezone(zone),
        SourceTime::Floating(naive) => localize(zone, naive),
    }
}

/// Maps a generated instance back to an [`EventTime`] of the same kind as DTSTART.
fn from_rule_zone(start: &SourceTime, instance: &DateTime<Tz>, floating: &TargetZone) -> EventTime {
    match start {
        SourceTime::Date(_) => EventTime::from_date(instance.date_naive()),
        SourceTime::Utc(_) | SourceTime::Zoned(_) => {
            EventTime::from_utc(instance.with_timezone(&Utc))
        }
        SourceTime::Floating(_) => EventTime::from_utc(localize_in(floating, &instance.naive_utc())),
    }
}

/// Gives an occurrence the same length as the first instance.
///
/// An end past the representable range collapses to the start.
fn shift_end(first_start: &EventTime, first_end: &EventTime, start: &EventTime) -> EventTime {
    let end = match (first_start, start) {
        (EventTime::AllDay(first), EventTime::AllDay(date)) => {
            let days = (first_end.date() - *first).num_days();
            Duration::try_days(days)
                .and_then(|days| date.checked_add_signed(days))
                .map(EventTime::from_date)
        }
        _ => {
            let length = first_end.to_utc_datetime() - first_start.to_utc_datetime();
            start
                .to_utc_datetime()
                .checked_add_signed(length)
                .map(EventTime::from_utc)
        }
    };
    end.unwrap_or(*start)
}

/// Rewrites a non-UTC `UNTIL` as a UTC instant.
///
/// Date values cover their whole day; local values are read in the rule
/// zone. The rrule crate requires UTC limits on zoned rules.
fn normalize_until(rule: &str, zone: &Tz) -> String {
    UNTIL_REGEX
        .replace(rule, |caps: &regex::Captures<'_>| {
            let value = &caps[1];
            if value.ends_with('Z') {
                return format!("UNTIL={value}");
            }
            let naive = if value.len() == 8 {
                NaiveDateTime::parse_from_str(&format!("{value}T235959"), "%Y%m%dT%H%M%S")
            } else {
                NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            };
            match naive {
                Ok(naive) => {
                    let utc = localize(zone, &naive).with_timezone(&Utc);
                    format!("UNTIL={}", utc.format("%Y%m%dT%H%M%SZ"))
                }
                Err(_) => format!("UNTIL={value}"),
            }
        })
        .into_owned()
}
