//! Calendar resolution: civil-date arithmetic in the caller's local timezone.
//!
//! Every function takes the reference instant explicitly — there is no ambient
//! clock. Arithmetic is performed on `NaiveDate` components (year, month, day),
//! never by offsetting raw epoch values, so weekday resolution rolls correctly
//! over month boundaries, year boundaries, and leap-day insertion.
//!
//! The "next occurrence" policy is deliberate: if the reference date already
//! falls on the requested weekday, the result is seven days later. "Next
//! Tuesday" said on a Tuesday always means the following week.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Weekday};
use miette::Diagnostic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors specific to calendar resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum CalendarError {
    #[error("invalid local date: {input:?}")]
    #[diagnostic(
        code(pensum::calendar::invalid_date),
        help("Dates must be zero-padded YYYY-MM-DD, e.g. 2026-08-06.")
    )]
    InvalidDate { input: String },
}

/// Result type for calendar operations.
pub type CalendarResult<T> = std::result::Result<T, CalendarError>;

// ---------------------------------------------------------------------------
// Weekday resolution
// ---------------------------------------------------------------------------

/// All weekdays in Monday-first order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English name for a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a weekday from a name or three-letter abbreviation (case-insensitive).
pub fn weekday_from_name(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Next occurrence of `target` strictly after the reference's local date.
///
/// The gap is always 1..=7 days: a reference already on `target` resolves to
/// seven days out, never the same day.
pub fn next_occurrence_of(reference: DateTime<FixedOffset>, target: Weekday) -> NaiveDate {
    let today = reference.naive_local().date();
    let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { u64::from(ahead) };
    today + Days::new(ahead)
}

/// The next occurrence of each of the seven weekdays, Monday-first.
pub fn next_weekday_occurrences(reference: DateTime<FixedOffset>) -> [(Weekday, NaiveDate); 7] {
    WEEKDAYS.map(|day| (day, next_occurrence_of(reference, day)))
}

// ---------------------------------------------------------------------------
// Local date formatting / parsing
// ---------------------------------------------------------------------------

/// Format the instant's local civil date as zero-padded `YYYY-MM-DD`.
pub fn format_local_date(instant: DateTime<FixedOffset>) -> String {
    instant.naive_local().date().format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` string as a civil date.
///
/// The string is interpreted as a plain calendar date, not a UTC instant, so
/// the result is identical regardless of the host's offset sign.
pub fn parse_local_date(input: &str) -> CalendarResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| CalendarError::InvalidDate {
        input: input.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Timezone snapshot
// ---------------------------------------------------------------------------

/// Local calendar facts derived from one reference instant. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneSnapshot {
    /// IANA timezone name of the host (e.g. `Europe/Berlin`), or the formatted
    /// offset when the host zone cannot be determined.
    pub timezone: String,
    /// UTC offset in hours (fractional for half-hour zones).
    pub offset_hours: f32,
    /// Local civil date.
    pub local_date: NaiveDate,
    /// Local time of day.
    pub local_time: NaiveTime,
    /// Full weekday name.
    pub weekday: String,
}

impl TimezoneSnapshot {
    /// Capture the calendar facts for a reference instant.
    pub fn capture(reference: DateTime<FixedOffset>) -> Self {
        let offset_secs = reference.offset().local_minus_utc();
        let local = reference.naive_local();
        let timezone = iana_time_zone::get_timezone()
            .unwrap_or_else(|_| reference.offset().to_string());
        Self {
            timezone,
            offset_hours: offset_secs as f32 / 3600.0,
            local_date: local.date(),
            local_time: local.time(),
            weekday: weekday_name(local.date().weekday()).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Relative phrase grounding
// ---------------------------------------------------------------------------

fn in_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^in\s+(\d{1,3})\s+(day|days|week|weeks)$").expect("static regex is valid")
    })
}

/// Ground a relative calendar phrase to a concrete local date.
///
/// Recognized: `today`, `tonight`, `tomorrow`, bare or `next`-prefixed weekday
/// names, `next week`, `mid month`, `end of month`, `in N days`, `in N weeks`.
/// Weekday phrases follow the same-day-excluded policy of
/// [`next_occurrence_of`]. Returns `None` for anything else — the caller
/// decides whether that means "undated" or "ask again".
pub fn ground_phrase(reference: DateTime<FixedOffset>, phrase: &str) -> Option<NaiveDate> {
    let today = reference.naive_local().date();
    let p = phrase.trim().to_lowercase();

    match p.as_str() {
        "today" | "tonight" => return Some(today),
        "tomorrow" => return Some(today + Days::new(1)),
        // Monday-anchored: the next ISO week begins at the next Monday.
        "next week" => return Some(next_occurrence_of(reference, Weekday::Mon)),
        "mid month" | "mid-month" | "middle of the month" => {
            let fifteenth = NaiveDate::from_ymd_opt(today.year(), today.month(), 15)?;
            return if fifteenth > today {
                Some(fifteenth)
            } else {
                next_month_start(today).and_then(|d| {
                    NaiveDate::from_ymd_opt(d.year(), d.month(), 15)
                })
            };
        }
        "end of month" | "end of the month" => {
            return next_month_start(today).map(|d| d - Days::new(1));
        }
        _ => {}
    }

    // "next tuesday" / "this friday" / bare "friday" all resolve to the next
    // occurrence; the same-day-excluded policy already encodes "next".
    let day_token = p
        .strip_prefix("next ")
        .or_else(|| p.strip_prefix("this "))
        .or_else(|| p.strip_prefix("on "))
        .unwrap_or(&p);
    if let Some(day) = weekday_from_name(day_token) {
        return Some(next_occurrence_of(reference, day));
    }

    if let Some(caps) = in_amount_re().captures(&p) {
        let n: u64 = caps[1].parse().ok()?;
        let days = match &caps[2] {
            "week" | "weeks" => n.checked_mul(7)?,
            _ => n,
        };
        return today.checked_add_days(Days::new(days));
    }

    None
}

/// First day of the month after the given date.
fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn at(offset_hours: i32, date: &str, time: &str) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let naive: NaiveDateTime = format!("{date}T{time}").parse().unwrap();
        offset.from_local_datetime(&naive).unwrap()
    }

    #[test]
    fn gap_is_one_to_seven_days_and_strictly_future() {
        // A Tuesday.
        let reference = at(2, "2025-12-30", "10:00:00");
        let today = reference.naive_local().date();
        for (day, date) in next_weekday_occurrences(reference) {
            let gap = (date - today).num_days();
            assert!((1..=7).contains(&gap), "{day}: gap {gap}");
            assert_eq!(date.weekday(), day);
            assert!(date > today);
        }
    }

    #[test]
    fn year_boundary_dec_30_thursday_is_jan_1() {
        // Dec 30 2025 is a Tuesday; the next Thursday is Jan 1 2026.
        let reference = at(1, "2025-12-30", "09:00:00");
        let date = next_occurrence_of(reference, Weekday::Thu);
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn year_boundary_same_weekday_rolls_a_full_week() {
        // Dec 31 2025 is a Wednesday; its own next occurrence is Jan 7 2026.
        let reference = at(-5, "2025-12-31", "23:00:00");
        let date = next_occurrence_of(reference, Weekday::Wed);
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
    }

    #[test]
    fn leap_day_resolves() {
        // Feb 28 2024 is a Wednesday in a leap year; Thursday is Feb 29.
        let reference = at(0, "2024-02-28", "12:00:00");
        let date = next_occurrence_of(reference, Weekday::Thu);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn format_parse_round_trip() {
        for s in ["2026-08-06", "2024-02-29", "1999-12-31", "2026-01-01"] {
            let parsed = parse_local_date(s).unwrap();
            assert_eq!(parsed.format("%Y-%m-%d").to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        for s in ["not-a-date", "2026-13-01", "2025-02-29", ""] {
            assert!(parse_local_date(s).is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn format_is_offset_independent() {
        // The same civil moment expressed in two offsets formats to each
        // offset's own local date; parsing is unaffected by either.
        let east = at(12, "2026-08-06", "00:30:00");
        let west = at(-11, "2026-08-05", "01:30:00"); // same UTC instant
        assert_eq!(east, west);
        assert_eq!(format_local_date(east), "2026-08-06");
        assert_eq!(format_local_date(west), "2026-08-05");
        assert_eq!(
            parse_local_date("2026-08-06").unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
        );
    }

    #[test]
    fn snapshot_reports_offset_and_weekday() {
        let reference = at(5, "2026-08-06", "15:04:05");
        let snap = TimezoneSnapshot::capture(reference);
        assert_eq!(snap.offset_hours, 5.0);
        assert_eq!(snap.local_date, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap());
        assert_eq!(snap.weekday, "Thursday");
        assert!(!snap.timezone.is_empty());
    }

    #[test]
    fn ground_simple_phrases() {
        // A Thursday.
        let reference = at(2, "2026-08-06", "10:00:00");
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        assert_eq!(ground_phrase(reference, "today"), Some(today));
        assert_eq!(ground_phrase(reference, "Tomorrow"), Some(today + Days::new(1)));
        assert_eq!(
            ground_phrase(reference, "tuesday"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 11).unwrap())
        );
        // Same weekday as the reference: a full week out.
        assert_eq!(
            ground_phrase(reference, "next thursday"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 13).unwrap())
        );
        assert_eq!(ground_phrase(reference, "someday"), None);
    }

    #[test]
    fn ground_week_and_month_phrases() {
        // Thursday Aug 6 2026; next Monday is Aug 10.
        let reference = at(0, "2026-08-06", "10:00:00");
        assert_eq!(
            ground_phrase(reference, "next week"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap())
        );
        assert_eq!(
            ground_phrase(reference, "mid month"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 15).unwrap())
        );
        assert_eq!(
            ground_phrase(reference, "end of month"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 31).unwrap())
        );

        // Past the 15th, "mid month" rolls into September.
        let late = at(0, "2026-08-20", "10:00:00");
        assert_eq!(
            ground_phrase(late, "mid month"),
            Some(NaiveDate::from_ymd_opt(2026, 9, 15).unwrap())
        );

        // December's end-of-month crosses the year boundary computation.
        let december = at(0, "2026-12-10", "10:00:00");
        assert_eq!(
            ground_phrase(december, "end of month"),
            Some(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap())
        );
    }

    #[test]
    fn ground_in_n_days() {
        let reference = at(0, "2026-08-06", "10:00:00");
        assert_eq!(
            ground_phrase(reference, "in 3 days"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 9).unwrap())
        );
        assert_eq!(
            ground_phrase(reference, "in 2 weeks"),
            Some(NaiveDate::from_ymd_opt(2026, 8, 20).unwrap())
        );
        assert_eq!(ground_phrase(reference, "in a while"), None);
    }
}
