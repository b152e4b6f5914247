//! Date parsing and tolerance comparison across the two sources.
//!
//! LDs and the management ledger write dates however their authors felt like
//! it. Each side is parsed independently; a side that does not parse is
//! treated as absent.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use ldr_schemas::DateComparison;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// Two-digit years below this land in the 2000s, the rest in the 1900s.
const TWO_DIGIT_PIVOT: i32 = 50;

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y%m%d",
];

const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse one side's raw date. `None` for empty or unrecognised input and for
/// years outside `[1900, 2100]`.
///
/// Tried in order: ISO `yyyy-mm-dd` prefix, day-first `dd/mm/yyyy` or
/// `dd/mm/yy`, then a list of other common layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_iso_prefix(s)
        .or_else(|| parse_day_first(s))
        .or_else(|| parse_generic(s))
}

fn in_range(d: NaiveDate) -> Option<NaiveDate> {
    (MIN_YEAR..=MAX_YEAR).contains(&d.year()).then_some(d)
}

fn parse_iso_prefix(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?.as_bytes();
    let digits = |r: std::ops::Range<usize>| head[r].iter().all(u8::is_ascii_digit);
    if !(digits(0..4) && head[4] == b'-' && digits(5..7) && head[7] == b'-' && digits(8..10)) {
        return None;
    }
    let num = |r: std::ops::Range<usize>| {
        std::str::from_utf8(&head[r])
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
    };
    let year = i32::try_from(num(0..4)?).ok()?;
    NaiveDate::from_ymd_opt(year, num(5..7)?, num(8..10)?).and_then(in_range)
}

fn parse_day_first(s: &str) -> Option<NaiveDate> {
    // Anything after the date (a time of day) is ignored.
    let date_part = s.split_whitespace().next()?;
    let mut parts = date_part.split('/');
    let (d, m, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let field = |v: &str, widths: &[usize]| -> Option<u32> {
        if !widths.contains(&v.len()) || !v.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        v.parse().ok()
    };
    let day = field(d, &[1, 2])?;
    let month = field(m, &[1, 2])?;
    let year = match y.len() {
        2 => {
            let yy = field(y, &[2])? as i32;
            if yy < TWO_DIGIT_PIVOT {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        _ => field(y, &[4])? as i32,
    };

    // from_ymd_opt rejects dates that would roll over (31/04, 29/02 off-leap).
    NaiveDate::from_ymd_opt(year, month, day).and_then(in_range)
}

fn parse_generic(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return in_range(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return in_range(dt.date_naive());
    }
    GENERIC_DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            GENERIC_DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .and_then(in_range)
}

/// Compare the LD date against the ledger date.
///
/// `difference_days` is `secondary - primary`. Equal when both parsed and
/// the absolute difference is at most `tolerance_days`; unknown when neither
/// parsed; unequal otherwise.
pub fn compare_dates(primary_raw: &str, secondary_raw: &str, tolerance_days: i64) -> DateComparison {
    let primary_date = parse_date(primary_raw);
    let secondary_date = parse_date(secondary_raw);

    let (equal, difference_days) = match (primary_date, secondary_date) {
        (Some(p), Some(s)) => {
            let diff = (s - p).num_days();
            (Some(diff.abs() <= tolerance_days), Some(diff))
        }
        (None, None) => (None, None),
        _ => (Some(false), None),
    };

    DateComparison {
        equal,
        primary_date,
        secondary_date,
        difference_days,
    }
}
