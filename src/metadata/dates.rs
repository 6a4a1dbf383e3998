//! Legacy date parsing
//!
//! The source records dates in four shapes: `YYYY`, `YYYY-MM`, `YYYYMMDD`
//! and `YYYY-MM-DD`. Out-of-range days (Feb 30/31 and friends) are repaired
//! by clamping to a fixed per-month ceiling, Feb 28 regardless of leap year.
//! Anything unparsable or outside the years 1000..=4000 is rejected with a
//! warning, never fatally.

use chrono::NaiveDate;
use tracing::warn;

const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 4000;

/// Repair ceiling per month; Feb clamps to 28 even in leap years, though a
/// genuine Feb 29 passes through untouched
const CLAMP_DAY: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Parse a legacy date string, or None with a warning.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match try_parse(raw) {
        Some(date) => Some(date),
        None => {
            warn!(raw, "Unparsable or out-of-range date, dropping");
            None
        }
    }
}

fn try_parse(raw: &str) -> Option<NaiveDate> {
    let digits: Vec<&str> = raw.split('-').collect();
    let (y, m, d) = match digits.as_slice() {
        [y] if y.len() == 4 => (y.parse().ok()?, 1, 1),
        [y] if y.len() == 8 => {
            let year: i32 = y[..4].parse().ok()?;
            let month: u32 = y[4..6].parse().ok()?;
            let day: u32 = y[6..8].parse().ok()?;
            (year, month, day)
        }
        [y, m] => (y.parse().ok()?, m.parse().ok()?, 1),
        [y, m, d] => (y.parse().ok()?, m.parse().ok()?, d.parse().ok()?),
        _ => return None,
    };

    if !(MIN_YEAR..=MAX_YEAR).contains(&y) || !(1..=12).contains(&m) || d == 0 {
        return None;
    }

    if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
        return Some(date);
    }
    let clamped = CLAMP_DAY[(m - 1) as usize];
    warn!(raw, clamped, "Out-of-range day, clamping");
    NaiveDate::from_ymd_opt(y, m, clamped)
}
