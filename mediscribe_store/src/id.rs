//! Record identifiers: `REC-` followed by the local time to the second.
//!
//! A second record in the same second gets `-1`, the next `-2`, and so on.

use chrono::{DateTime, TimeZone};

pub const ID_PREFIX: &str = "REC-";

/// Identifier for `now` without a collision suffix.
#[must_use]
pub fn base_id<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{ID_PREFIX}{}", now.format("%Y%m%d%H%M%S"))
}

/// First identifier for `now` for which `is_taken` is false.
#[must_use]
pub fn next_id<Tz: TimeZone>(now: &DateTime<Tz>, is_taken: impl Fn(&str) -> bool) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let base = base_id(now);
    if !is_taken(&base) {
        return base;
    }

    let mut n: u64 = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
