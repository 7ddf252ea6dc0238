//! Account expiration arithmetic.

use chrono::{NaiveDate, NaiveDateTime};

use checkuser_core::types::UNKNOWN;

/// Date format printed by `chage -l` (`Dec 31, 2030`).
pub const EXPIRATION_FORMAT: &str = "%b %d, %Y";

/// Value printed for accounts that never expire.
pub const NEVER: &str = "never";

/// Whole days from `now` until the expiration date, rounded down.
///
/// `None`, `"never"`, and unparseable dates all yield `-1`. An account
/// expiring later today therefore also reads as `-1`.
pub fn expiration_days(date: Option<&str>, now: NaiveDateTime) -> i64 {
    let Some(date) = date else {
        return UNKNOWN;
    };

    if date.trim().eq_ignore_ascii_case(NEVER) {
        return UNKNOWN;
    }

    let Ok(day) = NaiveDate::parse_from_str(date.trim(), EXPIRATION_FORMAT) else {
        tracing::debug!("Unparseable expiration date '{}'", date);
        return UNKNOWN;
    };

    let Some(midnight) = day.and_hms_opt(0, 0, 0) else {
        return UNKNOWN;
    };

    (midnight - now).num_seconds().div_euclid(86_400)
}
