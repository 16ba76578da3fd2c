use chrono::{Datelike, NaiveDateTime, Timelike};

pub use crate::constants::timestamps::{ACCEPTED_FORMATS, CANONICAL_FORMAT, RENDER_FORMAT};
use crate::data::Season;

/// Parse an observation timestamp in any format the generator can emit.
///
/// Surrounding whitespace is ignored. Returns `None` for sentinels such as
/// `Unknown` or out-of-range dates like `2099-13-40 25:61`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Render a timestamp with `format`.
pub fn format_timestamp(ts: &NaiveDateTime, format: &str) -> String {
    ts.format(format).to_string()
}

/// Floor a timestamp to the start of its hour (the join bucket).
pub fn hour_floor(ts: &NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|value| value.with_second(0))
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(*ts)
}

/// Season of the timestamp's month.
pub fn season_of(ts: &NaiveDateTime) -> Season {
    Season::from_month(ts.month())
}

/// True when the hour falls in a morning or evening rush window.
pub fn is_rush_hour(ts: &NaiveDateTime) -> bool {
    let hour = ts.hour();
    crate::constants::generator::RUSH_HOURS
        .iter()
        .any(|(start, end)| (*start..=*end).contains(&hour))
}
