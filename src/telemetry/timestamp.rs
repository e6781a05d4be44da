//! Timestamp parsing for run records.
//!
//! The job writes `%Y-%m-%dT%H:%M:%S%z` (compact `+HHMM` offset); other
//! producers send RFC 3339. Naive date-times are read as UTC.

use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

const COMPACT_OFFSET: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);
const COMPACT_OFFSET_FRACTION: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
);
const NAIVE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
];
const SHORT_DISPLAY: &[BorrowedFormatItem<'static>] =
    format_description!("[month]/[day]/[year repr:last_two]-[hour]/[minute]");

/// Parse a run timestamp, returning `None` for anything unrecognized.
pub fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(parsed);
    }
    for format in [COMPACT_OFFSET, COMPACT_OFFSET_FRACTION] {
        if let Ok(parsed) = OffsetDateTime::parse(text, format) {
            return Some(parsed);
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(text, *format).ok())
        .map(PrimitiveDateTime::assume_utc)
}

/// Render `MM/DD/YY-HH/MM` in the local offset, or the raw text when unparseable.
pub fn format_short_timestamp(text: &str) -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    format_short_timestamp_in(text, offset)
}

/// Render `MM/DD/YY-HH/MM` in `offset`, or the raw text when unparseable.
pub fn format_short_timestamp_in(text: &str, offset: UtcOffset) -> String {
    parse_timestamp(text)
        .and_then(|parsed| parsed.to_offset(offset).format(SHORT_DISPLAY).ok())
        .unwrap_or_else(|| text.to_string())
}
