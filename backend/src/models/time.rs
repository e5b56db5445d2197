use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Half-open time window `[start, end)`.
///
/// Reservations, staff shifts and availability queries are all expressed as
/// windows. Two windows that only touch at a boundary do not overlap, so a
/// check-out at 11:00 and the next check-in at 11:00 can share a kennel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, returning `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// The calendar day `date` in UTC, midnight to midnight.
    pub fn for_day(date: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Start inclusive, end exclusive.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// `self.start < other.end && self.end > other.start`
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Number of nights spanned, rounded up, never less than one.
    pub fn nights(&self) -> i64 {
        let minutes = self.duration().num_minutes();
        let nights = (minutes + 24 * 60 - 1) / (24 * 60);
        nights.max(1)
    }
}

/// Parse a timestamp given either as RFC 3339 or as a bare `YYYY-MM-DD` date
/// (interpreted as midnight UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_date(trimmed).map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Parse a `YYYY-MM-DD` date, also accepting an RFC 3339 timestamp whose date part is used.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", value))
}

/// Serde adapter for request fields that accept either timestamp form.
pub fn flexible_timestamp<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Optional variant of [`flexible_timestamp`].
pub fn flexible_timestamp_opt<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de)?
        .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::new(at(start), at(end)).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_and_empty_windows() {
        assert!(TimeWindow::new(at("2024-05-02"), at("2024-05-01")).is_none());
        assert!(TimeWindow::new(at("2024-05-01"), at("2024-05-01")).is_none());
    }

    #[test]
    fn test_touching_windows_do_not_overlap() {
        let a = window("2024-05-01T10:00:00Z", "2024-05-03T11:00:00Z");
        let b = window("2024-05-03T11:00:00Z", "2024-05-05T11:00:00Z");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_partial_and_contained_overlap() {
        let a = window("2024-05-01", "2024-05-05");
        let b = window("2024-05-04", "2024-05-08");
        let inner = window("2024-05-02", "2024-05-03");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.overlaps(&inner));
        assert!(inner.overlaps(&a));
    }

    #[test]
    fn test_contains_is_half_open() {
        let w = window("2024-05-01", "2024-05-02");
        assert!(w.contains(at("2024-05-01")));
        assert!(!w.contains(at("2024-05-02")));
    }

    #[test]
    fn test_for_day_spans_24_hours() {
        let day = TimeWindow::for_day(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(day.start, at("2024-02-29T00:00:00Z"));
        assert_eq!(day.end, at("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_nights_round_up_with_minimum_one() {
        assert_eq!(window("2024-05-01T08:00:00Z", "2024-05-01T17:00:00Z").nights(), 1);
        assert_eq!(window("2024-05-01T15:00:00Z", "2024-05-03T11:00:00Z").nights(), 2);
        assert_eq!(window("2024-05-01", "2024-05-04").nights(), 3);
    }

    #[test]
    fn test_parse_accepts_dates_and_offsets() {
        assert_eq!(at("2024-05-01T02:00:00+02:00"), at("2024-05-01T00:00:00Z"));
        assert!(parse_timestamp("05/01/2024").is_err());
        assert_eq!(
            parse_date("2024-05-01T23:00:00Z").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }
}
