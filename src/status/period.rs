use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::StatusError;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// How often a donor (or a box holder) is expected to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Length of one period in days. Months and years use a fixed-day
    /// approximation (30 and 360) instead of calendar arithmetic, so a
    /// "monthly" window is always exactly 30 days long.
    pub fn length_days(&self) -> i64 {
        match self {
            Period::Daily => 1,
            Period::Weekly => 7,
            Period::Monthly => 30,
            Period::Yearly => 360,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            _ => Err(StatusError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Validity interval opened by the most recent payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub length_days: i64,
    pub days_elapsed: i64,
}

impl PeriodWindow {
    /// Signed days left in the window, negative once the window has lapsed.
    pub fn days_remaining(&self) -> i64 {
        self.length_days - self.days_elapsed
    }

    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%d %b %Y"),
            self.end.format("%d %b %Y")
        )
    }
}

/// Whole days between `from` and `to`, floored. Plain millisecond
/// subtraction, so timezone boundaries never shift the count.
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Window anchored at `last_payment_at`, or `None` when nothing was ever paid.
pub fn window_for(
    period: Period,
    last_payment_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<PeriodWindow> {
    let start = last_payment_at?;
    let length_days = period.length_days();

    Some(PeriodWindow {
        start,
        end: start + Duration::days(length_days),
        length_days,
        days_elapsed: elapsed_days(start, now),
    })
}

/// Accepts RFC 3339 strings and epoch-millisecond integers. Anything else is
/// treated as "never paid".
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Serde hook for persisted `last_payment_at` fields: malformed values
/// deserialize to `None` instead of rejecting the whole record.
pub fn deserialize_lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("monthly".parse::<Period>().unwrap(), Period::Monthly);
        assert_eq!(" Weekly ".parse::<Period>().unwrap(), Period::Weekly);
        assert_eq!("YEARLY".parse::<Period>().unwrap(), Period::Yearly);

        let err = "fortnightly".parse::<Period>().unwrap_err();
        assert!(matches!(err, StatusError::InvalidPeriod(ref p) if p == "fortnightly"));
    }

    #[test]
    fn test_window_uses_fixed_day_lengths() {
        let last = at("2026-01-31T10:00:00Z");
        let now = at("2026-02-10T10:00:00Z");

        let monthly = window_for(Period::Monthly, Some(last), now).unwrap();
        assert_eq!(monthly.start, last);
        assert_eq!(monthly.end, at("2026-03-02T10:00:00Z"));
        assert_eq!(monthly.days_elapsed, 10);
        assert_eq!(monthly.days_remaining(), 20);

        let yearly = window_for(Period::Yearly, Some(last), now).unwrap();
        assert_eq!(yearly.end, last + Duration::days(360));

        let daily = window_for(Period::Daily, Some(last), now).unwrap();
        assert_eq!(daily.end, at("2026-02-01T10:00:00Z"));
    }

    #[test]
    fn test_no_window_without_payment() {
        let now = Utc::now();
        for period in [Period::Daily, Period::Weekly, Period::Monthly, Period::Yearly] {
            assert!(window_for(period, None, now).is_none());
        }
    }

    #[test]
    fn test_elapsed_days_floors_partial_days() {
        let last = at("2026-03-01T12:00:00Z");
        assert_eq!(elapsed_days(last, at("2026-03-02T11:59:59Z")), 0);
        assert_eq!(elapsed_days(last, at("2026-03-02T12:00:00Z")), 1);
        // a payment stamped in the future counts as a negative elapsed day
        assert_eq!(elapsed_days(last, at("2026-03-01T11:00:00Z")), -1);
    }

    #[test]
    fn test_label_format() {
        let window = window_for(Period::Weekly, Some(at("2026-05-04T08:00:00Z")), Utc::now()).unwrap();
        assert_eq!(window.label(), "04 May 2026 - 11 May 2026");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert_eq!(
            parse_timestamp(&json!("2026-04-01T00:00:00+05:30")),
            Some(at("2026-03-31T18:30:00Z"))
        );
        assert_eq!(
            parse_timestamp(&json!(1_767_225_600_000_i64)),
            Some(at("2026-01-01T00:00:00Z"))
        );
        assert_eq!(parse_timestamp(&json!("last tuesday")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
        assert_eq!(parse_timestamp(&Value::Null), None);
    }
}
