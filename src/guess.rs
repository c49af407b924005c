//! Per-value heuristics: logical type, epoch-timestamp guessing, and time
//! granularity hints taken from column names.

use chrono::{DateTime, Months, Utc};

use crate::{
    column::{DataType, TimeUnit},
    locale::Locale,
    value::RawValue,
};

const TIME_WINDOW: Months = Months::new(10 * 12);

/// Classifies a single raw value. `None` means the value carries no evidence.
pub fn type_of(value: &RawValue, locale: &Locale) -> Option<DataType> {
    match value {
        RawValue::Null => None,
        RawValue::Boolean(_) => Some(DataType::Boolean),
        RawValue::Timestamp(_) => Some(DataType::Time),
        RawValue::Integer(_) | RawValue::Float(_) => Some(DataType::Number),
        RawValue::Object(_) => Some(DataType::Object),
        RawValue::Array(_) => Some(DataType::Text),
        RawValue::Text(text) => {
            if text.trim().is_empty() {
                None
            } else if is_boolean_literal(text) {
                Some(DataType::Boolean)
            } else if locale.parse_number(text).is_some() {
                Some(DataType::Number)
            } else {
                Some(DataType::Text)
            }
        }
    }
}

pub fn is_boolean_literal(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false")
}

pub fn digit_count(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

/// Guesses whether an integral value is a millisecond epoch timestamp.
pub fn is_assumedly_time(column_name: &str, value: &RawValue) -> bool {
    is_assumedly_time_at(column_name, value, Utc::now())
}

/// Same as [`is_assumedly_time`] with an explicit evaluation instant.
///
/// The plausible window is `now` ± 10 calendar years, so leap days shift its
/// bounds.
pub fn is_assumedly_time_at(column_name: &str, value: &RawValue, now: DateTime<Utc>) -> bool {
    let Some(millis) = value.as_integer() else {
        return false;
    };
    let lowered = column_name.to_lowercase();
    if lowered.ends_with("time")
        || lowered.ends_with("timestamp")
        || lowered == "updated"
        || lowered == "created"
    {
        return true;
    }
    let (Some(lower), Some(upper)) = (
        now.checked_sub_months(TIME_WINDOW),
        now.checked_add_months(TIME_WINDOW),
    ) else {
        return false;
    };
    (lower.timestamp_millis()..=upper.timestamp_millis()).contains(&millis)
}

/// Granularity named by a column, e.g. `ShippingDate` → day.
///
/// Non-integral values return `default` without looking at the name.
pub fn time_unit_from_column_name(
    column_name: &str,
    value: &RawValue,
    default: TimeUnit,
) -> TimeUnit {
    if value.as_integer().is_none() {
        return default;
    }
    time_unit_hint(column_name).unwrap_or(default)
}

/// First matching name rule; "time" wins over every other substring.
pub fn time_unit_hint(column_name: &str) -> Option<TimeUnit> {
    let lowered = column_name.to_lowercase();
    if lowered.contains("millisecond") || lowered.contains("time") {
        Some(TimeUnit::Millisecond)
    } else if lowered.contains("second") {
        Some(TimeUnit::Second)
    } else if lowered.contains("minute") {
        Some(TimeUnit::Minute)
    } else if lowered.contains("hour") {
        Some(TimeUnit::Hour)
    } else if lowered.contains("day") || lowered.ends_with("date") {
        Some(TimeUnit::Day)
    } else if lowered.contains("month") {
        Some(TimeUnit::Month)
    } else if lowered.contains("year") {
        Some(TimeUnit::Year)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn en() -> Locale {
        Locale::parse("en-US")
    }

    #[test]
    fn type_of_treats_empty_values_as_no_evidence() {
        assert_eq!(type_of(&RawValue::Null, &en()), None);
        assert_eq!(type_of(&RawValue::from(""), &en()), None);
        assert_eq!(type_of(&RawValue::from("   "), &en()), None);
    }

    #[test]
    fn type_of_classifies_each_raw_shape() {
        let now = Utc::now();
        assert_eq!(type_of(&RawValue::Boolean(true), &en()), Some(DataType::Boolean));
        assert_eq!(type_of(&RawValue::from("FALSE"), &en()), Some(DataType::Boolean));
        assert_eq!(type_of(&RawValue::Timestamp(now), &en()), Some(DataType::Time));
        assert_eq!(type_of(&RawValue::Integer(3), &en()), Some(DataType::Number));
        assert_eq!(type_of(&RawValue::from("1,234.5"), &en()), Some(DataType::Number));
        assert_eq!(type_of(&RawValue::from(json!({"a": 1})), &en()), Some(DataType::Object));
        assert_eq!(type_of(&RawValue::from(json!([1])), &en()), Some(DataType::Text));
        assert_eq!(type_of(&RawValue::from("abc"), &en()), Some(DataType::Text));
        assert_eq!(type_of(&RawValue::from("2019-01-30"), &en()), Some(DataType::Text));
    }

    #[test]
    fn type_of_is_locale_aware() {
        let de = Locale::parse("de-DE");
        assert_eq!(type_of(&RawValue::from("1.234,5"), &de), Some(DataType::Number));
        assert_eq!(type_of(&RawValue::from("1.234,5"), &en()), Some(DataType::Text));
    }

    #[test]
    fn digit_count_counts_ascii_digits() {
        assert_eq!(digit_count("a1b2"), 2);
        assert_eq!(digit_count("abc"), 0);
    }

    #[test]
    fn is_assumedly_time_uses_window_around_now() {
        let now = Utc.with_ymd_and_hms(2020, 6, 15, 12, 0, 0).unwrap();
        let inside = RawValue::Integer(now.timestamp_millis());
        assert!(is_assumedly_time_at("value", &inside, now));

        let lower = Utc.with_ymd_and_hms(2010, 6, 15, 12, 0, 0).unwrap();
        assert!(is_assumedly_time_at("value", &RawValue::Integer(lower.timestamp_millis()), now));
        assert!(!is_assumedly_time_at(
            "value",
            &RawValue::Integer(lower.timestamp_millis() - 1),
            now
        ));

        assert!(!is_assumedly_time_at("value", &RawValue::Integer(42), now));
    }

    #[test]
    fn is_assumedly_time_window_clamps_leap_day() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let millis = |y, mo, d, h| {
            Utc.with_ymd_and_hms(y, mo, d, h, 0, 0)
                .unwrap()
                .timestamp_millis()
        };

        let lower = millis(2014, 2, 28, 12);
        assert!(is_assumedly_time_at("value", &RawValue::Integer(lower), now));
        assert!(!is_assumedly_time_at("value", &RawValue::Integer(lower - 1), now));

        let upper = millis(2034, 2, 28, 12);
        assert!(is_assumedly_time_at("value", &RawValue::Integer(upper), now));
        assert!(!is_assumedly_time_at("value", &RawValue::Integer(upper + 1), now));
    }

    #[test]
    fn is_assumedly_time_trusts_column_names() {
        let now = Utc::now();
        let small = RawValue::Integer(42);
        assert!(is_assumedly_time_at("EventTime", &small, now));
        assert!(is_assumedly_time_at("timestamp", &small, now));
        assert!(is_assumedly_time_at("Created", &small, now));
        assert!(is_assumedly_time_at("updated", &small, now));
        assert!(!is_assumedly_time_at("updated_by", &small, now));
    }

    #[test]
    fn is_assumedly_time_rejects_non_integers() {
        let now = Utc::now();
        assert!(!is_assumedly_time_at("time", &RawValue::Float(1.5), now));
        assert!(!is_assumedly_time_at("time", &RawValue::Null, now));
        assert!(!is_assumedly_time_at("time", &RawValue::from("1571234567890"), now));
    }

    #[test]
    fn time_unit_from_column_name_follows_priority_order() {
        let int = RawValue::Integer(1);
        let unit = |name: &str| time_unit_from_column_name(name, &int, TimeUnit::Millisecond);
        assert_eq!(unit("Timestamp"), TimeUnit::Millisecond);
        assert_eq!(unit("DayTime"), TimeUnit::Millisecond);
        assert_eq!(unit("Seconds"), TimeUnit::Second);
        assert_eq!(unit("minutes_elapsed"), TimeUnit::Minute);
        assert_eq!(unit("Hour"), TimeUnit::Hour);
        assert_eq!(unit("ShippingDate"), TimeUnit::Day);
        assert_eq!(unit("weekday"), TimeUnit::Day);
        assert_eq!(unit("Month"), TimeUnit::Month);
        assert_eq!(unit("FiscalYear"), TimeUnit::Year);
        assert_eq!(unit("Amount"), TimeUnit::Millisecond);
    }

    #[test]
    fn time_unit_from_column_name_returns_default_for_non_integers() {
        assert_eq!(
            time_unit_from_column_name("ShippingDate", &RawValue::Float(1.5), TimeUnit::Hour),
            TimeUnit::Hour
        );
        assert_eq!(
            time_unit_from_column_name("ShippingDate", &RawValue::from("1"), TimeUnit::Hour),
            TimeUnit::Hour
        );
    }
}
