use chrono::Utc;
use import_mapper::{
    column::{ColumnMapping, DataType, TimeUnit},
    generator::{generate_from_objects, generate_from_rows},
    locale::Locale,
    value::{RawValue, Record},
};

fn en() -> Locale {
    Locale::parse("en")
}

fn single(name: &str, value: impl Into<RawValue>) -> Record {
    let value: RawValue = value.into();
    [(name, value)].into_iter().collect()
}

#[test]
fn short_text_becomes_indexed_text_with_minimum_width() {
    let pairs = generate_from_objects(&[single("X", "abc")], &en());
    assert_eq!(pairs.len(), 1);
    let pair = &pairs[0];
    assert_eq!(pair.source.name, "X");
    assert_eq!(pair.source.data_type, DataType::Text);
    assert_eq!(pair.target.name, "X");
    assert_eq!(pair.target.data_type, DataType::Text);
    assert_eq!(pair.target.width, 10);
    assert_eq!(pair.target.indexed, Some(true));
    assert!(pair.warning.is_none());
}

#[test]
fn long_text_is_not_indexed_and_widens_column() {
    let long = "a".repeat(103);
    let pairs = generate_from_objects(&[single("X", long.as_str())], &en());
    assert_eq!(pairs[0].target.width, 103);
    assert_eq!(pairs[0].target.indexed, Some(false));
}

#[test]
fn iso_date_text_becomes_day_granular_time() {
    let pairs = generate_from_objects(&[single("X", "2019-01-30")], &en());
    let pair = &pairs[0];
    assert_eq!(pair.source.data_type, DataType::Time);
    assert_eq!(pair.source.format.as_deref(), Some("yyyy-MM-dd"));
    assert_eq!(pair.target.data_type, DataType::Time);
    assert_eq!(pair.target.width, 10);
    assert_eq!(pair.target.format.as_deref(), Some("d MMM yyyy"));
    assert_eq!(pair.target.grouping_time_unit, Some(TimeUnit::Day));
    assert_eq!(pair.target.indexed, Some(true));
}

#[test]
fn fractional_number_breaks_timestamp_column() {
    let now = Utc::now().timestamp_millis();
    let sample = vec![single("X", now), single("X", 1.5)];
    let pairs = generate_from_objects(&sample, &en());
    let pair = &pairs[0];
    assert_eq!(pair.source.data_type, DataType::Number);
    assert_eq!(pair.target.data_type, DataType::Number);
    assert!(pair.target.format.is_none());
    assert!(pair.warning.as_deref().is_some_and(|w| w.contains("TIME")));
}

#[test]
fn epoch_column_named_time_keeps_millisecond_granularity() {
    let sample = vec![single("updateTime", 1_000_i64), single("updateTime", 2_000_i64)];
    let pairs = generate_from_objects(&sample, &en());
    let pair = &pairs[0];
    assert_eq!(pair.target.data_type, DataType::Time);
    assert_eq!(pair.target.grouping_time_unit, Some(TimeUnit::Millisecond));
    assert_eq!(pair.target.format.as_deref(), Some("d MMM yyyy HH:mm:ss.SSS"));
}

#[test]
fn conflicting_types_fall_back_to_text() {
    let sample = vec![single("X", 12_i64), single("X", "twelve")];
    let pairs = generate_from_objects(&sample, &en());
    assert_eq!(pairs[0].target.data_type, DataType::Text);
    assert!(pairs[0].warning.is_none());
}

#[test]
fn locale_pattern_is_used_for_german_dates() {
    let pairs = generate_from_objects(&[single("Geburtstag", "10.04.2005")], &Locale::parse("de"));
    assert_eq!(pairs[0].target.data_type, DataType::Time);
    assert_eq!(pairs[0].source.format.as_deref(), Some("dd.MM.yyyy"));
}

#[test]
fn rows_keep_header_order_and_default_empty_columns_to_text() {
    let headers = vec!["id".to_string(), "note".to_string(), "empty".to_string()];
    let rows = vec![
        vec![RawValue::Integer(1), RawValue::from("first"), RawValue::Null],
        vec![RawValue::Integer(2), RawValue::from("second"), RawValue::Null],
    ];
    let pairs = generate_from_rows(&headers, &rows, &en());
    let names = pairs.iter().map(|p| p.name()).collect::<Vec<_>>();
    assert_eq!(names, ["id", "note", "empty"]);
    assert_eq!(pairs[0].data_type(), DataType::Number);
    assert_eq!(pairs[1].data_type(), DataType::Text);
    assert_eq!(pairs[2].data_type(), DataType::Text);
    assert_eq!(pairs[2].target.width, 10);
}

#[test]
fn generated_mapping_survives_yaml_round_trip() {
    let sample = vec![
        [("When", "2019-01-30"), ("Note", "abc")]
            .into_iter()
            .collect::<Record>(),
    ];
    let pairs = generate_from_objects(&sample, &en());
    let mapping = ColumnMapping::new(pairs, Some("en-US".to_string()));
    let yaml = mapping.to_yaml_string().expect("serialize mapping");
    assert!(yaml.contains("dataType: TIME"));
    assert!(yaml.contains("groupingTimeUnit: DAY"));
    let restored = ColumnMapping::from_yaml_str(&yaml).expect("parse mapping");
    assert_eq!(restored.columns, mapping.columns);
    assert_eq!(restored.mapping_version.as_deref(), Some("1.0.0"));
}
