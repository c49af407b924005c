//! Conversion of raw rows into normalized, persistable records.
//!
//! An [`EntryMapper`] applies a fixed set of column pairs to rows or objects.
//! Every emitted record gets the next id from the mapper's own sequence.
//! Failures are isolated per column and per row: a bad number only drops its
//! field, while a bad time or boolean discards the whole entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
    column::{ColumnPair, DataType},
    date_format,
    locale::Locale,
    value::{FieldValue, RawValue, Record},
};

pub const ID_FIELD: &str = "_id";
const ID_OFFSET: u64 = 1_000_000;

/// Largest sequence value whose id still fits in a `u64`.
pub const MAX_SEQUENCE: u64 = u64::MAX - ID_OFFSET;

pub type Entry = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Column '{column}': Cannot convert \"{value}\" to Number")]
    Number { column: String, value: String },
    #[error("Column '{column}': Cannot convert \"{value}\" to Boolean")]
    Boolean { column: String, value: String },
    #[error("Column '{column}': Cannot convert \"{value}\" to Time using format \"{format}\"")]
    TimeWithFormat {
        column: String,
        value: String,
        format: String,
    },
    #[error("Column '{column}': Cannot convert \"{value}\" to Time without a custom source format")]
    Time { column: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("Id sequence start {seed} exceeds the maximum of {max}")]
    SeedTooLarge { seed: u64, max: u64 },
    #[error("Id sequence exhausted at {max}; no further ids can be issued")]
    Exhausted { max: u64 },
}

impl ConversionError {
    /// Fatal errors discard the whole entry of their row.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConversionError::Number { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Entry>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EntryMapper {
    pairs: Vec<ColumnPair>,
    locale: Locale,
    sequence: u64,
}

impl EntryMapper {
    pub fn new(pairs: Vec<ColumnPair>, locale: Locale) -> Self {
        Self {
            pairs,
            locale,
            sequence: 0,
        }
    }

    /// Starts the id sequence at `sequence`, e.g. to give each worker of a
    /// parallel import its own id range. Seeds above [`MAX_SEQUENCE`] are
    /// rejected.
    pub fn with_sequence(
        pairs: Vec<ColumnPair>,
        locale: Locale,
        sequence: u64,
    ) -> Result<Self, SequenceError> {
        if sequence > MAX_SEQUENCE {
            return Err(SequenceError::SeedTooLarge {
                seed: sequence,
                max: MAX_SEQUENCE,
            });
        }
        Ok(Self {
            pairs,
            locale,
            sequence,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn column_pairs(&self) -> &[ColumnPair] {
        &self.pairs
    }

    pub fn map_rows(&mut self, rows: &[Vec<RawValue>]) -> Vec<MappedRecord> {
        rows.iter().filter_map(|row| self.map_row(row)).collect()
    }

    pub fn map_objects(&mut self, objects: &[Record]) -> Vec<MappedRecord> {
        objects
            .iter()
            .filter_map(|object| self.map_object(object))
            .collect()
    }

    /// Maps one positional row; `None` when every mapped cell is empty.
    pub fn map_row(&mut self, row: &[RawValue]) -> Option<MappedRecord> {
        self.map_values(|idx, _| row.get(idx))
    }

    /// Maps one object by `source.name`; `None` when every mapped key is empty.
    pub fn map_object(&mut self, object: &Record) -> Option<MappedRecord> {
        self.map_values(|_, pair| object.get(&pair.source.name))
    }

    fn map_values<'v, F>(&mut self, lookup: F) -> Option<MappedRecord>
    where
        F: Fn(usize, &ColumnPair) -> Option<&'v RawValue>,
    {
        let values = self
            .pairs
            .iter()
            .enumerate()
            .map(|(idx, pair)| lookup(idx, pair).filter(|value| !value.is_null()))
            .collect::<Vec<_>>();
        if values.iter().all(Option::is_none) {
            return None;
        }

        let Some(sequence) = self
            .sequence
            .checked_add(1)
            .filter(|next| *next <= MAX_SEQUENCE)
        else {
            let err = SequenceError::Exhausted { max: MAX_SEQUENCE };
            warn!("{err}");
            return Some(MappedRecord {
                id: String::new(),
                entry: None,
                errors: vec![err.to_string()],
            });
        };
        self.sequence = sequence;
        let id = (ID_OFFSET + sequence).to_string();
        let mut entry = Entry::new();
        entry.insert(ID_FIELD.to_string(), FieldValue::Text(id.clone()));
        let mut entry = Some(entry);
        let mut errors = Vec::new();

        for (pair, value) in self.pairs.iter().zip(values) {
            let Some(value) = value else {
                continue;
            };
            match convert_value(pair, value, &self.locale) {
                Ok(field) => {
                    if let Some(entry) = entry.as_mut() {
                        entry.insert(pair.target.name.clone(), field);
                    }
                }
                Err(err) => {
                    let fatal = err.is_fatal();
                    errors.push(err.to_string());
                    if fatal {
                        entry = None;
                        break;
                    }
                }
            }
        }

        Some(MappedRecord { id, entry, errors })
    }
}

/// Converts one non-null raw value according to the pair's target type.
pub fn convert_value(
    pair: &ColumnPair,
    value: &RawValue,
    locale: &Locale,
) -> Result<FieldValue, ConversionError> {
    let column = || pair.source.name.clone();
    match pair.target.data_type {
        DataType::Number => to_number(value, locale)
            .map(FieldValue::Number)
            .ok_or_else(|| ConversionError::Number {
                column: column(),
                value: value.as_display(),
            }),
        DataType::Boolean => {
            to_boolean(value)
                .map(FieldValue::Boolean)
                .ok_or_else(|| ConversionError::Boolean {
                    column: column(),
                    value: value.as_display(),
                })
        }
        DataType::Time => {
            let source_format = pair.source.format.as_deref();
            let instant = to_instant(value, source_format, locale).ok_or_else(|| {
                match source_format {
                    Some(format) => ConversionError::TimeWithFormat {
                        column: column(),
                        value: value.as_display(),
                        format: format.to_string(),
                    },
                    None => ConversionError::Time {
                        column: column(),
                        value: value.as_display(),
                    },
                }
            })?;
            let unit = pair
                .target
                .format
                .as_deref()
                .map(date_format::granularity_of)
                .or(pair.target.grouping_time_unit);
            Ok(FieldValue::Time(match unit {
                Some(unit) if unit.is_calendar() => date_format::truncate_to(instant, unit),
                _ => instant,
            }))
        }
        DataType::Object => Ok(match value {
            RawValue::Object(map) => FieldValue::Object(JsonValue::Object(map.clone())),
            other => FieldValue::Text(other.as_display()),
        }),
        DataType::Text => Ok(FieldValue::Text(value.as_display())),
    }
}

fn to_number(value: &RawValue, locale: &Locale) -> Option<f64> {
    match value {
        RawValue::Integer(i) => Some(*i as f64),
        RawValue::Float(f) => f.is_finite().then_some(*f),
        RawValue::Text(text) => locale.parse_number(text),
        RawValue::Timestamp(ts) => Some(ts.timestamp_millis() as f64),
        RawValue::Null | RawValue::Boolean(_) | RawValue::Object(_) | RawValue::Array(_) => None,
    }
}

fn to_boolean(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Boolean(b) => Some(*b),
        RawValue::Integer(1) => Some(true),
        RawValue::Integer(0) => Some(false),
        RawValue::Text(text) => {
            let lowered = text.trim().to_ascii_lowercase();
            match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Numbers are epoch milliseconds whatever the source format; text is parsed
/// with the pinned format, or by detection and RFC 3339 when none is pinned.
fn to_instant(
    value: &RawValue,
    source_format: Option<&str>,
    locale: &Locale,
) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Timestamp(ts) => Some(*ts),
        RawValue::Integer(_) | RawValue::Float(_) => {
            DateTime::from_timestamp_millis(value.as_integer()?)
        }
        RawValue::Text(text) => match source_format {
            Some(format) => date_format::parse_with_format(text, format),
            None => date_format::detect(text, locale, "")
                .and_then(|found| date_format::parse_with_format(text, &found.format))
                .or_else(|| {
                    DateTime::parse_from_rfc3339(text.trim())
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                }),
        },
        _ => None,
    }
}
