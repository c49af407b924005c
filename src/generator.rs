//! Column mapping generation from a sample of untyped rows.
//!
//! The sample is folded column by column: a column stays unobserved until
//! its first value carrying evidence, which fixes an initial [`ColumnPair`];
//! every later value produces a refined copy of that pair. Refinement only
//! ever widens a column, clears indexing eligibility, pins a time format, or
//! downgrades the type (TIME → NUMBER for fractional numbers, anything →
//! TEXT on conflict). Generation never fails; TEXT is the universal fallback.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::{
    column::{
        Column, ColumnPair, DataType, MAX_TEXT_LENGTH_TO_BE_INDEXED, MAX_WIDTH, MIN_WIDTH,
        TimeUnit,
    },
    date_format, guess,
    locale::Locale,
    value::{RawValue, Record},
};

const MIN_DIGITS_FOR_DATE: usize = 2;

/// Builds column pairs from name-keyed rows, in first-seen column order.
pub fn generate_from_objects(sample: &[Record], locale: &Locale) -> Vec<ColumnPair> {
    sample
        .iter()
        .fold(MappingAccumulator::default(), |acc, record| {
            record
                .iter()
                .fold(acc, |acc, (name, value)| acc.observe(name, value, locale))
        })
        .finish()
}

/// Builds column pairs from positional rows named by `headers`.
///
/// Cells beyond the header count are ignored; a short row contributes no
/// evidence for its missing columns.
pub fn generate_from_rows(
    headers: &[String],
    rows: &[Vec<RawValue>],
    locale: &Locale,
) -> Vec<ColumnPair> {
    let seeded = headers
        .iter()
        .fold(MappingAccumulator::default(), |acc, name| acc.declare(name));
    rows.iter()
        .fold(seeded, |acc, row| {
            headers
                .iter()
                .zip(row)
                .fold(acc, |acc, (name, value)| acc.observe(name, value, locale))
        })
        .finish()
}

#[derive(Debug, Clone)]
enum ColumnState {
    Unobserved(String),
    Observed(ColumnPair),
}

#[derive(Debug, Default)]
struct MappingAccumulator {
    columns: Vec<ColumnState>,
    positions: HashMap<String, usize>,
}

impl MappingAccumulator {
    fn declare(mut self, name: &str) -> Self {
        if !self.positions.contains_key(name) {
            self.positions.insert(name.to_string(), self.columns.len());
            self.columns.push(ColumnState::Unobserved(name.to_string()));
        }
        self
    }

    fn observe(self, name: &str, value: &RawValue, locale: &Locale) -> Self {
        let mut acc = self.declare(name);
        let idx = acc.positions[name];
        let next = match &acc.columns[idx] {
            ColumnState::Unobserved(name) => {
                first_observation(name, value, locale).map(ColumnState::Observed)
            }
            ColumnState::Observed(pair) => Some(ColumnState::Observed(pair.refine(value, locale))),
        };
        if let Some(state) = next {
            acc.columns[idx] = state;
        }
        acc
    }

    fn finish(self) -> Vec<ColumnPair> {
        self.columns
            .into_iter()
            .map(|state| match state {
                ColumnState::Observed(pair) => pair,
                ColumnState::Unobserved(name) => {
                    debug!("Column '{name}' had no values in the sample; defaulting to TEXT");
                    let source = Column::new(name, DataType::Text, MIN_WIDTH);
                    let mut target = source.clone();
                    target.indexed = Some(true);
                    ColumnPair {
                        source,
                        target,
                        warning: None,
                    }
                }
            })
            .collect()
    }
}

/// Initial pair for the first value of a column that carries evidence.
pub fn first_observation(name: &str, value: &RawValue, locale: &Locale) -> Option<ColumnPair> {
    let data_type = guess::type_of(value, locale)?;
    let width = compute_width(value, data_type, None, None);
    let mut source = Column::new(name, data_type, width);
    let mut target = source.clone();
    target.indexed = Some(is_index_eligible(value));

    let detected = match (data_type, value) {
        (DataType::Text, RawValue::Text(text)) if guess::digit_count(text) >= MIN_DIGITS_FOR_DATE => {
            date_format::detect(text, locale, name).map(|found| (Some(found.format), found.time_unit))
        }
        (DataType::Number, _) if guess::is_assumedly_time(name, value) => Some((
            None,
            guess::time_unit_from_column_name(name, value, TimeUnit::Millisecond),
        )),
        (DataType::Time, _) => Some((None, TimeUnit::Millisecond)),
        _ => None,
    };

    if let Some((format, unit)) = detected {
        debug!(
            "Column '{name}' detected as TIME ({unit}) with source format {:?}",
            format
        );
        source.data_type = DataType::Time;
        source.format = format;
        target.data_type = DataType::Time;
        target.format = Some(unit.display_format().to_string());
        target.grouping_time_unit = Some(unit);
    }

    Some(ColumnPair {
        source,
        target,
        warning: None,
    })
}

impl ColumnPair {
    /// Folds one more observed value into this pair, returning the refined pair.
    ///
    /// A text value keeps a TIME column when it parses with the pinned source
    /// format, or, with no format pinned yet, when a time suffix on the
    /// implied date parses it; that format is then pinned.
    pub fn refine(&self, value: &RawValue, locale: &Locale) -> ColumnPair {
        let Some(observed) = guess::type_of(value, locale) else {
            return self.clone();
        };
        let established = self.target.data_type;
        let mut next = self.clone();

        match (established, observed) {
            (DataType::Time, DataType::Number) if value.as_integer().is_none() => {
                next = next.downgraded(DataType::Number, value, true);
            }
            (DataType::Time, DataType::Number) | (DataType::Time, DataType::Time) => {}
            (DataType::Time, DataType::Text) => {
                let text = value.as_display();
                match self.source.format.as_deref() {
                    Some(format) => {
                        if date_format::parse_with_format(&text, format).is_none() {
                            next = next.downgraded(DataType::Text, value, true);
                        }
                    }
                    None => match date_format::refine_format(&text, locale) {
                        Some(format) => {
                            debug!("Column '{}' pinned to source format \"{format}\"", self.name());
                            next.source.format = Some(format);
                        }
                        None => next = next.downgraded(DataType::Text, value, true),
                    },
                }
            }
            (current, observed) if current == observed => {}
            (DataType::Text, _) => {}
            (current, _) => {
                next = next.downgraded(DataType::Text, value, current == DataType::Time);
            }
        }

        let width = compute_width(
            value,
            next.target.data_type,
            next.source.format.as_deref(),
            next.target.format.as_deref(),
        );
        next.target.width = next.target.width.max(width);
        if !is_index_eligible(value) {
            next.target.indexed = Some(false);
        }
        next
    }

    fn downgraded(mut self, data_type: DataType, value: &RawValue, with_warning: bool) -> Self {
        let previous = self.target.data_type;
        warn!(
            "Column '{}' downgraded from {previous} to {data_type} after value \"{value}\"",
            self.name()
        );
        self.source.data_type = data_type;
        self.target.data_type = data_type;
        if data_type != DataType::Time {
            self.source.format = None;
            self.target.format = None;
            self.target.grouping_time_unit = None;
        }
        if with_warning && self.warning.is_none() {
            self.warning = Some(format!(
                "Column '{}' looked like {previous} but contains \"{value}\"; converted to {data_type}",
                self.name()
            ));
        }
        self
    }
}

/// Display width of `value` for a column of `data_type`, clamped to
/// `[MIN_WIDTH, MAX_WIDTH]`.
pub fn compute_width(
    value: &RawValue,
    data_type: DataType,
    source_format: Option<&str>,
    target_format: Option<&str>,
) -> usize {
    let width = match data_type {
        DataType::Boolean => MIN_WIDTH,
        DataType::Time => time_display(value, source_format, target_format)
            .map(|rendered| rendered.chars().count())
            .unwrap_or_else(|| value.display_len()),
        DataType::Text | DataType::Number | DataType::Object => value.display_len(),
    };
    width.clamp(MIN_WIDTH, MAX_WIDTH)
}

fn time_display(
    value: &RawValue,
    source_format: Option<&str>,
    target_format: Option<&str>,
) -> Option<String> {
    let instant: DateTime<Utc> = match value {
        RawValue::Timestamp(ts) => *ts,
        RawValue::Text(text) => date_format::parse_with_format(text, source_format?)?,
        other => DateTime::from_timestamp_millis(other.as_integer()?)?,
    };
    date_format::format_instant(&instant, target_format?)
}

/// Short values (and nulls) may be indexed; long text and objects may not.
pub fn is_index_eligible(value: &RawValue) -> bool {
    match value {
        RawValue::Text(_) | RawValue::Object(_) | RawValue::Array(_) => {
            value.display_len() <= MAX_TEXT_LENGTH_TO_BE_INDEXED
        }
        _ => true,
    }
}
