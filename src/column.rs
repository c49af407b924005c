//! Column model, column pairs, and YAML persistence of a column mapping.
//!
//! A [`ColumnPair`] couples the shape observed in raw data (`source`) with the
//! shape to persist (`target`). The generator produces pairs from a sample;
//! a user may edit the saved [`ColumnMapping`] before the entry mapper applies
//! it to the full row stream.
//!
//! ## Responsibilities
//!
//! - [`DataType`] and [`TimeUnit`] enums with their serialized names
//! - Width and indexing limits shared by generation and display
//! - YAML loading and saving via `serde_yaml`, with validation on load

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::date_format;

pub const MIN_WIDTH: usize = 10;
pub const MAX_WIDTH: usize = 300;
pub const MAX_TEXT_LENGTH_TO_BE_INDEXED: usize = 100;

const CURRENT_MAPPING_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Text,
    Number,
    Time,
    Boolean,
    Object,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "TEXT",
            DataType::Number => "NUMBER",
            DataType::Time => "TIME",
            DataType::Boolean => "BOOLEAN",
            DataType::Object => "OBJECT",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["text", "number", "time", "boolean", "object"]
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "text" | "string" => Ok(DataType::Text),
            "number" | "integer" | "int" | "float" | "double" => Ok(DataType::Number),
            "time" | "date" | "datetime" | "timestamp" => Ok(DataType::Time),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "object" | "json" => Ok(DataType::Object),
            _ => Err(anyhow!(
                "Unknown data type '{value}'. Supported types: {}",
                DataType::variants().join(", ")
            )),
        }
    }
}

/// Time granularity, ordered from finest to coarsest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Millisecond => "MILLISECOND",
            TimeUnit::Second => "SECOND",
            TimeUnit::Minute => "MINUTE",
            TimeUnit::Hour => "HOUR",
            TimeUnit::Day => "DAY",
            TimeUnit::Month => "MONTH",
            TimeUnit::Year => "YEAR",
        }
    }

    /// Display pattern used as `target.format` for a column of this granularity.
    pub fn display_format(&self) -> &'static str {
        match self {
            TimeUnit::Millisecond => "d MMM yyyy HH:mm:ss.SSS",
            TimeUnit::Second => "d MMM yyyy HH:mm:ss",
            TimeUnit::Minute => "d MMM yyyy HH:mm",
            TimeUnit::Hour => "d MMM yyyy HH",
            TimeUnit::Day => "d MMM yyyy",
            TimeUnit::Month => "MMM yyyy",
            TimeUnit::Year => "yyyy",
        }
    }

    /// Whether stored values are rounded down to the start of this unit.
    pub fn is_calendar(&self) -> bool {
        matches!(self, TimeUnit::Day | TimeUnit::Month | TimeUnit::Year)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub width: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_time_unit: Option<TimeUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, width: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            width,
            format: None,
            grouping_time_unit: None,
            indexed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub source: Column,
    pub target: Column,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ColumnPair {
    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn data_type(&self) -> DataType {
        self.target.data_type
    }
}

/// A saved column mapping, editable between generation and mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub columns: Vec<ColumnPair>,
}

impl ColumnMapping {
    pub fn new(columns: Vec<ColumnPair>, locale: Option<String>) -> Self {
        Self {
            mapping_version: None,
            locale,
            columns,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|pair| pair.source.name == name || pair.target.name == name)
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .filter_map(|pair| pair.warning.as_deref().map(|w| (pair.name(), w)))
    }

    pub fn validate(&self) -> Result<()> {
        let mut targets = HashSet::new();
        for (idx, pair) in self.columns.iter().enumerate() {
            ensure!(
                !pair.source.name.trim().is_empty(),
                "Column {} has an empty source name",
                idx + 1
            );
            ensure!(
                !pair.target.name.trim().is_empty(),
                "Column '{}' has an empty target name",
                pair.source.name
            );
            ensure!(
                targets.insert(pair.target.name.as_str()),
                "Target column name '{}' is used more than once",
                pair.target.name
            );
            for format in [&pair.source.format, &pair.target.format]
                .into_iter()
                .flatten()
            {
                date_format::validate_pattern(format).with_context(|| {
                    format!("Invalid time format for column '{}'", pair.source.name)
                })?;
            }
        }
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let mapping = self.versioned()?;
        serde_yaml::to_string(&mapping).context("Serializing column mapping to YAML string")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mapping = self.versioned()?;
        let file =
            File::create(path).with_context(|| format!("Creating mapping file {path:?}"))?;
        serde_yaml::to_writer(file, &mapping).context("Writing column mapping YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening mapping file {path:?}"))?;
        let reader = BufReader::new(file);
        let mapping: ColumnMapping =
            serde_yaml::from_reader(reader).context("Parsing column mapping YAML")?;
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let mapping: ColumnMapping =
            serde_yaml::from_str(contents).context("Parsing column mapping YAML")?;
        mapping.validate()?;
        Ok(mapping)
    }

    fn versioned(&self) -> Result<Self> {
        self.validate()?;
        let mut mapping = self.clone();
        if mapping.mapping_version.is_none() {
            mapping.mapping_version = Some(CURRENT_MAPPING_VERSION.to_string());
        }
        Ok(mapping)
    }
}
