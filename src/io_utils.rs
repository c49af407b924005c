//! I/O utilities: input readers that produce raw samples and row streams,
//! plus output helpers.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Format resolution**: `.json`, `.jsonl` and `.ndjson` inputs are read as
//!   JSON, everything else as CSV.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Cell typing**: CSV cells become nulls, numbers, and booleans unless raw
//!   text is requested.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::debug;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::value::{RawValue, Record};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellTyping {
    #[default]
    Dynamic,
    RawText,
}

/// Rows read from an input, positional (CSV) or name-keyed (JSON).
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<RawValue>>,
    },
    Objects(Vec<Record>),
}

impl Dataset {
    pub fn len(&self) -> usize {
        match self {
            Dataset::Rows { rows, .. } => rows.len(),
            Dataset::Objects(objects) => objects.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_input_format(path: &Path, provided: Option<InputFormat>) -> InputFormat {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext)
            if ["json", "jsonl", "ndjson"]
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            InputFormat::Json
        }
        _ => InputFormat::Csv,
    })
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Types a CSV cell the way a spreadsheet reader would.
pub fn type_cell(cell: &str, typing: CellTyping) -> RawValue {
    if cell.is_empty() {
        return RawValue::Null;
    }
    if typing == CellTyping::RawText {
        return RawValue::Text(cell.to_string());
    }
    if let Ok(int) = cell.parse::<i64>() {
        return RawValue::Integer(int);
    }
    let plain_number = cell
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && cell.chars().any(|c| c.is_ascii_digit());
    if plain_number && let Ok(float) = cell.parse::<f64>() {
        return RawValue::Float(float);
    }
    match cell {
        "true" | "TRUE" | "True" => RawValue::Boolean(true),
        "false" | "FALSE" | "False" => RawValue::Boolean(false),
        _ => RawValue::Text(cell.to_string()),
    }
}

/// Reads a headed CSV input; `limit` caps the number of data rows.
pub fn read_csv(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    typing: CellTyping,
    limit: Option<usize>,
) -> Result<Dataset> {
    let mut reader = open_csv_reader(open_input(path)?, delimiter);
    let header_record = reader.byte_headers()?.clone();
    let headers = decode_record(&header_record, encoding)
        .with_context(|| format!("Decoding headers of {path:?}"))?;
    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding line {line} of {path:?}"))?;
        rows.push(
            decoded
                .iter()
                .map(|cell| type_cell(cell, typing))
                .collect(),
        );
    }
    debug!("Read {} row(s) from {:?}", rows.len(), path);
    Ok(Dataset::Rows { headers, rows })
}

/// Reads a JSON array of objects, or JSON Lines with one object per line.
pub fn read_json(path: &Path, encoding: &'static Encoding, limit: Option<usize>) -> Result<Dataset> {
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(open_input(path)?);
    let mut reader = BufReader::new(decoder);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .with_context(|| format!("Reading JSON input {path:?}"))?;

    let values = if contents.trim_start().starts_with('[') {
        match serde_json::from_str::<JsonValue>(&contents)
            .with_context(|| format!("Parsing JSON array in {path:?}"))?
        {
            JsonValue::Array(items) => items,
            _ => bail!("Expected a JSON array of objects in {path:?}"),
        }
    } else {
        parse_json_lines(contents.as_bytes(), path)?
    };

    let cap = limit.unwrap_or(usize::MAX);
    let objects = values
        .into_iter()
        .take(cap)
        .enumerate()
        .map(|(idx, value)| match value {
            JsonValue::Object(map) => Ok(Record::from(map)),
            other => Err(anyhow!(
                "Item {} of {path:?} is not a JSON object: {other}",
                idx + 1
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Read {} object(s) from {:?}", objects.len(), path);
    Ok(Dataset::Objects(objects))
}

fn parse_json_lines<R: BufRead>(reader: R, path: &Path) -> Result<Vec<JsonValue>> {
    let mut values = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .with_context(|| format!("Parsing line {} of {path:?}", idx + 1))?;
        values.push(value);
    }
    Ok(values)
}

pub fn read_dataset(
    path: &Path,
    format: InputFormat,
    delimiter: u8,
    encoding: &'static Encoding,
    typing: CellTyping,
    limit: Option<usize>,
) -> Result<Dataset> {
    match format {
        InputFormat::Csv => read_csv(path, delimiter, encoding, typing, limit),
        InputFormat::Json => read_json(path, encoding, limit),
    }
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Writes one JSON document per line.
pub fn write_json_lines<W, T>(writer: &mut W, items: &[T]) -> Result<()>
where
    W: Write + ?Sized,
    T: Serialize,
{
    for item in items {
        serde_json::to_writer(&mut *writer, item).context("Serializing JSON line")?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
