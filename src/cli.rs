use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::io_utils::InputFormat;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer column mappings and convert CSV/JSON rows into typed records",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample an input and write the inferred column mapping as YAML
    Probe(ProbeArgs),
    /// List the columns of a mapping file as a table
    Columns(ColumnsArgs),
    /// Convert every row of an input into JSON Lines records using a mapping
    Map(MapArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for InputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => InputFormat::Csv,
            FormatArg::Json => InputFormat::Json,
        }
    }
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file (CSV, TSV, JSON array or JSON Lines); '-' reads stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input format (defaults to the file extension, CSV otherwise)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Keep CSV cells as text instead of typing numbers and booleans
    #[arg(long = "raw-text")]
    pub raw_text: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Destination mapping file (YAML); stdout when omitted
    #[arg(short = 'o', long = "mapping")]
    pub mapping: Option<PathBuf>,
    /// Locale used to read numbers and dates, e.g. en-US or de-DE
    #[arg(long, default_value = "en-US")]
    pub locale: String,
    /// Number of rows to sample (0 means the whole input)
    #[arg(long, default_value_t = 100)]
    pub sample_rows: usize,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Mapping file to list
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Mapping file produced by `probe` (possibly edited)
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    /// Output JSON Lines file; stdout when omitted or '-'
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Locale override (defaults to the mapping's locale, then en-US)
    #[arg(long)]
    pub locale: Option<String>,
    /// Sequence value to resume ids from (ids start at 1000000 + N + 1)
    #[arg(long = "id-start", default_value_t = 0)]
    pub id_start: u64,
    /// Only write records that carry conversion errors
    #[arg(long = "errors-only")]
    pub errors_only: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
