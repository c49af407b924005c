pub mod cli;
pub mod column;
pub mod columns;
pub mod date_format;
pub mod generator;
pub mod guess;
pub mod io_utils;
pub mod locale;
pub mod mapper;
pub mod value;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, InputArgs},
    column::{ColumnMapping, ColumnPair},
    io_utils::{CellTyping, Dataset},
    locale::Locale,
    mapper::{EntryMapper, MappedRecord},
    value::RawValue,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("import_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Map(args) => handle_map(&args),
    }
}

fn load_input(args: &InputArgs, limit: Option<usize>) -> Result<Dataset> {
    let format = io_utils::resolve_input_format(&args.input, args.format.map(Into::into));
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let typing = if args.raw_text {
        CellTyping::RawText
    } else {
        CellTyping::Dynamic
    };
    info!(
        "Reading '{}' as {format:?} with delimiter '{}' and encoding {}",
        args.input.display(),
        printable_delimiter(delimiter),
        encoding.name()
    );
    io_utils::read_dataset(&args.input, format, delimiter, encoding, typing, limit)
        .with_context(|| format!("Reading input {:?}", args.input))
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let locale = Locale::parse(&args.locale);
    let limit = (args.sample_rows > 0).then_some(args.sample_rows);
    let dataset = load_input(&args.input, limit)?;
    debug!("Sampled {} row(s) for probing", dataset.len());

    let pairs = match &dataset {
        Dataset::Rows { headers, rows } => generator::generate_from_rows(headers, rows, &locale),
        Dataset::Objects(objects) => generator::generate_from_objects(objects, &locale),
    };
    let mapping = ColumnMapping::new(pairs, Some(locale.tag().to_string()));
    for (column, warning) in mapping.warnings() {
        warn!("{column}: {warning}");
    }

    match &args.mapping {
        Some(path) => {
            mapping
                .save(path)
                .with_context(|| format!("Writing mapping to {path:?}"))?;
            info!(
                "Inferred mapping for {} column(s) written to {path:?}",
                mapping.columns.len()
            );
        }
        None => print!("{}", mapping.to_yaml_string()?),
    }
    Ok(())
}

fn handle_map(args: &cli::MapArgs) -> Result<()> {
    let mapping = ColumnMapping::load(&args.mapping)
        .with_context(|| format!("Loading mapping from {:?}", args.mapping))?;
    let locale = args
        .locale
        .as_deref()
        .or(mapping.locale.as_deref())
        .map(Locale::parse)
        .unwrap_or_default();
    let dataset = load_input(&args.input, None)?;

    let mut mapper = EntryMapper::with_sequence(mapping.columns, locale, args.id_start)
        .context("Invalid --id-start")?;
    let records = match &dataset {
        Dataset::Rows { headers, rows } => {
            let rows = align_rows(headers, rows, mapper.column_pairs());
            mapper.map_rows(&rows)
        }
        Dataset::Objects(objects) => mapper.map_objects(objects),
    };

    let failed = records.iter().filter(|r| !r.errors.is_empty()).count();
    let discarded = records.iter().filter(|r| r.entry.is_none()).count();
    let written = records
        .into_iter()
        .filter(|r| !args.errors_only || !r.errors.is_empty())
        .collect::<Vec<MappedRecord>>();

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    io_utils::write_json_lines(&mut writer, &written)?;
    writer.flush().context("Flushing output")?;

    info!(
        "Mapped {} row(s): {failed} with errors, {discarded} discarded; last sequence {}",
        dataset.len(),
        mapper.sequence()
    );
    Ok(())
}

/// Reorders CSV cells to follow the mapping when every source column is
/// found among the headers; otherwise rows are used positionally.
fn align_rows(
    headers: &[String],
    rows: &[Vec<RawValue>],
    pairs: &[ColumnPair],
) -> Vec<Vec<RawValue>> {
    let positions = pairs
        .iter()
        .map(|pair| headers.iter().position(|h| h == &pair.source.name))
        .collect::<Option<Vec<_>>>();
    match positions {
        Some(positions) if positions.iter().enumerate().any(|(i, p)| i != *p) => {
            debug!("Reordering input columns to follow the mapping: {positions:?}");
            rows.iter()
                .map(|row| {
                    positions
                        .iter()
                        .map(|&p| row.get(p).cloned().unwrap_or(RawValue::Null))
                        .collect()
                })
                .collect()
        }
        Some(_) => rows.to_vec(),
        None => {
            warn!("Mapping columns do not all match the input headers; mapping by position");
            rows.to_vec()
        }
    }
}

fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        b',' => ",".to_string(),
        other => (other as char).to_string(),
    }
}
