//! Column listing from a mapping file.
//!
//! Reads a mapping YAML file and renders each column pair (source name,
//! type, target name, width, format, indexing, warning) as an ASCII table.

use anyhow::{Context, Result};
use log::info;

use crate::{cli::ColumnsArgs, column::ColumnMapping};

const HEADERS: &[&str] = &[
    "#", "source", "type", "target", "width", "format", "indexed", "warning",
];

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let mapping = ColumnMapping::load(&args.mapping)
        .with_context(|| format!("Loading mapping from {:?}", args.mapping))?;

    if mapping.columns.is_empty() {
        info!("Mapping {:?} does not define any columns", args.mapping);
        return Ok(());
    }

    print!("{}", render_mapping(&mapping));
    info!(
        "Listed {} column(s) from {:?}",
        mapping.columns.len(),
        args.mapping
    );
    Ok(())
}

pub fn render_mapping(mapping: &ColumnMapping) -> String {
    let rows = mapping
        .columns
        .iter()
        .enumerate()
        .map(|(idx, pair)| {
            let target = if pair.target.name != pair.source.name {
                pair.target.name.clone()
            } else {
                String::new()
            };
            let format = match (&pair.source.format, &pair.target.format) {
                (Some(source), Some(target)) => format!("{source} -> {target}"),
                (None, Some(target)) => target.clone(),
                (Some(source), None) => source.clone(),
                (None, None) => String::new(),
            };
            vec![
                (idx + 1).to_string(),
                pair.source.name.clone(),
                pair.target.data_type.to_string(),
                target,
                pair.target.width.to_string(),
                format,
                pair.target.indexed.unwrap_or(true).to_string(),
                pair.warning.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(HEADERS, &rows)
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    push_line(&mut output, &header_cells, &widths);
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    push_line(&mut output, &separator, &widths);
    for row in rows {
        push_line(&mut output, row, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = cell.replace(['\n', '\r', '\t'], " ");
            let padding = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    output.push_str(line.trim_end());
    output.push('\n');
}
