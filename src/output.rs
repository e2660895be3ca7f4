use std::io::Write;

use colored::Colorize;

use crate::{
    error::{AppResult, file_write_error},
    executor::QueryResult
};

/// Output format for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
    Csv
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// Format a query result based on output options
pub fn format_query_result(result: &QueryResult, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(result).unwrap_or_default(),
        OutputFormat::Csv => {
            if let Some(error) = result.error() {
                return format_failure(error, opts);
            }
            let mut buffer = Vec::new();
            match write_csv(result, &mut buffer) {
                Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
                Err(_) => String::new()
            }
        }
        OutputFormat::Text => format_text_table(result, opts)
    }
}

/// Write header and rows as CSV; `NULL` cells become empty fields
pub fn write_csv<W: Write>(result: &QueryResult, writer: W) -> AppResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(result.columns())
        .map_err(|e| file_write_error("csv", e))?;
    for row in result.rows() {
        csv.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .map_err(|e| file_write_error("csv", e))?;
    }
    csv.flush().map_err(|e| file_write_error("csv", e))?;
    Ok(())
}

fn format_text_table(result: &QueryResult, opts: &OutputOptions) -> String {
    if let Some(error) = result.error() {
        return format_failure(error, opts);
    }

    let cells: Vec<Vec<&str>> = result
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().unwrap_or("NULL"))
                .collect()
        })
        .collect();
    let mut widths: Vec<usize> = result
        .columns()
        .iter()
        .map(|c| c.chars().count())
        .collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut output = String::new();
    let header = pad_row(result.columns().iter().map(String::as_str), &widths);
    if opts.colored {
        output.push_str(&header.bold().to_string());
    } else {
        output.push_str(&header);
    }
    output.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&rule.join("-+-"));
    output.push('\n');
    for row in &cells {
        output.push_str(&pad_row(row.iter().copied(), &widths));
        output.push('\n');
    }

    let footer = format!("({} rows)", result.rows().len());
    if opts.colored {
        output.push_str(&footer.dimmed().to_string());
    } else {
        output.push_str(&footer);
    }
    output.push('\n');
    output
}

fn format_failure(error: &str, opts: &OutputOptions) -> String {
    let label = if opts.colored {
        "Query failed:".red().bold().to_string()
    } else {
        String::from("Query failed:")
    };
    format!("{} {}\n", label, error)
}

fn pad_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| {
            let fill = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(fill))
        })
        .collect();
    padded.join(" | ").trim_end().to_string()
}
