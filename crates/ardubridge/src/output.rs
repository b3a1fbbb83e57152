use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result that can be printed in every output format.
pub trait Record: Serialize {
    /// Column names, lower-case.
    fn columns() -> &'static [&'static str];
    /// Cell values, in column order.
    fn cells(&self) -> Vec<String>;
    /// The single most useful value, for `--format raw`.
    fn raw(&self) -> String;
}

pub fn print_record<R: Record>(record: &R, format: OutputFormat) {
    print_records(std::slice::from_ref(record), format);
}

pub fn print_records<R: Record>(records: &[R], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(R::columns().iter().map(|c| c.to_uppercase()));
            for record in records {
                table.add_row(record.cells());
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                let line = R::columns()
                    .iter()
                    .zip(record.cells())
                    .map(|(column, cell)| format!("{column}={cell}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{line}");
            }
        }
        OutputFormat::Raw => {
            for record in records {
                println!("{}", record.raw());
            }
        }
    }
}

/// Bytes as space-separated lower-case hex.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
