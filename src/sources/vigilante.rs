// =============================================================================
// vigilante.rs: THE VIGILANTE.PW SNAPSHOT
// =============================================================================
//
// Vigilante.pw is gone. What is left of its index is a CSV export kept in the
// repository and converted once into `Vigilante.pw.json`, which is then
// treated like any other archived dataset.
//
// Columns, by position (the header row is skipped):
//   record_count, dump_name, hashing_algorithm, category, breach_date, info
//
// `hashing_algorithm` and `category` are kept in the JSON file. Normalization
// drops them.
// =============================================================================

use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::ExtractError;
use crate::extract::count_value;
use crate::models::{RawRecord, Source};

const COLUMNS: [&str; 6] = [
    "record_count",
    "dump_name",
    "hashing_algorithm",
    "category",
    "breach_date",
    "info",
];

pub fn load(path: &Path) -> Result<Vec<RawRecord>, ExtractError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    read_rows(reader)
}

pub fn parse<R: Read>(input: R) -> Result<Vec<RawRecord>, ExtractError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    read_rows(reader)
}

fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<RawRecord>, ExtractError> {
    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            debug!(line = line + 2, "skipping blank CSV line");
            continue;
        }

        let mut row = RawRecord::new();
        for (name, cell) in COLUMNS.iter().zip(record.iter()) {
            let cell = cell.trim().to_string();
            let value = if *name == "record_count" {
                count_value(cell)
            } else {
                Value::String(cell)
            };
            row.insert((*name).to_string(), value);
        }
        row.insert("source".to_string(), Value::String(Source::Vigilante.to_string()));
        rows.push(row);
    }
    Ok(rows)
}
