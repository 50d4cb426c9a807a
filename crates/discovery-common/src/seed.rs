/// CSV seed reader used when the primary store is unavailable.
///
/// The first row is the header. Every data row becomes a JSON object keyed by header
/// name with string values; blank cells and blank header columns are left out so a
/// missing cell reads the same as a missing column. Short rows are tolerated.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::CommonError;

pub fn read_seed_file(path: &Path) -> Result<Vec<Value>, CommonError> {
    let file = File::open(path)?;
    read_seed_rows(file)
}

pub fn read_seed_rows<R: Read>(reader: R) -> Result<Vec<Value>, CommonError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row = Map::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            if header.is_empty() || cell.is_empty() {
                continue;
            }
            row.insert(header.to_string(), Value::String(cell.to_string()));
        }
        if !row.is_empty() {
            rows.push(Value::Object(row));
        }
    }
    Ok(rows)
}
