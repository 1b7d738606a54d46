use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info};

use super::{TableFormat, TableIoError};
use crate::table::{CellValue, Row, Table};

/// Read a table, picking the layout from the file extension.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table, TableIoError> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);

    let table = match format.delimiter() {
        Some(delimiter) => read_delimited(reader, delimiter)?,
        None => read_json(reader)?,
    };
    info!(
        "Read {} row(s) x {} column(s) from {} ({})",
        table.len(),
        table.headers().len(),
        path.display(),
        format
    );
    Ok(table)
}

/// Read delimited text with a header row.
///
/// Short records leave their trailing cells absent; extra fields beyond the
/// header are dropped.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Table, TableIoError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Spreadsheet exports often lead with a byte-order mark
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TableIoError::InvalidFormat("Missing header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let mut row = Row::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if !field.trim().is_empty() {
                row.set(header.as_str(), field);
            }
        }
        rows.push(row);
    }
    debug!("Parsed {} delimited record(s)", rows.len());

    if rows.is_empty() {
        return Err(TableIoError::EmptyData("No data rows below the header".to_string()));
    }
    Ok(Table::new(headers, rows)?)
}

/// Read a JSON array of flat records.
///
/// Strings stay text, numbers stay numbers, booleans become text and nested
/// values are kept as their JSON text.
pub fn read_json<R: Read>(reader: R) -> Result<Table, TableIoError> {
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let serde_json::Value::Array(records) = value else {
        return Err(TableIoError::InvalidFormat(
            "Expected a JSON array of records".to_string(),
        ));
    };

    let mut rows = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = record else {
            return Err(TableIoError::InvalidFormat(format!(
                "Record {} is not a JSON object",
                i
            )));
        };
        rows.push(
            fields
                .into_iter()
                .map(|(k, v)| (k, json_cell(v)))
                .collect::<Row>(),
        );
    }

    if rows.is_empty() {
        return Err(TableIoError::EmptyData("JSON array has no records".to_string()));
    }
    Ok(Table::from_rows(rows))
}

fn json_cell(value: serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Null,
        serde_json::Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
        serde_json::Value::String(s) if s.trim().is_empty() => CellValue::Null,
        serde_json::Value::String(s) => CellValue::Text(s),
        serde_json::Value::Bool(b) => CellValue::Text(b.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}
