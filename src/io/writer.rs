use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::TableIoError;
use crate::table::Table;

/// Export `table` as CSV, leaving out the `strip` columns.
///
/// Rows are projected onto the remaining headers in header order; nulls are
/// written as empty fields.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P, strip: &[&str]) -> Result<(), TableIoError> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    write_delimited(table, writer, b',', strip)?;
    log::info!("Wrote {} row(s) to {}", table.len(), path.display());
    Ok(())
}

/// Write `table` to any sink with the given delimiter.
pub fn write_delimited<W: Write>(
    table: &Table,
    writer: W,
    delimiter: u8,
    strip: &[&str],
) -> Result<(), TableIoError> {
    let exported = if strip.is_empty() {
        table.clone()
    } else {
        table.without_columns(strip)
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    csv_writer.write_record(exported.headers())?;
    for row in exported.projected_rows() {
        csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}
