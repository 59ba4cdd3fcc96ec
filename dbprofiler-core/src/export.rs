//! Delimited-text export of a table snapshot.
//!
//! Produces RFC 4180 style CSV: header row of column names, one record per
//! snapshot row, comma delimiter, `\n` record terminator, UTF-8. Output is
//! deterministic: the same snapshot and column order always yields
//! byte-identical text.

use std::path::Path;

use crate::error::{ProfilerError, Result};
use crate::models::{CellValue, TableSnapshot};

/// Renders the snapshot as CSV text.
///
/// NULL cells render as empty fields; all other cells use their canonical
/// text conversion. Fields containing the delimiter, a quote, or a line
/// break are quoted, with embedded quotes doubled.
pub fn snapshot_to_csv(snapshot: &TableSnapshot) -> String {
    let mut out = String::new();

    write_record(&mut out, snapshot.columns.iter().map(String::as_str));

    for row in &snapshot.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                CellValue::Null => String::new(),
                other => other.as_text(),
            })
            .collect();
        write_record(&mut out, fields.iter().map(String::as_str));
    }

    out
}

/// Writes the snapshot as a CSV file at `path`.
///
/// # Errors
/// Returns [`ProfilerError::Io`] when the file cannot be written.
pub async fn write_csv(snapshot: &TableSnapshot, path: &Path) -> Result<()> {
    let csv = snapshot_to_csv(snapshot);
    tokio::fs::write(path, csv).await.map_err(|e| {
        ProfilerError::io(format!("Failed to write CSV to {}", path.display()), e)
    })?;

    tracing::info!(
        "Exported {} rows of {}.{} to {}",
        snapshot.row_count(),
        snapshot.schema,
        snapshot.table,
        path.display()
    );
    Ok(())
}

fn write_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        push_field(out, field);
    }
    out.push('\n');
}

/// Quotes a field when it contains the delimiter, a quote, or a line break.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        for c in field.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
    } else {
        out.push_str(field);
    }
}
