//! Regex conformity checking for one column.
//!
//! Validates every value of a chosen column against a user-supplied
//! pattern and reports the conforming percentage plus the non-conforming
//! rows.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ProfilerError, Result};
use crate::models::{CellValue, TableSnapshot};

/// Result of checking one column against one pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformityReport {
    /// Column the check ran against
    pub column_name: String,
    /// Pattern as supplied by the user
    pub pattern: String,
    /// Percentage of rows whose value conforms; 0.0 for an empty snapshot
    pub conformity_pct: f64,
    /// Rows whose value does not conform, in snapshot order
    pub non_conforming_rows: Vec<Vec<CellValue>>,
}

/// Checks every value in `column` against `pattern`.
///
/// Matching is anchored at the start of the value's text conversion: a value
/// conforms iff a match begins at the first character. The match need not
/// cover the whole value and a match further into the string does not count.
/// NULL converts to the text `"null"` and is matched like any other value.
///
/// # Errors
/// - [`ProfilerError::ColumnNotFound`] when `column` is not in the snapshot
/// - [`ProfilerError::InvalidPattern`] when `pattern` does not compile
pub fn check_conformity(
    snapshot: &TableSnapshot,
    column: &str,
    pattern: &str,
) -> Result<ConformityReport> {
    let index = snapshot
        .column_index(column)
        .ok_or_else(|| ProfilerError::column_not_found(column))?;

    // Wrapping in a non-capturing group preserves the pattern's own
    // semantics (alternations included) while pinning it to the start.
    let anchored = Regex::new(&format!("^(?:{pattern})"))
        .map_err(|e| ProfilerError::invalid_pattern(pattern, e))?;

    let total_rows = snapshot.row_count();
    let mut conforming: usize = 0;
    let mut non_conforming_rows = Vec::new();

    for row in &snapshot.rows {
        let value_text = row
            .get(index)
            .map_or_else(|| CellValue::Null.as_text(), CellValue::as_text);

        if anchored.is_match(&value_text) {
            conforming += 1;
        } else {
            non_conforming_rows.push(row.clone());
        }
    }

    let conformity_pct = if total_rows == 0 {
        0.0
    } else {
        conforming as f64 / total_rows as f64 * 100.0
    };

    Ok(ConformityReport {
        column_name: column.to_string(),
        pattern: pattern.to_string(),
        conformity_pct,
        non_conforming_rows,
    })
}
