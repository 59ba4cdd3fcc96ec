//! Quality metrics over a table snapshot.
//!
//! Computes per-column null/blank counts, the completeness percentage,
//! primary-key uniqueness, and the duplicate-row count.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{CellValue, TableSnapshot};

/// Null/blank count for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNullCount {
    /// Column name
    pub column_name: String,
    /// Count of cells that are NULL or blank after trimming
    pub null_blank_count: u64,
}

/// Aggregate quality metrics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    /// Number of rows in the snapshot
    pub total_rows: u64,
    /// Number of columns in the snapshot
    pub total_columns: u64,
    /// `total_rows × total_columns`
    pub total_cells: u64,
    /// Filled-cell percentage, 0.0 when the snapshot has no cells
    pub completeness_pct: f64,
    /// Primary-key uniqueness percentage; absent when no primary key is
    /// declared (distinct from 0% unique)
    pub pk_uniqueness_pct: Option<f64>,
    /// Rows that exactly duplicate an earlier row, counting every repeat
    /// beyond the first occurrence
    pub duplicate_row_count: u64,
    /// Per-column null/blank breakdown, in column order
    pub column_counts: Vec<ColumnNullCount>,
}

/// Computes the quality summary for a snapshot.
///
/// A cell counts as missing when it is NULL or its text conversion is empty
/// after trimming. Primary-key uniqueness is computed only when at least one
/// declared PK column exists in the snapshot; declared PK names absent from
/// the snapshot are ignored. Pure function, no side effects.
pub fn compute_quality_summary(snapshot: &TableSnapshot, pk_columns: &[String]) -> QualitySummary {
    let total_rows = snapshot.row_count() as u64;
    let total_columns = snapshot.column_count() as u64;
    let total_cells = total_rows * total_columns;

    // Per-column null/blank counts
    let mut column_counts = Vec::with_capacity(snapshot.columns.len());
    let mut total_missing: u64 = 0;

    for (index, name) in snapshot.columns.iter().enumerate() {
        let mut null_blank_count: u64 = 0;
        for row in &snapshot.rows {
            if row.get(index).is_some_and(CellValue::is_missing) {
                null_blank_count += 1;
            }
        }
        total_missing += null_blank_count;
        column_counts.push(ColumnNullCount {
            column_name: name.clone(),
            null_blank_count,
        });
    }

    // Division by zero guarded explicitly: an empty snapshot is 0% complete
    let completeness_pct = if total_cells == 0 {
        0.0
    } else {
        (total_cells - total_missing) as f64 / total_cells as f64 * 100.0
    };

    let pk_uniqueness_pct = compute_pk_uniqueness(snapshot, pk_columns, total_rows);
    let duplicate_row_count = count_duplicate_rows(snapshot);

    QualitySummary {
        total_rows,
        total_columns,
        total_cells,
        completeness_pct,
        pk_uniqueness_pct,
        duplicate_row_count,
        column_counts,
    }
}

/// Primary-key uniqueness over null-free PK tuples.
///
/// Returns `None` when no declared PK column exists in the snapshot, so
/// callers can distinguish "no PK declared" from "0% unique".
fn compute_pk_uniqueness(
    snapshot: &TableSnapshot,
    pk_columns: &[String],
    total_rows: u64,
) -> Option<f64> {
    let pk_indexes: Vec<usize> = pk_columns
        .iter()
        .filter_map(|name| snapshot.column_index(name))
        .collect();

    if pk_indexes.is_empty() {
        return None;
    }
    if total_rows == 0 {
        return Some(0.0);
    }

    let mut unique_tuples: HashSet<Vec<String>> = HashSet::new();
    for row in &snapshot.rows {
        let mut tuple = Vec::with_capacity(pk_indexes.len());
        let mut has_null = false;
        for &index in &pk_indexes {
            match row.get(index) {
                Some(value) if !value.is_null() => tuple.push(value.dedup_key()),
                _ => {
                    has_null = true;
                    break;
                }
            }
        }
        // Rows with any NULL PK component are dropped from the projection
        if !has_null {
            unique_tuples.insert(tuple);
        }
    }

    Some(unique_tuples.len() as f64 / total_rows as f64 * 100.0)
}

/// Counts rows that exactly duplicate an earlier row across all columns.
fn count_duplicate_rows(snapshot: &TableSnapshot) -> u64 {
    let mut seen_rows: HashSet<Vec<String>> = HashSet::new();
    let mut duplicate_count: u64 = 0;

    for row in &snapshot.rows {
        let key: Vec<String> = row.iter().map(|value| value.dedup_key()).collect();
        if !seen_rows.insert(key) {
            duplicate_count += 1;
        }
    }

    duplicate_count
}
