//! Core data model for table profiling.
//!
//! This module defines the cell value union, the materialized table
//! snapshot, and the catalog-derived metadata structures shared by the
//! quality engine and the catalog adapters. All models are serializable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single cell value inside a table snapshot.
///
/// Cells are dynamically typed at the source; this union makes the runtime
/// type explicit. String conversion rules are defined per variant because
/// blank detection, conformity matching, and duplicate keys all operate on
/// the text form of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// SQL NULL
    Null,
    /// Boolean value
    Boolean(bool),
    /// Numeric value (integers are carried as whole-valued floats)
    Number(f64),
    /// Date/time value, normalized to UTC
    Temporal(DateTime<Utc>),
    /// Text value
    Text(String),
}

impl CellValue {
    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Canonical text conversion of the cell.
    ///
    /// NULL converts to the literal `"null"`, booleans to `"true"`/`"false"`,
    /// whole-valued numbers without a fractional part, and temporal values
    /// to RFC 3339.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Null => "null".to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Temporal(t) => t.to_rfc3339(),
            CellValue::Text(s) => s.clone(),
        }
    }

    /// A cell is missing when it is NULL or its text conversion is empty
    /// after trimming leading/trailing whitespace.
    ///
    /// A column of empty strings is therefore not complete even though none
    /// of its values is NULL.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            other => other.as_text().trim().is_empty(),
        }
    }

    /// Returns the numeric value for `Number` cells.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Key used for exact-equality deduplication.
    ///
    /// Variants are tagged so values of different runtime types never
    /// collide; NULL uses a sentinel distinct from the string "null".
    pub(crate) fn dedup_key(&self) -> String {
        match self {
            CellValue::Null => "__NULL__".to_string(),
            CellValue::Boolean(b) => format!("b:{b}"),
            CellValue::Number(n) => format!("n:{}", format_number(*n)),
            CellValue::Temporal(t) => format!("d:{}", t.to_rfc3339()),
            CellValue::Text(s) => format!("s:{s}"),
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
///
/// Keeps integer-typed source columns rendering as integers in text
/// conversions and CSV output.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Kind of relation behind a profiled name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableKind {
    /// Base table
    Table,
    /// View
    View,
}

impl TableKind {
    /// Maps the catalog `table_type` value to a kind.
    ///
    /// Anything that is not a view (`BASE TABLE`, `FOREIGN`, ...) profiles
    /// as a table.
    pub fn from_catalog(table_type: &str) -> Self {
        if table_type.eq_ignore_ascii_case("VIEW") {
            TableKind::View
        } else {
            TableKind::Table
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Table => write!(f, "TABLE"),
            TableKind::View => write!(f, "VIEW"),
        }
    }
}

/// Column metadata joined from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, unique within the table
    pub name: String,
    /// Whether the column accepts NULL
    pub is_nullable: bool,
    /// Declared data type, verbatim from the catalog
    pub data_type: String,
    /// Optional free-text comment
    pub comment: Option<String>,
    /// Whether the column is part of the primary key
    pub is_primary_key: bool,
}

/// A single privilege grant, verbatim from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Grantee identity (role or user)
    pub grantee: String,
    /// Privilege kind (SELECT, INSERT, ...)
    pub privilege: String,
}

/// Grants regrouped by grantee for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummary {
    /// Grantee identity
    pub grantee: String,
    /// Privileges joined into one display value
    pub privileges: String,
}

/// Regroups raw grants by grantee, joining privileges into one display
/// value per grantee.
///
/// Output is sorted by grantee; privileges keep their catalog order within
/// each grantee. This is presentation formatting, not a core invariant.
pub fn summarize_grants(grants: &[Grant]) -> Vec<GrantSummary> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for grant in grants {
        grouped
            .entry(grant.grantee.as_str())
            .or_default()
            .push(grant.privilege.as_str());
    }

    grouped
        .into_iter()
        .map(|(grantee, privileges)| GrantSummary {
            grantee: grantee.to_string(),
            privileges: privileges.join(", "),
        })
        .collect()
}

/// A fully materialized snapshot of one table or view.
///
/// Rows are positionally aligned with `columns`: every row holds exactly
/// `columns.len()` cells, in declaration order. The snapshot is created
/// once per selection and replaced when a different table is selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Schema the relation lives in
    pub schema: String,
    /// Relation name
    pub table: String,
    /// Column names in declaration order
    pub columns: Vec<String>,
    /// Row data, aligned with `columns`
    pub rows: Vec<Vec<CellValue>>,
}

impl TableSnapshot {
    /// Creates a snapshot from pre-aligned rows.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns,
            rows,
        }
    }

    /// Number of rows in the snapshot.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the snapshot.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total cell count (`rows × columns`).
    pub fn total_cells(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.as_str() == name)
    }

    /// Iterates the cells of one column, in row order.
    ///
    /// Returns `None` when the column does not exist.
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = &'a CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cell_text_conversion() {
        assert_eq!(CellValue::Null.as_text(), "null");
        assert_eq!(CellValue::Boolean(true).as_text(), "true");
        assert_eq!(CellValue::Number(42.0).as_text(), "42");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::Text("abc".to_string()).as_text(), "abc");

        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(CellValue::Temporal(ts).as_text().starts_with("2024-03-01T12:00:00"));
    }

    #[test]
    fn test_missing_detection() {
        assert!(CellValue::Null.is_missing());
        assert!(CellValue::Text(String::new()).is_missing());
        assert!(CellValue::Text("   ".to_string()).is_missing());
        assert!(CellValue::Text("\t\n".to_string()).is_missing());
        assert!(!CellValue::Text("x".to_string()).is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
        assert!(!CellValue::Boolean(false).is_missing());
    }

    #[test]
    fn test_dedup_key_distinguishes_null_from_text_null() {
        let null_key = CellValue::Null.dedup_key();
        let text_key = CellValue::Text("null".to_string()).dedup_key();
        assert_ne!(null_key, text_key);
    }

    #[test]
    fn test_dedup_key_distinguishes_types() {
        // "1" as text, 1 as number, true as boolean must all differ
        let keys = [
            CellValue::Text("1".to_string()).dedup_key(),
            CellValue::Number(1.0).dedup_key(),
            CellValue::Text("true".to_string()).dedup_key(),
            CellValue::Boolean(true).dedup_key(),
        ];
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                assert_ne!(keys[i], keys[j]);
            }
        }
    }

    #[test]
    fn test_table_kind_from_catalog() {
        assert_eq!(TableKind::from_catalog("VIEW"), TableKind::View);
        assert_eq!(TableKind::from_catalog("view"), TableKind::View);
        assert_eq!(TableKind::from_catalog("BASE TABLE"), TableKind::Table);
        assert_eq!(TableKind::from_catalog("FOREIGN"), TableKind::Table);
    }

    #[test]
    fn test_summarize_grants_groups_and_sorts() {
        let grants = vec![
            Grant {
                grantee: "reporting".to_string(),
                privilege: "SELECT".to_string(),
            },
            Grant {
                grantee: "app".to_string(),
                privilege: "SELECT".to_string(),
            },
            Grant {
                grantee: "app".to_string(),
                privilege: "INSERT".to_string(),
            },
        ];

        let summaries = summarize_grants(&grants);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].grantee, "app");
        assert_eq!(summaries[0].privileges, "SELECT, INSERT");
        assert_eq!(summaries[1].grantee, "reporting");
        assert_eq!(summaries[1].privileges, "SELECT");
    }

    #[test]
    fn test_summarize_grants_empty() {
        assert!(summarize_grants(&[]).is_empty());
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = TableSnapshot::new(
            "public",
            "users",
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![CellValue::Number(1.0), CellValue::Text("Alice".to_string())],
                vec![CellValue::Number(2.0), CellValue::Null],
            ],
        );

        assert_eq!(snapshot.row_count(), 2);
        assert_eq!(snapshot.column_count(), 2);
        assert_eq!(snapshot.total_cells(), 4);
        assert_eq!(snapshot.column_index("name"), Some(1));
        assert_eq!(snapshot.column_index("missing"), None);

        let names: Vec<String> = snapshot
            .column_values("name")
            .map(|values| values.map(CellValue::as_text).collect())
            .unwrap_or_default();
        assert_eq!(names, vec!["Alice".to_string(), "null".to_string()]);
    }

    #[test]
    fn test_snapshot_empty() {
        let snapshot = TableSnapshot::new("public", "empty", Vec::new(), Vec::new());
        assert_eq!(snapshot.total_cells(), 0);
        assert!(snapshot.column_values("anything").is_none());
    }

    #[test]
    fn test_cell_value_serializes_untagged() {
        let row = vec![
            CellValue::Null,
            CellValue::Boolean(true),
            CellValue::Number(2.5),
            CellValue::Text("x".to_string()),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,true,2.5,"x"]"#);
    }
}
