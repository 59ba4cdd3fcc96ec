//! Profiling session over one catalog source.
//!
//! The session is the explicit, caller-owned replacement for an ambient
//! connection handle: opened on user action, closed on disconnect. It owns
//! the current table selection and its snapshot; selecting another table
//! replaces the snapshot. All computation is synchronous request/response,
//! one operation at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSource;
use crate::error::{ProfilerError, Result};
use crate::export::snapshot_to_csv;
use crate::models::{
    ColumnDescriptor, GrantSummary, TableKind, TableSnapshot, summarize_grants,
};
use crate::quality::{
    ConformityReport, DistributionSummary, QualitySummary, check_conformity,
    compute_quality_summary, summarize_distribution,
};

/// Everything the profiler reports about one table selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProfile {
    /// Schema of the profiled relation
    pub schema: String,
    /// Name of the profiled relation
    pub table: String,
    /// Whether the relation is a table or a view
    pub kind: TableKind,
    /// Column descriptors with primary-key flags merged in
    pub columns: Vec<ColumnDescriptor>,
    /// Declared primary-key column names, in key order
    pub primary_key: Vec<String>,
    /// Grants regrouped by grantee
    pub grants: Vec<GrantSummary>,
    /// Computed quality metrics
    pub quality: QualitySummary,
    /// When the profile was computed
    pub profiled_at: DateTime<Utc>,
}

/// A profiling session bound to one catalog connection.
///
/// Holds at most one active selection; conformity checks, distribution
/// summaries, and CSV export operate on the retained snapshot.
pub struct ProfileSession {
    catalog: Box<dyn CatalogSource>,
    snapshot: Option<TableSnapshot>,
}

impl ProfileSession {
    /// Creates a session over an open catalog source.
    pub fn new(catalog: Box<dyn CatalogSource>) -> Self {
        Self {
            catalog,
            snapshot: None,
        }
    }

    /// Enumerates user schemas.
    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        self.catalog.list_schemas().await
    }

    /// Enumerates tables and views of one schema, with their kind.
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<(String, TableKind)>> {
        self.catalog.list_tables(schema).await
    }

    /// Selects a table or view and computes its full profile.
    ///
    /// Fetches the column descriptors, primary-key set, grants, and the
    /// complete row snapshot, then computes the quality summary. The
    /// snapshot replaces any previous selection and stays available for
    /// conformity checks, distribution summaries, and export.
    ///
    /// # Errors
    /// Returns [`ProfilerError::Metadata`] when the relation does not exist
    /// in the schema or any catalog lookup fails.
    pub async fn select_table(&mut self, schema: &str, table: &str) -> Result<TableProfile> {
        let start = std::time::Instant::now();
        tracing::info!("Profiling {}.{}", schema, table);

        let tables = self.catalog.list_tables(schema).await?;
        let kind = tables
            .iter()
            .find(|(name, _)| name.as_str() == table)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| {
                ProfilerError::metadata_missing(format!(
                    "Relation '{table}' not found in schema '{schema}'"
                ))
            })?;

        let mut columns = self.catalog.column_descriptors(schema, table).await?;
        let primary_key = self.catalog.primary_key_columns(schema, table).await?;
        let grants = self.catalog.grants(schema, table).await?;

        // A column is a PK member iff its name appears in the key set
        for descriptor in &mut columns {
            descriptor.is_primary_key = primary_key.contains(&descriptor.name);
        }

        let snapshot = self.catalog.fetch_all_rows(schema, table, &columns).await?;
        let quality = compute_quality_summary(&snapshot, &primary_key);

        tracing::info!(
            "Profiled {}.{} ({} rows, {} columns, {:.2}% complete) in {:.2}s",
            schema,
            table,
            quality.total_rows,
            quality.total_columns,
            quality.completeness_pct,
            start.elapsed().as_secs_f64()
        );

        let profile = TableProfile {
            schema: schema.to_string(),
            table: table.to_string(),
            kind,
            columns,
            primary_key,
            grants: summarize_grants(&grants),
            quality,
            profiled_at: Utc::now(),
        };

        self.snapshot = Some(snapshot);
        Ok(profile)
    }

    /// The snapshot of the current selection, if any.
    pub fn snapshot(&self) -> Option<&TableSnapshot> {
        self.snapshot.as_ref()
    }

    /// Checks one column of the current snapshot against a regex pattern.
    ///
    /// # Errors
    /// [`ProfilerError::NoSelection`] before any table is selected, plus
    /// the validation errors of
    /// [`check_conformity`](crate::quality::check_conformity).
    pub fn check_conformity(&self, column: &str, pattern: &str) -> Result<ConformityReport> {
        let snapshot = self.current_snapshot()?;
        check_conformity(snapshot, column, pattern)
    }

    /// Summarizes the distribution of one numeric column of the current
    /// snapshot.
    ///
    /// # Errors
    /// [`ProfilerError::NoSelection`] before any table is selected, plus
    /// the validation errors of
    /// [`summarize_distribution`](crate::quality::summarize_distribution).
    pub fn summarize_distribution(
        &self,
        column: &str,
        bin_count: usize,
    ) -> Result<DistributionSummary> {
        let snapshot = self.current_snapshot()?;
        summarize_distribution(snapshot, column, bin_count)
    }

    /// Renders the current snapshot as CSV text.
    ///
    /// # Errors
    /// [`ProfilerError::NoSelection`] before any table is selected.
    pub fn export_csv(&self) -> Result<String> {
        Ok(snapshot_to_csv(self.current_snapshot()?))
    }

    /// Ends the session, releasing the catalog connection.
    pub async fn close(self) {
        self.catalog.close().await;
    }

    fn current_snapshot(&self) -> Result<&TableSnapshot> {
        self.snapshot.as_ref().ok_or(ProfilerError::NoSelection)
    }
}
