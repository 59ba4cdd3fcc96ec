//! Catalog and data-source access.
//!
//! Defines the object-safe trait the profiling session talks to. Adapters
//! wrap a database's information-schema/catalog views and a full-row fetch;
//! everything downstream of the trait is backend-agnostic.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ColumnDescriptor, Grant, TableKind, TableSnapshot};

/// Unified interface over a database catalog and its row data.
///
/// All operations are read-only. Implementations must never log or embed
/// credentials in errors.
///
/// # Object Safety
/// The trait is object-safe, allowing dynamic dispatch through
/// `Box<dyn CatalogSource>`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Enumerates user schemas, sorted by name.
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// Enumerates tables and views of one schema, with their kind.
    async fn list_tables(&self, schema: &str) -> Result<Vec<(String, TableKind)>>;

    /// Column metadata of one relation, in ordinal order.
    ///
    /// The returned descriptors carry `is_primary_key: false`; the caller
    /// merges the primary-key column set.
    async fn column_descriptors(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>>;

    /// Names of the primary-key columns of one relation, in key order.
    /// Empty when no primary key is declared.
    async fn primary_key_columns(&self, schema: &str, table: &str) -> Result<Vec<String>>;

    /// Role grants on one relation, verbatim from the catalog.
    async fn grants(&self, schema: &str, table: &str) -> Result<Vec<Grant>>;

    /// Fetches the full row set of one relation into a snapshot whose
    /// column order follows `columns`.
    async fn fetch_all_rows(
        &self,
        schema: &str,
        table: &str,
        columns: &[ColumnDescriptor],
    ) -> Result<TableSnapshot>;

    /// Releases the underlying connection. No-op for sources without one.
    async fn close(&self) {}
}

#[cfg(feature = "postgresql")]
pub mod postgres;
