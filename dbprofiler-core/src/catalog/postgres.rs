//! PostgreSQL catalog source.
//!
//! Thin wrapper over the information-schema and pg_catalog views plus a
//! full-row fetch. Identifier interpolation is double-quote escaped; every
//! user-value predicate is a bind parameter.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::catalog::CatalogSource;
use crate::error::{ProfilerError, Result, redact_database_url};
use crate::models::{CellValue, ColumnDescriptor, Grant, TableKind, TableSnapshot};

/// Connection timeout applied when opening the session handle.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL implementation of [`CatalogSource`].
///
/// Holds one shared connection handle for the lifetime of a session:
/// opened by [`PostgresCatalog::connect`], released by the trait's `close`.
/// There is no retry policy; a connection failure surfaces immediately and
/// the caller reconnects explicitly.
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Opens a catalog session against `url`.
    ///
    /// # Errors
    /// Returns [`ProfilerError::Connection`] when the database is
    /// unreachable or authentication fails, and
    /// [`ProfilerError::Configuration`] for a non-PostgreSQL URL. Error
    /// text never contains credentials.
    pub async fn connect(url: &str) -> Result<Self> {
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(ProfilerError::configuration(
                "Unrecognized database connection string format; expected postgres:// or postgresql://",
            ));
        }

        tracing::info!("Connecting to {}", redact_database_url(url));

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| {
                ProfilerError::connection_failed(
                    format!("Could not connect to {}", redact_database_url(url)),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Tests the connection without touching any catalog state.
    ///
    /// # Errors
    /// Returns [`ProfilerError::Connection`] when the round trip fails.
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ProfilerError::connection_failed("Connection test failed", e))?;
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for PostgresCatalog {
    async fn list_schemas(&self) -> Result<Vec<String>> {
        tracing::debug!("Enumerating database schemas");

        let query = r#"
            SELECT schema_name
            FROM information_schema.schemata
            WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
            ORDER BY schema_name
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ProfilerError::metadata("Failed to enumerate schemas", e))?;

        let mut schemas = Vec::with_capacity(rows.len());
        for row in rows {
            let schema_name: String = row
                .try_get("schema_name")
                .map_err(|e| ProfilerError::metadata("Failed to parse schema name", e))?;
            schemas.push(schema_name);
        }

        tracing::info!("Found {} schemas", schemas.len());
        Ok(schemas)
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<(String, TableKind)>> {
        tracing::debug!("Enumerating tables in schema '{}'", schema);

        let query = r#"
            SELECT table_name, table_type
            FROM information_schema.tables
            WHERE table_schema = $1
            ORDER BY table_name
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ProfilerError::metadata(
                    format!("Failed to enumerate tables in schema '{schema}'"),
                    e,
                )
            })?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("table_name")
                .map_err(|e| ProfilerError::metadata("Failed to parse table name", e))?;
            let table_type: String = row
                .try_get("table_type")
                .map_err(|e| ProfilerError::metadata("Failed to parse table type", e))?;
            tables.push((name, TableKind::from_catalog(&table_type)));
        }

        Ok(tables)
    }

    async fn column_descriptors(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        tracing::debug!("Collecting column metadata for {}.{}", schema, table);

        // Comments live in pg_description, keyed by the relation oid and
        // the column's ordinal position.
        let query = r#"
            SELECT
                c.column_name,
                c.is_nullable,
                c.data_type,
                d.description AS comment
            FROM information_schema.columns c
            LEFT JOIN pg_catalog.pg_class rel
                ON rel.relname = c.table_name
               AND rel.relnamespace = (
                    SELECT oid FROM pg_catalog.pg_namespace WHERE nspname = c.table_schema
               )
            LEFT JOIN pg_catalog.pg_description d
                ON d.objoid = rel.oid
               AND d.objsubid = c.ordinal_position
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ProfilerError::metadata(
                    format!("Failed to collect columns for '{schema}.{table}'"),
                    e,
                )
            })?;

        let mut descriptors = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("column_name")
                .map_err(|e| ProfilerError::metadata("Failed to parse column name", e))?;
            let is_nullable: String = row
                .try_get("is_nullable")
                .map_err(|e| ProfilerError::metadata("Failed to parse nullability", e))?;
            let data_type: String = row
                .try_get("data_type")
                .map_err(|e| ProfilerError::metadata("Failed to parse data type", e))?;
            let comment: Option<String> = row
                .try_get("comment")
                .map_err(|e| ProfilerError::metadata("Failed to parse column comment", e))?;

            descriptors.push(ColumnDescriptor {
                name,
                is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
                data_type,
                comment,
                is_primary_key: false,
            });
        }

        Ok(descriptors)
    }

    async fn primary_key_columns(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ProfilerError::metadata(
                    format!("Failed to collect primary key for '{schema}.{table}'"),
                    e,
                )
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("column_name")
                .map_err(|e| ProfilerError::metadata("Failed to parse key column name", e))?;
            columns.push(name);
        }

        tracing::debug!(
            "Primary key of {}.{}: {:?}",
            schema,
            table,
            columns
        );
        Ok(columns)
    }

    async fn grants(&self, schema: &str, table: &str) -> Result<Vec<Grant>> {
        let query = r#"
            SELECT grantee, privilege_type
            FROM information_schema.role_table_grants
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY grantee, privilege_type
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ProfilerError::metadata(
                    format!("Failed to collect grants for '{schema}.{table}'"),
                    e,
                )
            })?;

        let mut grants = Vec::with_capacity(rows.len());
        for row in rows {
            let grantee: String = row
                .try_get("grantee")
                .map_err(|e| ProfilerError::metadata("Failed to parse grantee", e))?;
            let privilege: String = row
                .try_get("privilege_type")
                .map_err(|e| ProfilerError::metadata("Failed to parse privilege type", e))?;
            grants.push(Grant { grantee, privilege });
        }

        Ok(grants)
    }

    async fn fetch_all_rows(
        &self,
        schema: &str,
        table: &str,
        columns: &[ColumnDescriptor],
    ) -> Result<TableSnapshot> {
        let start = std::time::Instant::now();

        // row_to_json gives every column as a JSON object keyed by name;
        // decoding is then driven by the declared column order.
        let query = format!(
            "SELECT row_to_json(t.*) AS row_data FROM {}.{} t",
            quote_ident(schema),
            quote_ident(table)
        );

        tracing::debug!("Fetching all rows of {}.{}", schema, table);

        let json_rows: Vec<JsonValue> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ProfilerError::metadata(
                    format!("Failed to fetch rows from '{schema}.{table}'"),
                    e,
                )
            })?;

        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let rows: Vec<Vec<CellValue>> = json_rows
            .iter()
            .map(|json_row| {
                let object = json_row.as_object();
                columns
                    .iter()
                    .map(|descriptor| {
                        object
                            .and_then(|map| map.get(&descriptor.name))
                            .map_or(CellValue::Null, |value| {
                                cell_from_json(value, &descriptor.data_type)
                            })
                    })
                    .collect()
            })
            .collect();

        tracing::info!(
            "Fetched {} rows x {} columns from {}.{} in {:.2}s",
            rows.len(),
            column_names.len(),
            schema,
            table,
            start.elapsed().as_secs_f64()
        );

        Ok(TableSnapshot::new(schema, table, column_names, rows))
    }

    async fn close(&self) {
        tracing::debug!("Closing catalog connection");
        self.pool.close().await;
    }
}

/// Escapes an identifier for safe interpolation into a query.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts one JSON cell into a typed cell value.
///
/// The declared column type steers temporal parsing; a temporal string
/// that does not parse degrades to `Text` rather than erroring.
fn cell_from_json(value: &JsonValue, data_type: &str) -> CellValue {
    match value {
        JsonValue::Null => CellValue::Null,
        JsonValue::Bool(b) => CellValue::Boolean(*b),
        JsonValue::Number(n) => n
            .as_f64()
            .map_or_else(|| CellValue::Text(n.to_string()), CellValue::Number),
        JsonValue::String(s) => {
            if is_temporal_type(data_type) {
                parse_temporal(s).map_or_else(|| CellValue::Text(s.clone()), CellValue::Temporal)
            } else {
                CellValue::Text(s.clone())
            }
        }
        // Arrays and composite values profile by their serialized text
        other => CellValue::Text(other.to_string()),
    }
}

/// Whether a declared type names a date/time column.
fn is_temporal_type(data_type: &str) -> bool {
    let lower = data_type.to_ascii_lowercase();
    lower.contains("timestamp") || lower.contains("date") || lower.starts_with("time")
}

/// Parses the timestamp renderings `row_to_json` produces.
fn parse_temporal(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn test_cell_from_json_scalars() {
        assert_eq!(cell_from_json(&json!(null), "text"), CellValue::Null);
        assert_eq!(
            cell_from_json(&json!(true), "boolean"),
            CellValue::Boolean(true)
        );
        assert_eq!(
            cell_from_json(&json!(42), "integer"),
            CellValue::Number(42.0)
        );
        assert_eq!(
            cell_from_json(&json!("hello"), "text"),
            CellValue::Text("hello".to_string())
        );
    }

    #[test]
    fn test_cell_from_json_temporal() {
        let cell = cell_from_json(&json!("2024-03-01T12:30:00"), "timestamp without time zone");
        assert!(matches!(cell, CellValue::Temporal(_)));

        let cell = cell_from_json(&json!("2024-03-01"), "date");
        assert!(matches!(cell, CellValue::Temporal(_)));

        // Unparseable temporal text degrades to Text
        let cell = cell_from_json(&json!("not-a-date"), "date");
        assert_eq!(cell, CellValue::Text("not-a-date".to_string()));
    }

    #[test]
    fn test_cell_from_json_date_string_in_text_column() {
        // A date-looking string in a text column stays text
        let cell = cell_from_json(&json!("2024-03-01"), "text");
        assert_eq!(cell, CellValue::Text("2024-03-01".to_string()));
    }

    #[test]
    fn test_cell_from_json_composite() {
        let cell = cell_from_json(&json!([1, 2]), "ARRAY");
        assert_eq!(cell, CellValue::Text("[1,2]".to_string()));
    }

    #[test]
    fn test_is_temporal_type() {
        assert!(is_temporal_type("timestamp with time zone"));
        assert!(is_temporal_type("timestamp without time zone"));
        assert!(is_temporal_type("date"));
        assert!(is_temporal_type("time without time zone"));
        assert!(!is_temporal_type("text"));
        assert!(!is_temporal_type("integer"));
    }

    #[test]
    fn test_parse_temporal_formats() {
        assert!(parse_temporal("2024-03-01T12:30:00+00:00").is_some());
        assert!(parse_temporal("2024-03-01T12:30:00.123456").is_some());
        assert!(parse_temporal("2024-03-01").is_some());
        assert!(parse_temporal("03/01/2024").is_none());
    }
}
