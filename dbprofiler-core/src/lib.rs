//! Core data model and quality computation engine for dbprofiler.
//!
//! This crate holds everything below the presentation surface: the cell
//! value and snapshot model, the catalog source abstraction with its
//! PostgreSQL implementation, the pure quality computation functions
//! (metrics, conformity, distribution), deterministic CSV export, and the
//! profiling session that ties them together.
//!
//! # Architecture
//! - Catalog access goes through the object-safe [`catalog::CatalogSource`]
//!   trait; the session never talks to a driver directly.
//! - All quality computations are pure functions over a materialized
//!   [`models::TableSnapshot`]; data flows one way, snapshot to report.
//! - Errors are typed and fail fast; zero-row and zero-column inputs are
//!   explicit value policies, never errors.

pub mod catalog;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod quality;
pub mod session;

// Re-export commonly used types
pub use error::{ProfilerError, Result, redact_database_url};
pub use export::{snapshot_to_csv, write_csv};
pub use logging::init_logging;
pub use models::{
    CellValue, ColumnDescriptor, Grant, GrantSummary, TableKind, TableSnapshot, summarize_grants,
};
pub use quality::{
    ColumnNullCount, ConformityReport, DEFAULT_BIN_COUNT, DensityPoint, DistributionSummary,
    HistogramBin, QualitySummary, check_conformity, compute_quality_summary,
    summarize_distribution,
};
pub use session::{ProfileSession, TableProfile};

#[cfg(feature = "postgresql")]
pub use catalog::postgres::PostgresCatalog;
