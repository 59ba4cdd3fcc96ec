//! Data quality computation engine.
//!
//! Pure functions over a materialized [`TableSnapshot`](crate::models::TableSnapshot):
//! - **Metrics**: null/blank counts, completeness, primary-key uniqueness,
//!   duplicate rows
//! - **Conformity**: regex validation of one column against a user pattern
//! - **Distribution**: histogram and density summary of a numeric column
//!
//! Every function is deterministic, side-effect free, and recomputed fresh
//! per invocation; zero-row and zero-column inputs resolve to explicit
//! values, never to errors or NaN.

mod conformity;
mod distribution;
mod metrics;

pub use conformity::{ConformityReport, check_conformity};
pub use distribution::{
    DEFAULT_BIN_COUNT, DensityPoint, DistributionSummary, HistogramBin, summarize_distribution,
};
pub use metrics::{ColumnNullCount, QualitySummary, compute_quality_summary};
