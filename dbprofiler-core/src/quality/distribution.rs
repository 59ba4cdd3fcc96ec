//! Distribution summaries for numeric columns.
//!
//! Produces an equal-width histogram over the observed range of a numeric
//! column plus a Gaussian kernel density estimate for overlay rendering.
//! Output is consumed purely for display; nothing downstream depends on it.

use serde::{Deserialize, Serialize};

use crate::error::{ProfilerError, Result};
use crate::models::{CellValue, TableSnapshot};

/// Default number of histogram bins.
pub const DEFAULT_BIN_COUNT: usize = 30;

/// Number of evaluation points for the density curve.
const DENSITY_POINTS: usize = 200;

/// One histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge
    pub lower: f64,
    /// Upper edge; inclusive only for the final bin
    pub upper: f64,
    /// Number of values falling in the bin
    pub count: u64,
}

/// One point of the smoothed density curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    /// Evaluation position
    pub x: f64,
    /// Estimated density at `x`
    pub density: f64,
}

/// Histogram and density summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Column the summary describes
    pub column_name: String,
    /// Number of values that were binned (non-null, finite)
    pub sample_count: u64,
    /// Observed minimum; 0.0 when no values exist
    pub min: f64,
    /// Observed maximum; 0.0 when no values exist
    pub max: f64,
    /// Equal-width bins spanning `[min, max]`
    pub bins: Vec<HistogramBin>,
    /// Smoothed density estimate across `[min, max]`; empty for degenerate
    /// distributions
    pub density: Vec<DensityPoint>,
}

/// Summarizes the distribution of a numeric column.
///
/// NULL cells are excluded from binning. Bin counts always sum to
/// `sample_count`. Degenerate inputs resolve without dividing by zero: a
/// column with no values yields empty bins, a constant column yields a
/// single zero-width bin, and the density curve is omitted whenever the
/// spread is zero.
///
/// # Errors
/// - [`ProfilerError::ColumnNotFound`] when `column` is not in the snapshot
/// - [`ProfilerError::NonNumericColumn`] when a non-null cell is not numeric
pub fn summarize_distribution(
    snapshot: &TableSnapshot,
    column: &str,
    bin_count: usize,
) -> Result<DistributionSummary> {
    let index = snapshot
        .column_index(column)
        .ok_or_else(|| ProfilerError::column_not_found(column))?;

    let mut values: Vec<f64> = Vec::with_capacity(snapshot.row_count());
    for row in &snapshot.rows {
        match row.get(index) {
            None | Some(CellValue::Null) => {}
            Some(CellValue::Number(n)) => {
                if n.is_finite() {
                    values.push(*n);
                }
            }
            Some(_) => return Err(ProfilerError::non_numeric_column(column)),
        }
    }

    let bin_count = bin_count.max(1);
    let sample_count = values.len() as u64;

    if values.is_empty() {
        return Ok(DistributionSummary {
            column_name: column.to_string(),
            sample_count: 0,
            min: 0.0,
            max: 0.0,
            bins: Vec::new(),
            density: Vec::new(),
        });
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < f64::EPSILON {
        // Constant column: one zero-width bin holding every value
        return Ok(DistributionSummary {
            column_name: column.to_string(),
            sample_count,
            min,
            max,
            bins: vec![HistogramBin {
                lower: min,
                upper: max,
                count: sample_count,
            }],
            density: Vec::new(),
        });
    }

    let width = (max - min) / bin_count as f64;
    let mut counts = vec![0_u64; bin_count];
    for &value in &values {
        // Values on the top edge land in the final bin
        let position = ((value - min) / width) as usize;
        let bin = position.min(bin_count - 1);
        counts[bin] += 1;
    }

    let bins = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect();

    let density = estimate_density(&values, min, max);

    Ok(DistributionSummary {
        column_name: column.to_string(),
        sample_count,
        min,
        max,
        bins,
        density,
    })
}

/// Gaussian kernel density estimate across `[min, max]`.
///
/// Bandwidth follows Silverman's rule of thumb. Returns an empty curve when
/// the bandwidth degenerates (zero spread).
fn estimate_density(values: &[f64], min: f64, max: f64) -> Vec<DensityPoint> {
    let n = values.len() as f64;
    let (_, std_dev) = mean_and_std_dev(values);

    let bandwidth = 1.06 * std_dev * n.powf(-0.2);
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        return Vec::new();
    }

    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let step = (max - min) / (DENSITY_POINTS - 1) as f64;

    (0..DENSITY_POINTS)
        .map(|i| {
            let x = min + step * i as f64;
            let density = values
                .iter()
                .map(|&v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            DensityPoint { x, density }
        })
        .collect()
}

/// Mean and population standard deviation.
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn snapshot(column: &str, values: Vec<CellValue>) -> TableSnapshot {
        TableSnapshot::new(
            "public",
            "test_table",
            vec![column.to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }

    #[test]
    fn test_bin_counts_sum_to_non_null_count() {
        let values: Vec<CellValue> = (0..97)
            .map(|i| number(f64::from(i)))
            .chain(std::iter::repeat_n(CellValue::Null, 5))
            .collect();
        let snap = snapshot("v", values);

        let summary = summarize_distribution(&snap, "v", DEFAULT_BIN_COUNT).unwrap();

        assert_eq!(summary.sample_count, 97);
        assert_eq!(summary.bins.len(), DEFAULT_BIN_COUNT);
        let total: u64 = summary.bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 97);
    }

    #[test]
    fn test_max_value_lands_in_final_bin() {
        let snap = snapshot("v", vec![number(0.0), number(10.0)]);

        let summary = summarize_distribution(&snap, "v", 10).unwrap();

        assert_eq!(summary.bins.last().unwrap().count, 1);
        let total: u64 = summary.bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_bin_edges_span_min_to_max() {
        let snap = snapshot("v", vec![number(-5.0), number(15.0), number(3.0)]);

        let summary = summarize_distribution(&snap, "v", 4).unwrap();

        assert_eq!(summary.min, -5.0);
        assert_eq!(summary.max, 15.0);
        assert!((summary.bins[0].lower - -5.0).abs() < 1e-9);
        assert!((summary.bins[3].upper - 15.0).abs() < 1e-9);
        // Adjacent bins share their edge
        assert!((summary.bins[0].upper - summary.bins[1].lower).abs() < 1e-9);
    }

    #[test]
    fn test_constant_column_single_bin() {
        let snap = snapshot("v", vec![number(7.0); 4]);

        let summary = summarize_distribution(&snap, "v", DEFAULT_BIN_COUNT).unwrap();

        assert_eq!(summary.bins.len(), 1);
        assert_eq!(summary.bins[0].count, 4);
        assert_eq!(summary.bins[0].lower, 7.0);
        assert_eq!(summary.bins[0].upper, 7.0);
        assert!(summary.density.is_empty());
    }

    #[test]
    fn test_empty_column() {
        let snap = snapshot("v", vec![CellValue::Null, CellValue::Null]);

        let summary = summarize_distribution(&snap, "v", DEFAULT_BIN_COUNT).unwrap();

        assert_eq!(summary.sample_count, 0);
        assert!(summary.bins.is_empty());
        assert!(summary.density.is_empty());
    }

    #[test]
    fn test_non_numeric_column_rejected() {
        let snap = snapshot(
            "v",
            vec![number(1.0), CellValue::Text("two".to_string())],
        );

        let err = summarize_distribution(&snap, "v", DEFAULT_BIN_COUNT).unwrap_err();
        assert!(matches!(err, ProfilerError::NonNumericColumn { .. }));
    }

    #[test]
    fn test_boolean_column_rejected() {
        let snap = snapshot("v", vec![CellValue::Boolean(true)]);

        let err = summarize_distribution(&snap, "v", DEFAULT_BIN_COUNT).unwrap_err();
        assert!(matches!(err, ProfilerError::NonNumericColumn { .. }));
    }

    #[test]
    fn test_column_not_found() {
        let snap = snapshot("v", vec![number(1.0)]);

        let err = summarize_distribution(&snap, "missing", DEFAULT_BIN_COUNT).unwrap_err();
        assert!(matches!(err, ProfilerError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_density_curve_is_finite_and_positive() {
        let snap = snapshot(
            "v",
            vec![number(1.0), number(2.0), number(2.5), number(4.0), number(8.0)],
        );

        let summary = summarize_distribution(&snap, "v", 10).unwrap();

        assert_eq!(summary.density.len(), 200);
        assert!(summary.density.iter().all(|p| p.density.is_finite()));
        assert!(summary.density.iter().all(|p| p.density >= 0.0));
        assert_eq!(summary.density.first().unwrap().x, 1.0);
        assert!((summary.density.last().unwrap().x - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_density_peaks_near_cluster() {
        // Values cluster at 2; density at 2 should exceed density at 8
        let snap = snapshot(
            "v",
            vec![number(2.0), number(2.1), number(1.9), number(2.0), number(8.0)],
        );

        let summary = summarize_distribution(&snap, "v", 10).unwrap();

        let density_at = |target: f64| {
            summary
                .density
                .iter()
                .min_by(|a, b| {
                    (a.x - target)
                        .abs()
                        .partial_cmp(&(b.x - target).abs())
                        .unwrap()
                })
                .unwrap()
                .density
        };
        assert!(density_at(2.0) > density_at(6.0));
    }

    #[test]
    fn test_zero_bin_count_clamped() {
        let snap = snapshot("v", vec![number(1.0), number(2.0)]);

        let summary = summarize_distribution(&snap, "v", 0).unwrap();
        assert_eq!(summary.bins.len(), 1);
        assert_eq!(summary.bins[0].count, 2);
    }
}
