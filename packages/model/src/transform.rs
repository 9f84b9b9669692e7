//! Variance-stabilizing transform and min-max scaling.
//!
//! Counts and demographic totals are heavily right skewed, so every value
//! goes through `ln(1 + x)` before being scaled to `[0, 1]` per feature.
//! The scaler is fit once and persisted with the model so that training
//! and serving apply exactly the same mapping.

use serde::{Deserialize, Serialize};

/// Fitted `log1p` + min-max transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMinMaxScaler {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl LogMinMaxScaler {
    /// Fits per-column minimum and maximum of the log-transformed rows.
    ///
    /// All rows must have the same length.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];

        for row in rows {
            for (col, &value) in row.iter().enumerate() {
                let value = log1p(value);
                min[col] = min[col].min(value);
                max[col] = max[col].max(value);
            }
        }

        Self { min, max }
    }

    /// Number of columns the scaler was fit on.
    #[must_use]
    pub fn width(&self) -> usize {
        self.min.len()
    }

    /// Transforms one row. Constant columns map to `0`; values outside the
    /// fitted range are not clipped.
    #[must_use]
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.min.iter().zip(&self.max))
            .map(|(&value, (&min, &max))| {
                let range = max - min;
                if range > 0.0 {
                    (log1p(value) - min) / range
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Transforms every row.
    #[must_use]
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

/// `ln(1 + x)`, with negative inputs floored at zero.
fn log1p(value: f64) -> f64 {
    value.max(0.0).ln_1p()
}
