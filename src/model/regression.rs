use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for the coordinate-descent trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerOptions {
    /// L2 penalty on the weights (the bias is not penalized)
    pub l2: f64,
    pub max_epochs: usize,
    /// Stop once no weight moves further than this within an epoch
    pub tolerance: f64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            l2: 1e-3,
            max_epochs: 200,
            tolerance: 1e-6,
        }
    }
}

/// Fitted linear model: `score = weights · features + bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }
}

/// Linear regression trained by cyclic coordinate descent on the squared
/// loss with an L2 penalty:
///
/// ```text
/// minimize (1/2n) * sum((y - Xw - b)^2) + (l2/2) * |w|^2
/// ```
///
/// Each coordinate update is solved exactly against the running residual, so
/// an epoch costs one pass over the matrix.
pub struct CoordinateDescentRegressor {
    options: TrainerOptions,
}

impl CoordinateDescentRegressor {
    pub const NAME: &'static str = "CoordinateDescentRegression";

    pub fn new(options: TrainerOptions) -> Self {
        Self { options }
    }

    /// Fit against row-major `features` and matching `labels`.
    /// Every row must have the same width.
    pub fn fit(&self, features: &[Vec<f64>], labels: &[f64]) -> LinearModel {
        let n = labels.len();
        let width = features.first().map_or(0, Vec::len);
        if n == 0 {
            return LinearModel {
                weights: vec![0.0; width],
                bias: 0.0,
            };
        }

        let bias = labels.iter().sum::<f64>() / n as f64;
        let mut model = LinearModel {
            weights: vec![0.0; width],
            bias,
        };
        let mut residuals: Vec<f64> = labels.iter().map(|y| y - bias).collect();
        let column_sq: Vec<f64> = (0..width)
            .map(|j| features.iter().map(|row| row[j] * row[j]).sum())
            .collect();
        let penalty = n as f64 * self.options.l2;

        let mut epochs = 0;
        while epochs < self.options.max_epochs {
            epochs += 1;
            let mut max_delta: f64 = 0.0;

            for j in 0..width {
                if column_sq[j] == 0.0 {
                    continue;
                }
                let correlation: f64 = features
                    .iter()
                    .zip(&residuals)
                    .map(|(row, r)| row[j] * r)
                    .sum();
                let current = model.weights[j];
                let updated = (correlation + current * column_sq[j]) / (column_sq[j] + penalty);
                let delta = updated - current;
                if delta != 0.0 {
                    for (row, r) in features.iter().zip(residuals.iter_mut()) {
                        *r -= row[j] * delta;
                    }
                    model.weights[j] = updated;
                }
                max_delta = max_delta.max(delta.abs());
            }

            let shift = residuals.iter().sum::<f64>() / n as f64;
            model.bias += shift;
            residuals.iter_mut().for_each(|r| *r -= shift);
            max_delta = max_delta.max(shift.abs());

            if max_delta < self.options.tolerance {
                break;
            }
        }

        debug!(epochs, rows = n, width, "coordinate descent finished");
        model
    }
}

/// Standard regression metrics over a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rows: usize,
    pub mean_absolute_error: f64,
    pub mean_squared_error: f64,
    pub root_mean_squared_error: f64,
    pub r_squared: f64,
}

/// Compare `predictions` with `labels`. An empty set yields all-zero metrics.
pub fn evaluate(predictions: &[f64], labels: &[f64]) -> RegressionMetrics {
    let rows = predictions.len().min(labels.len());
    if rows == 0 {
        return RegressionMetrics {
            rows: 0,
            mean_absolute_error: 0.0,
            mean_squared_error: 0.0,
            root_mean_squared_error: 0.0,
            r_squared: 0.0,
        };
    }
    let n = rows as f64;
    let pairs = || predictions.iter().zip(labels);

    let mae = pairs().map(|(p, y)| (p - y).abs()).sum::<f64>() / n;
    let ss_res = pairs().map(|(p, y)| (p - y).powi(2)).sum::<f64>();
    let mean_label = labels[..rows].iter().sum::<f64>() / n;
    let ss_tot = labels[..rows]
        .iter()
        .map(|y| (y - mean_label).powi(2))
        .sum::<f64>();
    let mse = ss_res / n;
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    RegressionMetrics {
        rows,
        mean_absolute_error: mae,
        mean_squared_error: mse,
        root_mean_squared_error: mse.sqrt(),
        r_squared,
    }
}
