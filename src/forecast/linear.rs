//! Learned linear regression forecaster

use super::{CongestionForecast, Forecaster};
use crate::error::{FlowcastError, Result};
use crate::features::FeatureVector;
use ndarray::{Array1, Array2};
use tracing::info;

/// Linear regression over the engineered feature columns, solved through the
/// normal equations with Cholesky decomposition. A small ridge penalty keeps
/// the system well conditioned when calendar columns are collinear (constant
/// weekend flag in a short batch, for example).
#[derive(Debug, Clone)]
pub struct LinearForecaster {
    ridge: f64,
    weights: Option<Array1<f64>>,
    residual_std: f64,
}

impl Default for LinearForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearForecaster {
    pub fn new() -> Self {
        Self {
            ridge: 1e-6,
            weights: None,
            residual_std: 0.0,
        }
    }

    /// Override the ridge penalty
    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge.max(0.0);
        self
    }

    /// Feature matrix with a leading intercept column
    fn design_matrix(rows: &[FeatureVector]) -> Result<Array2<f64>> {
        let n = rows.len();
        let width = rows
            .first()
            .map(|r| r.numeric_row().len() + 1)
            .ok_or_else(|| {
                FlowcastError::ValidationError("cannot fit on an empty training set".to_string())
            })?;

        let mut data = Vec::with_capacity(n * width);
        for row in rows {
            let numeric = row.numeric_row();
            if numeric.len() + 1 != width {
                return Err(FlowcastError::ShapeError {
                    expected: format!("{} feature columns", width - 1),
                    actual: format!("{}", numeric.len()),
                });
            }
            data.push(1.0);
            data.extend(numeric);
        }

        Ok(Array2::from_shape_vec((n, width), data)?)
    }
}

impl Forecaster for LinearForecaster {
    fn fit(&mut self, train: &[FeatureVector]) -> Result<()> {
        let x = Self::design_matrix(train)?;
        let y = Array1::from_iter(train.iter().map(|r| r.target));

        let mut xtx = x.t().dot(&x);
        let xty = x.t().dot(&y);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.ridge;
        }

        let weights = solve_spd(&xtx, &xty).ok_or_else(|| {
            FlowcastError::ValidationError(
                "normal equations are singular; training data carries no usable signal"
                    .to_string(),
            )
        })?;

        let residuals = &y - &x.dot(&weights);
        self.residual_std =
            (residuals.iter().map(|r| r * r).sum::<f64>() / train.len() as f64).sqrt();
        info!(
            n_samples = train.len(),
            n_features = x.ncols() - 1,
            residual_std = self.residual_std,
            "linear forecaster fitted"
        );
        self.weights = Some(weights);
        Ok(())
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<CongestionForecast>> {
        let weights = self.weights.as_ref().ok_or(FlowcastError::ModelNotFitted)?;
        let x = Self::design_matrix(rows)?;
        if x.ncols() != weights.len() {
            return Err(FlowcastError::ShapeError {
                expected: format!("{} columns", weights.len()),
                actual: format!("{}", x.ncols()),
            });
        }

        let predictions = x.dot(weights);
        let half_width = 1.96 * self.residual_std;

        Ok(rows
            .iter()
            .zip(predictions)
            .map(|(row, p)| CongestionForecast {
                location_id: row.location_id.clone(),
                timestamp: row.timestamp,
                predicted_vehicle_count: p,
                prediction_interval: Some((p - half_width, p + half_width)),
            })
            .collect())
    }
}

/// Solve a symmetric positive-definite system via Cholesky, retrying once
/// with diagonal jitter if the matrix is not positive definite.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky_solve(a, b).or_else(|| {
        let n = a.nrows();
        let jitter = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0) / n as f64;
        let mut a_reg = a.clone();
        for i in 0..n {
            a_reg[[i, i]] += jitter;
        }
        cholesky_solve(&a_reg, b)
    })
}

fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}
