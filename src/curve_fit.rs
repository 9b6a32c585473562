//! Least-squares cubic polynomial fitting for lactate curves
//!
//! The fit is solved on a centered and scaled abscissa so that the normal
//! equations stay well conditioned for wattage-sized inputs, then converted
//! back to coefficients of the raw intensity.

use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::{InsufficientDataError, PlannerError, Result};

/// Minimum number of points needed to determine a cubic
pub const MIN_POINTS: usize = 4;

const DEGREE: usize = 3;
const PIVOT_EPSILON: f64 = 1e-12;

/// Fitted cubic `a·x³ + b·x² + c·x + d`
#[derive(Debug, Clone, PartialEq)]
pub struct CubicFit {
    /// Coefficients `[a, b, c, d]`
    pub coefficients: [f64; 4],
    /// Fitted value at each input point
    pub predicted: Vec<f64>,
    /// Coefficient of determination, clamped to 0-1
    pub r_squared: f64,
}

impl CubicFit {
    /// Evaluate the fitted polynomial
    pub fn evaluate(&self, x: f64) -> f64 {
        let [a, b, c, d] = self.coefficients;
        ((a * x + b) * x + c) * x + d
    }

    /// First derivative of the fitted polynomial
    pub fn slope(&self, x: f64) -> f64 {
        let [a, b, c, _] = self.coefficients;
        (3.0 * a * x + 2.0 * b) * x + c
    }
}

/// Fit a cubic through `(x, y)` by ordinary least squares
pub fn fit_cubic(x: &[f64], y: &[f64]) -> Result<CubicFit> {
    if x.len() < MIN_POINTS || x.len() != y.len() {
        return Err(InsufficientDataError {
            points: x.len().min(y.len()),
            required: MIN_POINTS,
        }
        .into());
    }

    let center = Statistics::mean(x);
    let (min, max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let half_range = (max - min) / 2.0;
    if !half_range.is_finite() || half_range <= 0.0 {
        return Err(PlannerError::Calculation(
            "intensity values do not span a range".to_string(),
        ));
    }

    let t: Vec<f64> = x.iter().map(|&v| (v - center) / half_range).collect();

    // Normal equations: sum(t^(i+j)) * beta_j = sum(y * t^i)
    let mut power_sums = [0.0; 2 * DEGREE + 1];
    let mut rhs = [0.0; DEGREE + 1];
    for (&ti, &yi) in t.iter().zip(y) {
        let mut p = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += p;
            if k <= DEGREE {
                rhs[k] += yi * p;
            }
            p *= ti;
        }
    }
    let mut matrix = [[0.0; DEGREE + 1]; DEGREE + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = power_sums[i + j];
        }
    }

    let beta = solve(matrix, rhs)?;
    let coefficients = unscale(beta, center, half_range);

    let mut fit = CubicFit {
        coefficients,
        predicted: Vec::with_capacity(x.len()),
        r_squared: 0.0,
    };
    fit.predicted = x.iter().map(|&v| fit.evaluate(v)).collect();
    fit.r_squared = r_squared(y, &fit.predicted);

    debug!(
        a = coefficients[0],
        b = coefficients[1],
        c = coefficients[2],
        d = coefficients[3],
        r_squared = fit.r_squared,
        "fitted cubic lactate curve"
    );

    Ok(fit)
}

/// Gaussian elimination with partial pivoting
fn solve(
    mut a: [[f64; DEGREE + 1]; DEGREE + 1],
    mut b: [f64; DEGREE + 1],
) -> Result<[f64; DEGREE + 1]> {
    let n = DEGREE + 1;
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(PlannerError::Calculation(
                "singular normal equations in cubic fit".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = [0.0; DEGREE + 1];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Ok(solution)
}

/// Convert coefficients of `t = (x - x0) / s` back to powers of `x`.
/// `beta` is ordered constant first.
fn unscale(beta: [f64; DEGREE + 1], x0: f64, s: f64) -> [f64; 4] {
    let [d_t, c_t, b_t, a_t] = beta;
    let u = 1.0 / s;
    let a3 = a_t * u.powi(3);
    let b2 = b_t * u.powi(2);
    let c1 = c_t * u;

    let a = a3;
    let b = b2 - 3.0 * a3 * x0;
    let c = c1 + 3.0 * a3 * x0.powi(2) - 2.0 * b2 * x0;
    let d = d_t - a3 * x0.powi(3) + b2 * x0.powi(2) - c1 * x0;
    [a, b, c, d]
}

fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let mean = Statistics::mean(observed);
    let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    if ss_tot < PIVOT_EPSILON {
        return if ss_res < PIVOT_EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}
