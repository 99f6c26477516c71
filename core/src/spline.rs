//! Interpolating B-splines of degree at most two
//!
//! Knots for the quadratic case sit at the first and last sample (multiplicity
//! three) and at the midpoints between interior samples, dropping the first
//! and last midpoint. Coefficients come from the collocation system, so the
//! curve passes exactly through every `(x, y)` pair it was fitted to.

use crate::error::{GenError, GenResult};

/// Fitted interpolating spline
#[derive(Debug, Clone)]
pub struct Spline {
    degree: usize,
    knots: Vec<f64>,
    coefficients: Vec<f64>,
}

impl Spline {
    /// Fit the quadratic interpolant through strictly increasing `xs`.
    ///
    /// Two points fall back to the linear interpolant.
    pub fn quadratic(xs: &[f64], ys: &[f64]) -> GenResult<Self> {
        let n = xs.len();
        if n != ys.len() {
            return Err(GenError::Internal(format!(
                "spline fit got {} positions and {} values",
                n,
                ys.len()
            )));
        }
        if n < 2 {
            return Err(GenError::InsufficientControlPoints {
                supernode: None,
                found: n,
            });
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(GenError::Internal(
                "spline positions must be strictly increasing".to_string(),
            ));
        }

        let degree = 2.min(n - 1);
        let knots = knot_vector(xs, degree);

        let mut matrix = vec![vec![0.0; n]; n];
        for (row, &x) in matrix.iter_mut().zip(xs) {
            let span = find_span(&knots, degree, n, x);
            let basis = basis_functions(&knots, degree, span, x);
            for (j, b) in basis.into_iter().enumerate() {
                row[span - degree + j] = b;
            }
        }
        let coefficients = solve(matrix, ys.to_vec())?;

        Ok(Self {
            degree,
            knots,
            coefficients,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Evaluate at `x`, clamped into the fitted interval
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.coefficients.len();
        let lo = self.knots[self.degree];
        let hi = self.knots[n];
        let x = x.clamp(lo, hi);
        let span = find_span(&self.knots, self.degree, n, x);
        basis_functions(&self.knots, self.degree, span, x)
            .into_iter()
            .enumerate()
            .map(|(j, b)| b * self.coefficients[span - self.degree + j])
            .sum()
    }
}

fn knot_vector(xs: &[f64], degree: usize) -> Vec<f64> {
    let first = xs[0];
    let last = xs[xs.len() - 1];
    let mut knots = vec![first; degree + 1];
    if degree == 2 {
        let mids: Vec<f64> = xs.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        if mids.len() > 2 {
            knots.extend_from_slice(&mids[1..mids.len() - 1]);
        }
    } else {
        knots.extend_from_slice(&xs[1..xs.len() - 1]);
    }
    knots.extend(std::iter::repeat(last).take(degree + 1));
    knots
}

/// Index `l` with `knots[l] <= x < knots[l + 1]`, the right end point
/// belonging to the last non-empty span.
fn find_span(knots: &[f64], degree: usize, n: usize, x: f64) -> usize {
    if x >= knots[n] {
        return n - 1;
    }
    let mut span = degree;
    while span < n - 1 && x >= knots[span + 1] {
        span += 1;
    }
    span
}

/// Cox–de Boor recursion for the `degree + 1` basis functions that are
/// non-zero on `span`.
fn basis_functions(knots: &[f64], degree: usize, span: usize, x: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;
    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> GenResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < f64::EPSILON {
            return Err(GenError::Internal("singular collocation matrix".to_string()));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
