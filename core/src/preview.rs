//! Control-point preview curve for configuration tooling

use crate::curve::linspace;
use crate::error::{GenError, GenResult};

/// Bezier curve through control polygon `(i / (count - 1), value_i)`,
/// sampled at `num` evenly spaced parameter values.
///
/// Unlike the generation interpolant, points keep the order they were given.
/// The parameter runs from the last control point (`t = 0`) back to the
/// first (`t = 1`), so samples come out in reverse polygon order.
pub fn bezier_curve(control_points: &[f64], num: usize) -> GenResult<Vec<(f64, f64)>> {
    let count = control_points.len();
    if count < 2 {
        return Err(GenError::InsufficientControlPoints {
            supernode: None,
            found: count,
        });
    }
    let degree = count - 1;
    let polygon: Vec<(f64, f64)> = linspace(count).into_iter().zip(control_points.iter().copied()).collect();

    Ok(linspace(num)
        .into_iter()
        .map(|t| {
            polygon
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(x, y), (i, &(px, py))| {
                    let b = bernstein(i, degree, t);
                    (x + b * px, y + b * py)
                })
        })
        .collect())
}

fn bernstein(i: usize, n: usize, t: f64) -> f64 {
    binomial(n, i) * t.powi((n - i) as i32) * (1.0 - t).powi(i as i32)
}

fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, j| acc * (n - j) as f64 / (j + 1) as f64)
}
