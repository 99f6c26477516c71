//! Curve synthesizer: sparse control points to a noisy, rescaled series

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::Boundary;
use crate::error::{GenError, GenResult};
use crate::spline::Spline;

/// A single generated series, one value per cycle
pub type Series = Vec<f64>;

/// `n` evenly spaced positions covering `[0, 1]`, both ends included
pub fn linspace(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
    }
}

/// Fit the base interpolant for a set of control points.
///
/// The values are sorted ascending and placed at evenly spaced positions in
/// `[0, 1]`; the caller's ordering is not kept.
pub fn interpolant(control_points: &[f64]) -> GenResult<Spline> {
    if control_points.len() < 2 {
        return Err(GenError::InsufficientControlPoints {
            supernode: None,
            found: control_points.len(),
        });
    }
    let mut ys = control_points.to_vec();
    ys.sort_by(|a, b| a.total_cmp(b));
    let xs = linspace(ys.len());
    Spline::quadratic(&xs, &ys)
}

/// Synthesize a series of `n_samples` values spanning `range`.
///
/// Gaussian noise with standard deviation `noise_std` is added before the
/// min-max rescale. A zero `noise_std` draws nothing from `rng`.
pub fn synthesize<R: Rng + ?Sized>(
    control_points: &[f64],
    range: Boundary,
    n_samples: usize,
    noise_std: f64,
    rng: &mut R,
) -> GenResult<Series> {
    let spline = interpolant(control_points)?;
    let mut y: Series = linspace(n_samples).into_iter().map(|x| spline.eval(x)).collect();

    if !noise_std.is_finite() || noise_std < 0.0 {
        return Err(GenError::InvalidConfiguration(vec![format!(
            "noise_std must be finite and non-negative, got {}",
            noise_std
        )]));
    }
    if noise_std > 0.0 {
        let normal = Normal::new(0.0, noise_std).map_err(|e| {
            GenError::InvalidConfiguration(vec![format!("noise_std {}: {}", noise_std, e)])
        })?;
        for v in y.iter_mut() {
            *v += normal.sample(rng);
        }
    }

    rescale(&mut y, range)?;
    Ok(y)
}

/// Relative spread below which a series counts as flat.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Min-max rescale in place so the minimum lands on `range.lower` and the
/// maximum on `range.upper`.
///
/// A spread within roundoff of zero is degenerate.
pub fn rescale(y: &mut [f64], range: Boundary) -> GenResult<()> {
    let (min, max) = y
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let spread = max - min;
    let scale = 1f64.max(min.abs()).max(max.abs());
    if !spread.is_finite() || spread <= FLAT_TOLERANCE * scale {
        return Err(GenError::DegenerateRange {
            supernode: None,
            subnode: None,
        });
    }
    let span = range.span();
    for v in y.iter_mut() {
        *v = (*v - min) / spread * span + range.lower;
    }
    Ok(())
}
