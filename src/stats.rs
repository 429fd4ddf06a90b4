//! Per-dimension statistics, the diagonal Mahalanobis distance, and the
//! in-place vector helpers shared by K-means and EM.
//!
//! Every variance produced here is clamped to a floor so that distances and
//! Gaussian densities stay finite:
//!
//! ```text
//! d(x, y) = Σ_d (x_d - y_d)² / σ²_d        σ²_d ≥ floor
//! ```

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use tracing::debug;

/// Default lower bound on any per-dimension variance.
pub const VARIANCE_FLOOR: f64 = 1e-5;

/// Copy row vectors into an `n × d` matrix, checking that every row has the
/// same dimension.
pub fn to_matrix(data: &[Vec<f64>]) -> Result<Array2<f64>> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }

    let n = data.len();
    let d = data[0].len();
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "data",
            message: "feature vectors must have at least one dimension",
        });
    }

    let mut flat: Vec<f64> = Vec::with_capacity(n * d);
    for point in data {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
        flat.extend(point);
    }
    Array2::from_shape_vec((n, d), flat).map_err(|e| Error::Other(e.to_string()))
}

/// Per-dimension sample mean and biased variance of the rows of `data`.
///
/// Any variance below `floor` is raised to `floor`.
pub fn mean_and_variance(data: ArrayView2<'_, f64>, floor: f64) -> Result<(Array1<f64>, Array1<f64>)> {
    let mean = data.mean_axis(Axis(0)).ok_or(Error::EmptyInput)?;

    let mut variance = Array1::zeros(data.ncols());
    let mut deviation = Array1::zeros(data.ncols());
    for row in data.rows() {
        deviation.assign(&row);
        subtract(deviation.view_mut(), mean.view())?;
        square(deviation.view_mut());
        add(variance.view_mut(), deviation.view())?;
    }
    scale(variance.view_mut(), 1.0 / data.nrows() as f64);

    let clamped = clamp_floor(variance.view_mut(), floor);
    if clamped > 0 {
        debug!(clamped, floor, "variance floor applied");
    }
    Ok((mean, variance))
}

/// [`mean_and_variance`] over row vectors.
pub fn mean_and_variance_of(data: &[Vec<f64>], floor: f64) -> Result<(Vec<f64>, Vec<f64>)> {
    let x = to_matrix(data)?;
    let (mean, variance) = mean_and_variance(x.view(), floor)?;
    Ok((mean.to_vec(), variance.to_vec()))
}

/// Variance-weighted squared distance between `x` and `y`.
///
/// `variance` must already be floor-clamped; no clamping happens here.
/// All three views must have the same length.
#[inline]
pub fn mahalanobis(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>, variance: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), variance.len());
    x.iter()
        .zip(y.iter())
        .zip(variance.iter())
        .map(|((a, b), v)| (a - b) * (a - b) / v)
        .sum()
}

fn check_len(left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::LengthMismatch { left, right });
    }
    Ok(())
}

/// Set every element to zero.
pub fn zero(mut target: ArrayViewMut1<'_, f64>) {
    target.fill(0.0);
}

/// Multiply every element by `factor`.
pub fn scale(mut target: ArrayViewMut1<'_, f64>, factor: f64) {
    target.mapv_inplace(|v| v * factor);
}

/// `target += src`.
pub fn add(mut target: ArrayViewMut1<'_, f64>, src: ArrayView1<'_, f64>) -> Result<()> {
    check_len(target.len(), src.len())?;
    target += &src;
    Ok(())
}

/// `target += weight * src`.
pub fn add_scaled(mut target: ArrayViewMut1<'_, f64>, src: ArrayView1<'_, f64>, weight: f64) -> Result<()> {
    check_len(target.len(), src.len())?;
    target.scaled_add(weight, &src);
    Ok(())
}

/// Square every element.
pub fn square(mut target: ArrayViewMut1<'_, f64>) {
    target.mapv_inplace(|v| v * v);
}

/// `target -= src`.
pub fn subtract(mut target: ArrayViewMut1<'_, f64>, src: ArrayView1<'_, f64>) -> Result<()> {
    check_len(target.len(), src.len())?;
    target -= &src;
    Ok(())
}

/// Raise every element below `floor` to `floor`. Returns how many changed.
pub fn clamp_floor(mut target: ArrayViewMut1<'_, f64>, floor: f64) -> usize {
    let mut clamped = 0;
    for v in target.iter_mut() {
        if *v < floor {
            *v = floor;
            clamped += 1;
        }
    }
    clamped
}
