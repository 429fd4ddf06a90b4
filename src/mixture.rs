//! Diagonal-covariance Gaussians, mixtures of them, and likelihood evaluation.
//!
//! A component's log-density is
//!
//! ```text
//! log N(x | μ, σ²) = -½ ( Σ_d (x_d - μ_d)² / σ²_d + D log 2π + Σ_d log σ²_d )
//! ```
//!
//! and a mixture scores a query by the plain (non-log) sum
//! `Σ_j φ_j exp(log N(x | μ_j, σ²_j))`. Training works in log space; see
//! [`crate::cluster::Gmm`].

use crate::error::{Error, Result};
use crate::stats::VARIANCE_FLOOR;
use ndarray::{aview1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// One mixture component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    /// Mixing weight.
    pub phi: f64,
    /// Mean vector.
    pub mean: Vec<f64>,
    /// Diagonal of the covariance matrix.
    pub variance: Vec<f64>,
}

impl Gaussian {
    /// Create a component, checking dimensions, `phi ∈ (0, 1]` and every
    /// variance against [`VARIANCE_FLOOR`].
    pub fn new(phi: f64, mean: Vec<f64>, variance: Vec<f64>) -> Result<Self> {
        let g = Self { phi, mean, variance };
        g.validate(VARIANCE_FLOOR)?;
        Ok(g)
    }

    /// Dimension of the component.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Log-density of `x` under this component (mixing weight excluded).
    pub fn log_density(&self, x: ArrayView1<'_, f64>) -> f64 {
        log_density(x, aview1(&self.mean), aview1(&self.variance))
    }

    fn validate(&self, floor: f64) -> Result<()> {
        if self.mean.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.variance.len() != self.mean.len() {
            return Err(Error::DimensionMismatch {
                expected: self.mean.len(),
                found: self.variance.len(),
            });
        }
        if !(self.phi > 0.0 && self.phi <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "phi",
                message: "must lie in (0, 1]",
            });
        }
        if self.variance.iter().any(|v| !(v.is_finite() && *v > 0.0 && *v >= floor)) {
            return Err(Error::InvalidParameter {
                name: "variance",
                message: "every entry must be finite and at least the variance floor",
            });
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "mean",
                message: "every entry must be finite",
            });
        }
        Ok(())
    }

    fn is_finite(&self) -> bool {
        self.phi.is_finite()
            && self.mean.iter().all(|v| v.is_finite())
            && self.variance.iter().all(|v| v.is_finite())
    }
}

/// Diagonal-Gaussian log-density.
pub fn log_density(x: ArrayView1<'_, f64>, mean: ArrayView1<'_, f64>, variance: ArrayView1<'_, f64>) -> f64 {
    let d = x.len() as f64;
    let mut quad = 0.0;
    let mut log_det = 0.0;
    for ((xi, mi), vi) in x.iter().zip(mean.iter()).zip(variance.iter()) {
        let diff = xi - mi;
        quad += diff * diff / vi;
        log_det += vi.ln();
    }
    -0.5 * (quad + d * (2.0 * std::f64::consts::PI).ln() + log_det)
}

/// Log-sum-exp for numerical stability.
pub(crate) fn logsumexp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    max_val
        + values
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f64>()
            .ln()
}

/// Per-component slack allowed on `Σ φ = 1`.
const PHI_SUM_TOLERANCE: f64 = 1e-9;

/// An ordered set of K components, indexed by cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GaussianMixture {
    components: Vec<Gaussian>,
}

impl GaussianMixture {
    /// Build a mixture from components of equal dimension whose weights sum
    /// to 1.
    pub fn new(components: Vec<Gaussian>) -> Result<Self> {
        Self::with_variance_floor(components, VARIANCE_FLOOR)
    }

    /// Like [`GaussianMixture::new`], checking variances against `floor`.
    pub fn with_variance_floor(components: Vec<Gaussian>, floor: f64) -> Result<Self> {
        let m = Self { components };
        m.validate_with_floor(floor)?;
        Ok(m)
    }

    /// Wrap components without validation.
    pub(crate) fn from_components_unchecked(components: Vec<Gaussian>) -> Self {
        Self { components }
    }

    /// Check the mixture against the default [`VARIANCE_FLOOR`].
    pub fn validate(&self) -> Result<()> {
        self.validate_with_floor(VARIANCE_FLOOR)
    }

    /// Check that the mixture is non-empty, every component is well formed,
    /// all components share one dimension, and the weights sum to 1.
    pub fn validate_with_floor(&self, floor: f64) -> Result<()> {
        let first = self.components.first().ok_or(Error::EmptyInput)?;
        for g in &self.components {
            g.validate(floor)?;
            if g.dim() != first.dim() {
                return Err(Error::DimensionMismatch {
                    expected: first.dim(),
                    found: g.dim(),
                });
            }
        }
        let total: f64 = self.components.iter().map(|g| g.phi).sum();
        if (total - 1.0).abs() > PHI_SUM_TOLERANCE * self.components.len() as f64 {
            return Err(Error::InvalidParameter {
                name: "phi",
                message: "mixing weights must sum to 1",
            });
        }
        Ok(())
    }

    /// Components in cluster order.
    pub fn components(&self) -> &[Gaussian] {
        &self.components
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the mixture has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Model dimension.
    pub fn dim(&self) -> usize {
        self.components.first().map_or(0, Gaussian::dim)
    }

    /// Whether every parameter is a finite number.
    pub fn is_finite(&self) -> bool {
        self.components.iter().all(Gaussian::is_finite)
    }

    /// Mixture likelihood `Σ_j φ_j N(x | μ_j, σ²_j)` of one query vector.
    ///
    /// Fails with [`Error::ZeroLikelihood`] when every component underflows to
    /// zero, and with [`Error::DimensionMismatch`] on a wrongly sized query.
    pub fn likelihood(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        let x = aview1(x);
        let sum: f64 = self
            .components
            .iter()
            .map(|g| g.phi * g.log_density(x).exp())
            .sum();

        if sum == 0.0 {
            return Err(Error::ZeroLikelihood);
        }
        Ok(sum)
    }

    /// Natural log of [`GaussianMixture::likelihood`].
    pub fn log_likelihood(&self, x: &[f64]) -> Result<f64> {
        self.likelihood(x).map(f64::ln)
    }

    /// Total data log-likelihood `Σ_i log Σ_j φ_j N(x_i | μ_j, σ²_j)`.
    ///
    /// Computed with log-sum-exp so points far from every component do not
    /// collapse to `-inf`. NaN parameters propagate to a NaN result.
    pub fn total_log_likelihood(&self, data: ArrayView2<'_, f64>) -> f64 {
        let mut scores = vec![0.0; self.components.len()];
        let mut total = 0.0;
        for row in data.rows() {
            for (s, g) in scores.iter_mut().zip(&self.components) {
                *s = g.phi.ln() + g.log_density(row);
            }
            total += logsumexp(&scores);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn unit() -> GaussianMixture {
        GaussianMixture::new(vec![Gaussian::new(1.0, vec![0.0, 0.0], vec![1.0, 1.0]).unwrap()]).unwrap()
    }

    #[test]
    fn test_log_density_standard_normal() {
        let lp = log_density(
            array![0.0].view(),
            array![0.0].view(),
            array![1.0].view(),
        );
        assert!((lp - (-0.5 * (2.0 * std::f64::consts::PI).ln())).abs() < 1e-12);
    }

    #[test]
    fn test_likelihood_peaks_at_mean() {
        let m = unit();
        let at_mean = m.log_likelihood(&[0.0, 0.0]).unwrap();
        let far = m.log_likelihood(&[5.0, 5.0]).unwrap();
        assert!(at_mean > far);
    }

    #[test]
    fn test_likelihood_zero_when_underflowing() {
        let m = unit();
        assert_eq!(m.likelihood(&[1e4, 1e4]), Err(Error::ZeroLikelihood));
    }

    #[test]
    fn test_likelihood_dimension_mismatch() {
        let m = unit();
        assert_eq!(
            m.likelihood(&[0.0, 0.0, 0.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_mixture_rejects_bad_components() {
        assert!(Gaussian::new(0.5, vec![0.0], vec![0.0]).is_err());
        assert!(Gaussian::new(0.5, vec![0.0, 1.0], vec![1.0]).is_err());
        let a = Gaussian::new(0.5, vec![0.0], vec![1.0]).unwrap();
        let b = Gaussian::new(0.5, vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        assert!(GaussianMixture::new(vec![a, b]).is_err());
        assert_eq!(GaussianMixture::new(vec![]), Err(Error::EmptyInput));
    }

    #[test]
    fn test_component_weight_must_lie_in_unit_interval() {
        for phi in [0.0, -0.1, 1.5, 7.0, f64::NAN] {
            assert!(
                matches!(
                    Gaussian::new(phi, vec![0.0], vec![1.0]),
                    Err(Error::InvalidParameter { name: "phi", .. })
                ),
                "phi {phi}"
            );
        }
        assert!(Gaussian::new(1.0, vec![0.0], vec![1.0]).is_ok());
    }

    #[test]
    fn test_variance_below_floor_rejected() {
        assert!(matches!(
            Gaussian::new(1.0, vec![0.0], vec![1e-300]),
            Err(Error::InvalidParameter { name: "variance", .. })
        ));
        assert!(Gaussian::new(1.0, vec![0.0], vec![VARIANCE_FLOOR]).is_ok());

        let g = Gaussian {
            phi: 1.0,
            mean: vec![0.0],
            variance: vec![1e-7],
        };
        assert!(GaussianMixture::new(vec![g.clone()]).is_err());
        assert!(GaussianMixture::with_variance_floor(vec![g], 1e-8).is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let g = |phi| Gaussian::new(phi, vec![0.0], vec![1.0]).unwrap();
        assert!(matches!(
            GaussianMixture::new(vec![g(0.5), g(0.4)]),
            Err(Error::InvalidParameter { name: "phi", .. })
        ));
        assert!(GaussianMixture::new(vec![g(0.1), g(0.2), g(0.7)]).is_ok());
    }

    #[test]
    fn test_total_log_likelihood_matches_direct_sum() {
        let m = GaussianMixture::new(vec![
            Gaussian::new(0.3, vec![0.0], vec![1.0]).unwrap(),
            Gaussian::new(0.7, vec![3.0], vec![2.0]).unwrap(),
        ])
        .unwrap();
        let data = array![[0.5], [2.5], [-1.0]];

        let direct: f64 = [0.5, 2.5, -1.0]
            .iter()
            .map(|&x| m.log_likelihood(&[x]).unwrap())
            .sum();
        assert!((m.total_log_likelihood(data.view()) - direct).abs() < 1e-10);
    }

    #[test]
    fn test_logsumexp() {
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
        let v = logsumexp(&[0.0_f64.ln(), 1.0_f64.ln()]);
        assert!(v.abs() < 1e-12);
        assert!((logsumexp(&[1000.0, 1000.0]) - (1000.0 + 2.0_f64.ln())).abs() < 1e-9);
    }
}
