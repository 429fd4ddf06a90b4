//! Diagonal-covariance Gaussian Mixture Model trained by EM.
//!
//! # Initialization
//!
//! The mixture is seeded from a [`Kmeans`] run over the same data: component
//! j starts with `φ_j = count_j / N` and the cluster's member mean and
//! variance.
//!
//! # The EM Algorithm
//!
//! **E-step** (log space): for every point i and component j
//!
//! ```text
//! w_ij = log φ_j + log N(x_i | μ_j, σ²_j)
//! m_i  = max_j w_ij
//! γ_ij = exp(w_ij - m_i) / Σ_j' exp(w_ij' - m_i)      (0 if w_ij < m_i - prune)
//! ```
//!
//! Components more than `e^-prune` times less likely than the best one get
//! exactly zero responsibility. Each row of γ sums to 1.
//!
//! **M-step**: with `N_j = Σ_i γ_ij`
//! - μ_j = Σ_i γ_ij x_i / N_j
//! - σ²_j = Σ_i γ_ij (x_i - μ_j)² / N_j, clamped to the variance floor
//! - φ_j = N_j / N
//!
//! The new mixture replaces the old one wholesale.
//!
//! # Stopping
//!
//! After every M-step the total log-likelihood L is computed. A NaN L (or any
//! non-finite parameter) aborts training with [`Error::NumericalDivergence`].
//! Otherwise EM stops once `|L - L_prev| < tol`, or softly at `max_iter`.
//!
//! # Failure Modes
//!
//! - **Component starvation**: a component that receives no responsibility
//!   has `N_j = 0`; its mean becomes NaN and the run diverges.
//! - **Local optima**: EM only climbs; the K-means seed decides where.

use super::kmeans::{Kmeans, KmeansFit, SeedStrategy};
use super::traits::{Clustering, SoftClustering};
use crate::error::{Error, Result};
use crate::mixture::{Gaussian, GaussianMixture};
use crate::stats::{self, to_matrix, VARIANCE_FLOOR};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use tracing::{debug, trace};

/// Gaussian Mixture Model trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct Gmm {
    /// Number of components (clusters).
    n_components: usize,
    /// Maximum EM iterations.
    max_iter: usize,
    /// Log-likelihood convergence tolerance.
    tol: f64,
    /// Responsibilities below `max - prune_threshold` (log space) are zeroed.
    prune_threshold: f64,
    /// Lower bound on every variance.
    variance_floor: f64,
    /// K-means seeding configuration.
    kmeans: Kmeans,
}

/// What an [`EmObserver`] sees after each EM step.
#[derive(Debug)]
pub struct EmIteration<'a> {
    /// Zero-based EM step.
    pub step: usize,
    /// Responsibilities computed by this step's E-step (N × K).
    pub responsibilities: ArrayView2<'a, f64>,
    /// Mixture produced by this step's M-step.
    pub mixture: &'a GaussianMixture,
    /// Total log-likelihood of the data under `mixture`.
    pub log_likelihood: f64,
}

/// Per-iteration trace sink injected into [`Gmm::fit_observed`].
pub trait EmObserver {
    /// Called once per EM step, after the M-step.
    fn on_iteration(&mut self, iteration: &EmIteration<'_>);
}

/// Observer that ignores every iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EmObserver for NoopObserver {
    fn on_iteration(&mut self, _iteration: &EmIteration<'_>) {}
}

/// Observer that emits one `trace` event per EM step.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EmObserver for TracingObserver {
    fn on_iteration(&mut self, it: &EmIteration<'_>) {
        for (j, g) in it.mixture.components().iter().enumerate() {
            trace!(
                step = it.step,
                component = j,
                phi = g.phi,
                mean = ?g.mean,
                variance = ?g.variance,
                "em component"
            );
        }
        trace!(step = it.step, log_likelihood = it.log_likelihood, "em step");
    }
}

/// Result of training.
#[derive(Debug, Clone)]
pub struct GmmFit {
    /// The refined mixture, ordered by original cluster index.
    pub mixture: GaussianMixture,
    /// Number of EM steps executed.
    pub iterations: usize,
    /// Final total log-likelihood.
    pub log_likelihood: f64,
    /// Whether the tolerance was met before the iteration cap.
    pub converged: bool,
}

impl Gmm {
    /// Create a new GMM with the given number of components.
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            max_iter: 200,
            tol: 1e-5,
            prune_threshold: 10.0,
            variance_floor: VARIANCE_FLOOR,
            kmeans: Kmeans::new(n_components),
        }
    }

    /// Set number of components.
    pub fn with_n_components(mut self, n: usize) -> Self {
        self.n_components = n;
        self
    }

    /// Set maximum EM iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the log-likelihood convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the E-step pruning threshold (in nats).
    pub fn with_prune_threshold(mut self, threshold: f64) -> Self {
        self.prune_threshold = threshold;
        self
    }

    /// Set the variance floor used by both K-means and EM.
    pub fn with_variance_floor(mut self, floor: f64) -> Self {
        self.variance_floor = floor;
        self.kmeans = self.kmeans.with_variance_floor(floor);
        self
    }

    /// Set random seed for the K-means initialization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.kmeans = self.kmeans.with_seed(seed);
        self
    }

    /// Set the K-means centroid initialization strategy.
    pub fn with_seed_strategy(mut self, strategy: SeedStrategy) -> Self {
        self.kmeans = self.kmeans.with_seed_strategy(strategy);
        self
    }

    /// Replace the K-means seeding configuration. Its cluster count and
    /// variance floor are overridden by this trainer's.
    pub fn with_kmeans(mut self, kmeans: Kmeans) -> Self {
        self.kmeans = kmeans;
        self
    }

    /// The K-means seeding configuration.
    pub fn kmeans(&self) -> &Kmeans {
        &self.kmeans
    }

    /// Train a mixture on `data`.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<GmmFit> {
        self.fit_observed(data, &mut NoopObserver)
    }

    /// Train a mixture, reporting every EM step to `observer`.
    pub fn fit_observed(&self, data: &[Vec<f64>], observer: &mut dyn EmObserver) -> Result<GmmFit> {
        let x = to_matrix(data)?;
        let mut rng = self.kmeans.rng();
        self.fit_matrix(x.view(), &mut *rng, observer)
    }

    /// Train a mixture with an explicitly injected generator for seeding.
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &self,
        data: &[Vec<f64>],
        rng: &mut R,
        observer: &mut dyn EmObserver,
    ) -> Result<GmmFit> {
        let x = to_matrix(data)?;
        self.fit_matrix(x.view(), rng, observer)
    }

    fn fit_matrix<R: Rng + ?Sized>(
        &self,
        x: ArrayView2<'_, f64>,
        rng: &mut R,
        observer: &mut dyn EmObserver,
    ) -> Result<GmmFit> {
        let seeding = self.seeder().fit_matrix(x, rng)?;
        debug!(counts = ?seeding.counts, iterations = seeding.iterations, "k-means seeding done");
        let initial = initial_mixture(&seeding)?;
        self.refine(x, initial, observer)
    }

    fn seeder(&self) -> Kmeans {
        self.kmeans
            .clone()
            .with_k(self.n_components)
            .with_variance_floor(self.variance_floor)
    }

    /// Run EM from a given starting mixture.
    pub fn refine(
        &self,
        x: ArrayView2<'_, f64>,
        initial: GaussianMixture,
        observer: &mut dyn EmObserver,
    ) -> Result<GmmFit> {
        if x.ncols() != initial.dim() {
            return Err(Error::DimensionMismatch {
                expected: initial.dim(),
                found: x.ncols(),
            });
        }

        let mut mixture = initial;
        let mut likelihood = mixture.total_log_likelihood(x);
        if likelihood.is_nan() {
            debug!("initial log-likelihood is NaN");
            return Err(Error::NumericalDivergence { iteration: 0 });
        }
        let mut prev: Option<f64> = None;
        let mut converged = false;
        let mut step = 0;

        while step < self.max_iter {
            let resp = e_step(x, &mixture, self.prune_threshold);
            mixture = m_step(x, resp.view(), self.variance_floor)?;
            likelihood = mixture.total_log_likelihood(x);

            if likelihood.is_nan() || !mixture.is_finite() {
                debug!(step, "em log-likelihood is NaN");
                return Err(Error::NumericalDivergence { iteration: step });
            }

            observer.on_iteration(&EmIteration {
                step,
                responsibilities: resp.view(),
                mixture: &mixture,
                log_likelihood: likelihood,
            });

            step += 1;
            if prev.is_some_and(|p| (likelihood - p).abs() < self.tol) {
                converged = true;
                break;
            }
            prev = Some(likelihood);
        }

        debug!(steps = step, likelihood, converged, "em finished");
        Ok(GmmFit {
            mixture,
            iterations: step,
            log_likelihood: likelihood,
            converged,
        })
    }
}

/// Mixture seeded from K-means clusters: `φ_j = count_j / N`, cluster mean
/// and variance, checked against the seeding's variance floor.
pub fn initial_mixture(seeding: &KmeansFit) -> Result<GaussianMixture> {
    let n: usize = seeding.counts.iter().sum();
    let components = seeding
        .counts
        .iter()
        .zip(seeding.means.rows())
        .zip(seeding.variances.rows())
        .map(|((&count, mean), var)| Gaussian {
            phi: count as f64 / n as f64,
            mean: mean.to_vec(),
            variance: var.to_vec(),
        })
        .collect();
    GaussianMixture::with_variance_floor(components, seeding.variance_floor)
}

/// Log-space responsibilities with pruning. Every row sums to 1.
pub fn e_step(x: ArrayView2<'_, f64>, mixture: &GaussianMixture, prune_threshold: f64) -> Array2<f64> {
    let k = mixture.len();
    let mut w = Array2::zeros((x.nrows(), k));

    for (point, mut row) in x.rows().into_iter().zip(w.rows_mut()) {
        for (j, g) in mixture.components().iter().enumerate() {
            row[j] = g.phi.ln() + g.log_density(point);
        }
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));

        let mut sum = 0.0;
        for v in row.iter_mut() {
            if *v < max - prune_threshold {
                *v = 0.0;
            } else {
                *v = (*v - max).exp();
                sum += *v;
            }
        }
        stats::scale(row, 1.0 / sum);
    }
    w
}

/// Maximum-likelihood update from responsibilities. Builds a fresh mixture.
fn m_step(x: ArrayView2<'_, f64>, resp: ArrayView2<'_, f64>, floor: f64) -> Result<GaussianMixture> {
    let n = x.nrows();
    let d = x.ncols();
    let k = resp.ncols();

    let weights: Array1<f64> = resp.sum_axis(Axis(0));

    let mut means = Array2::zeros((k, d));
    for (point, r) in x.rows().into_iter().zip(resp.rows()) {
        for (j, &w) in r.iter().enumerate() {
            if w > 0.0 {
                stats::add_scaled(means.row_mut(j), point, w)?;
            }
        }
    }
    for (j, &nj) in weights.iter().enumerate() {
        stats::scale(means.row_mut(j), 1.0 / nj);
    }

    let mut variances = Array2::zeros((k, d));
    let mut deviation = Array1::zeros(d);
    for (point, r) in x.rows().into_iter().zip(resp.rows()) {
        for (j, &w) in r.iter().enumerate() {
            if w > 0.0 {
                deviation.assign(&point);
                stats::subtract(deviation.view_mut(), means.row(j))?;
                stats::square(deviation.view_mut());
                stats::add_scaled(variances.row_mut(j), deviation.view(), w)?;
            }
        }
    }
    for (j, &nj) in weights.iter().enumerate() {
        stats::scale(variances.row_mut(j), 1.0 / nj);
        stats::clamp_floor(variances.row_mut(j), floor);
    }

    let components = (0..k)
        .map(|j| Gaussian {
            phi: weights[j] / n as f64,
            mean: means.row(j).to_vec(),
            variance: variances.row(j).to_vec(),
        })
        .collect();
    // NaN parameters must reach the divergence check, so skip validation.
    Ok(GaussianMixture::from_components_unchecked(components))
}

impl Default for Gmm {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Clustering for Gmm {
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        let probs = self.fit_predict_proba(data)?;

        // Hard assignment: argmax
        Ok(probs
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            })
            .collect())
    }

    fn n_clusters(&self) -> usize {
        self.n_components
    }
}

impl SoftClustering for Gmm {
    fn fit_predict_proba(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let x = to_matrix(data)?;
        let mut rng = self.kmeans.rng();
        let fit = self.fit_matrix(x.view(), &mut *rng, &mut NoopObserver)?;
        let resp = e_step(x.view(), &fit.mixture, self.prune_threshold);
        Ok(resp.rows().into_iter().map(|r| r.to_vec()).collect())
    }
}
