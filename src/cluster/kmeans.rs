//! K-means clustering under a global diagonal Mahalanobis metric.
//!
//! Partitions feature vectors into k clusters by minimizing
//!
//! ```text
//! RSS = Σᵢ d(xᵢ, μ_{c(i)})²        d(x, y) = Σ_d (x_d - y_d)² / σ²_d
//! ```
//!
//! where σ² is the per-dimension variance of the *whole* data set, computed
//! once per run. Clusters never get their own metric during assignment; their
//! variances are only estimated at the end, to seed a Gaussian mixture.
//!
//! # Lloyd's Algorithm
//!
//! 1. Pick k seed points (see [`SeedStrategy`])
//! 2. **Assign**: each point → nearest centroid (ties: lowest index)
//! 3. **Update**: each centroid → plain arithmetic mean of its members
//! 4. Stop once RSS moves by less than `tol`, or after `max_iter` passes
//! 5. Reassign once more against the final centroids
//!
//! Step 5 guarantees the returned labels agree with the returned centroids
//! even if the loop stopped right after an update.
//!
//! # Failure Modes
//!
//! - **Empty clusters**: a centroid that loses all members keeps its previous
//!   position while iterating. If it is still empty after the final
//!   reassignment the run fails with [`Error::DegenerateCluster`].
//! - **Too few points**: `k > n` fails with [`Error::InsufficientData`].

use super::traits::Clustering;
use crate::error::{Error, Result};
use crate::stats::{self, mahalanobis, to_matrix, VARIANCE_FLOOR};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Label of a point that has not been assigned yet.
pub const UNASSIGNED: usize = usize::MAX;

/// How the k initial centroids are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedStrategy {
    /// k distinct points drawn uniformly without replacement.
    #[default]
    Random,
    /// One uniformly random point, then repeatedly the point farthest from
    /// every centroid chosen so far (ties: lowest index).
    FarthestPoint,
}

/// K-means clustering algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Early-stop threshold on the RSS change between iterations.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
    /// Centroid initialization.
    strategy: SeedStrategy,
    /// Lower bound on every variance.
    variance_floor: f64,
}

/// Result of a K-means run.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Cluster label of every input point, in input order.
    pub assignments: Vec<usize>,
    /// Centroids used for the final assignment pass (k × d).
    pub centroids: Array2<f64>,
    /// Mean of each cluster's members (k × d).
    pub means: Array2<f64>,
    /// Floor-clamped variance of each cluster's members (k × d).
    pub variances: Array2<f64>,
    /// Number of members per cluster.
    pub counts: Vec<usize>,
    /// Floor-clamped variance of the whole data set; the distance weights.
    pub global_variance: Array1<f64>,
    /// RSS after every update step.
    pub rss_history: Vec<f64>,
    /// Number of assign/update iterations executed.
    pub iterations: usize,
    /// Floor the variances were clamped to.
    pub variance_floor: f64,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            tol: 1e-7,
            seed: None,
            strategy: SeedStrategy::Random,
            variance_floor: VARIANCE_FLOOR,
        }
    }

    /// Set the number of clusters.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the RSS early-stop tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the centroid initialization strategy.
    pub fn with_seed_strategy(mut self, strategy: SeedStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the variance floor.
    pub fn with_variance_floor(mut self, floor: f64) -> Self {
        self.variance_floor = floor;
        self
    }

    /// Configured seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Run K-means, seeding the generator from the configured seed (or the
    /// thread RNG when none is set).
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KmeansFit> {
        let x = to_matrix(data)?;
        let mut rng = self.rng();
        self.fit_matrix(x.view(), &mut *rng)
    }

    /// Run K-means with an explicitly injected generator.
    pub fn fit_with_rng<R: Rng + ?Sized>(&self, data: &[Vec<f64>], rng: &mut R) -> Result<KmeansFit> {
        let x = to_matrix(data)?;
        self.fit_matrix(x.view(), rng)
    }

    pub(crate) fn rng(&self) -> Box<dyn RngCore> {
        match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        }
    }

    pub(crate) fn fit_matrix<R: Rng + ?Sized>(&self, x: ArrayView2<'_, f64>, rng: &mut R) -> Result<KmeansFit> {
        let n = x.nrows();
        let d = x.ncols();

        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be > 0",
            });
        }
        if self.k > n {
            return Err(Error::InsufficientData {
                requested: self.k,
                n_items: n,
            });
        }

        let (_, global_variance) = stats::mean_and_variance(x, self.variance_floor)?;

        let seeds = match self.strategy {
            SeedStrategy::Random => rand::seq::index::sample(rng, n, self.k).into_vec(),
            SeedStrategy::FarthestPoint => farthest_point_seeds(x, &global_variance, self.k, rng),
        };
        debug!(?seeds, strategy = ?self.strategy, "k-means seeds");

        let mut centroids = Array2::zeros((self.k, d));
        for (c, &i) in seeds.iter().enumerate() {
            centroids.row_mut(c).assign(&x.row(i));
        }

        let mut labels = vec![UNASSIGNED; n];
        let mut arena = ClusterArena::new(self.k, d);
        let mut rss_history: Vec<f64> = Vec::with_capacity(self.max_iter);
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            assign(x, &centroids, &global_variance, &mut labels);

            arena.reset();
            arena.accumulate(x, &labels)?;
            arena.write_means(&mut centroids);

            let current = rss(x, &centroids, &global_variance, &labels);
            rss_history.push(current);

            if iter > 1 && (rss_history[iter - 1] - current).abs() < self.tol {
                debug!(iteration = iter, rss = current, "k-means converged");
                break;
            }
        }

        assign(x, &centroids, &global_variance, &mut labels);

        arena.reset();
        arena.accumulate(x, &labels)?;
        if let Some(cluster) = arena.counts.iter().position(|&c| c == 0) {
            warn!(cluster, counts = ?arena.counts, "k-means produced an empty cluster");
            return Err(Error::DegenerateCluster { cluster });
        }
        let (means, variances) = arena.statistics(x, &labels, self.variance_floor)?;

        Ok(KmeansFit {
            assignments: labels,
            centroids,
            means,
            variances,
            counts: arena.counts,
            global_variance,
            rss_history,
            iterations,
            variance_floor: self.variance_floor,
        })
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        self.fit(data).map(|fit| fit.assignments)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Index of the centroid nearest to `point` (ties: lowest index).
fn nearest(point: ArrayView1<'_, f64>, centroids: &Array2<f64>, variance: &Array1<f64>) -> usize {
    let mut best_cluster = 0;
    let mut best_dist = f64::INFINITY;
    for (k, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = mahalanobis(point, centroid, variance.view());
        if dist < best_dist {
            best_dist = dist;
            best_cluster = k;
        }
    }
    best_cluster
}

/// Assign every point to its nearest centroid.
pub fn assign(x: ArrayView2<'_, f64>, centroids: &Array2<f64>, variance: &Array1<f64>, labels: &mut [usize]) {
    #[cfg(feature = "parallel")]
    labels.par_iter_mut().enumerate().for_each(|(i, label)| {
        *label = nearest(x.row(i), centroids, variance);
    });

    #[cfg(not(feature = "parallel"))]
    for (i, label) in labels.iter_mut().enumerate() {
        *label = nearest(x.row(i), centroids, variance);
    }
}

/// Sum over points of the squared Mahalanobis distance to their centroid.
pub fn rss(x: ArrayView2<'_, f64>, centroids: &Array2<f64>, variance: &Array1<f64>, labels: &[usize]) -> f64 {
    x.rows()
        .into_iter()
        .zip(labels)
        .map(|(point, &c)| {
            let d = mahalanobis(point, centroids.row(c), variance.view());
            d * d
        })
        .sum()
}

/// Farthest-point seeding with cached per-point minimum distances.
fn farthest_point_seeds<R: Rng + ?Sized>(
    x: ArrayView2<'_, f64>,
    variance: &Array1<f64>,
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    let n = x.nrows();
    let first = rng.random_range(0..n);

    let mut seeds = Vec::with_capacity(k);
    let mut chosen = vec![false; n];
    let mut min_dist = vec![f64::INFINITY; n];
    seeds.push(first);
    chosen[first] = true;

    while seeds.len() < k {
        let last = x.row(seeds[seeds.len() - 1]);
        for (i, md) in min_dist.iter_mut().enumerate() {
            let d = mahalanobis(x.row(i), last, variance.view());
            if d < *md {
                *md = d;
            }
        }

        let mut best = None;
        let mut best_dist = f64::NEG_INFINITY;
        for (i, &md) in min_dist.iter().enumerate() {
            if !chosen[i] && md > best_dist {
                best_dist = md;
                best = Some(i);
            }
        }
        // k <= n, so an unchosen point always exists.
        let Some(next) = best else { break };
        seeds.push(next);
        chosen[next] = true;
    }

    seeds
}

/// Per-cluster accumulators indexed `0..k`, reset before every pass.
struct ClusterArena {
    sums: Array2<f64>,
    counts: Vec<usize>,
}

impl ClusterArena {
    fn new(k: usize, d: usize) -> Self {
        Self {
            sums: Array2::zeros((k, d)),
            counts: vec![0; k],
        }
    }

    fn reset(&mut self) {
        for row in self.sums.rows_mut() {
            stats::zero(row);
        }
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    fn accumulate(&mut self, x: ArrayView2<'_, f64>, labels: &[usize]) -> Result<()> {
        for (point, &c) in x.rows().into_iter().zip(labels) {
            stats::add(self.sums.row_mut(c), point)?;
            self.counts[c] += 1;
        }
        Ok(())
    }

    /// Overwrite each non-empty cluster's centroid with its member mean.
    fn write_means(&self, centroids: &mut Array2<f64>) {
        for (c, &count) in self.counts.iter().enumerate() {
            if count > 0 {
                let mut row = centroids.row_mut(c);
                row.assign(&self.sums.row(c));
                stats::scale(row, 1.0 / count as f64);
            }
        }
    }

    /// Member means and floor-clamped member variances. Every cluster must be
    /// non-empty.
    fn statistics(
        &self,
        x: ArrayView2<'_, f64>,
        labels: &[usize],
        floor: f64,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let mut means = self.sums.clone();
        self.write_means(&mut means);

        let mut variances = Array2::zeros(self.sums.raw_dim());
        let mut deviation = Array1::zeros(x.ncols());
        for (point, &c) in x.rows().into_iter().zip(labels) {
            deviation.assign(&point);
            stats::subtract(deviation.view_mut(), means.row(c))?;
            stats::square(deviation.view_mut());
            stats::add(variances.row_mut(c), deviation.view())?;
        }
        for (c, &count) in self.counts.iter().enumerate() {
            stats::scale(variances.row_mut(c), 1.0 / count as f64);
            stats::clamp_floor(variances.row_mut(c), floor);
        }
        Ok((means, variances))
    }
}
