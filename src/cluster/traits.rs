//! Plain clustering interface over the training estimators.

use crate::error::Result;

/// An estimator that partitions feature vectors into labelled groups.
pub trait Clustering {
    /// Fit to `data` and return one cluster id in `0..n_clusters()` per
    /// vector, in input order.
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>>;

    /// Number of clusters the estimator produces.
    fn n_clusters(&self) -> usize;
}

/// A [`Clustering`] whose assignments are membership probabilities.
pub trait SoftClustering: Clustering {
    /// Fit to `data` and return, per vector, the responsibility of every
    /// cluster. Each row sums to 1.
    fn fit_predict_proba(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}
