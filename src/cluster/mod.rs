//! Clustering and mixture training.
//!
//! ## Hard vs Soft Clustering
//!
//! **Hard clustering** ([`Kmeans`]) assigns each feature vector to exactly one
//! cluster. Here it is mostly a seeding step: its per-cluster counts, means
//! and variances become the starting point of a mixture.
//!
//! **Soft clustering** ([`Gmm`]) gives each vector a probability distribution
//! over components. The trained mixture, not the assignments, is the product:
//! one mixture per emotion class, later scored by likelihood.
//!
//! ## Distance
//!
//! K-means uses a diagonal Mahalanobis distance weighted by the global
//! per-dimension variance of the data set:
//!
//! ```text
//! d(x, y) = Σ_d (x_d - y_d)² / σ²_d
//! ```
//!
//! Feature dimensions differ wildly in scale (EEG band powers next to
//! cepstral coefficients); without the weighting the largest-scale dimension
//! decides every assignment.
//!
//! ## Gaussian Mixture Model
//!
//! ```text
//! P(x) = Σ_k φ_k × N(x | μ_k, diag(σ²_k))
//! ```
//!
//! Trained by EM in log space, seeded by K-means. See [`Gmm`].
//!
//! ## Usage
//!
//! ```rust
//! use emomix::cluster::{Clustering, Gmm, Kmeans, SeedStrategy};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.2],
//!     vec![0.2, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.2],
//!     vec![10.2, 10.1],
//! ];
//!
//! let labels = Kmeans::new(2)
//!     .with_seed(42)
//!     .with_seed_strategy(SeedStrategy::FarthestPoint)
//!     .fit_predict(&data)
//!     .unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[3]);
//!
//! let fit = Gmm::new(2).with_seed(42).fit(&data).unwrap();
//! assert_eq!(fit.mixture.len(), 2);
//! ```

mod gmm;
mod kmeans;
mod traits;

pub use gmm::{
    e_step, initial_mixture, EmIteration, EmObserver, Gmm, GmmFit, NoopObserver, TracingObserver,
};
pub use kmeans::{assign, rss, Kmeans, KmeansFit, SeedStrategy, UNASSIGNED};
pub use traits::{Clustering, SoftClustering};
