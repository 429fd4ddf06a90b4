//! # emomix
//!
//! Emotion classification from biosignal feature vectors (EEG band powers,
//! speech cepstra) with diagonal-covariance Gaussian mixtures.
//!
//! One mixture is trained per emotion class: K-means (Mahalanobis distance,
//! random or farthest-point seeding) seeds it, EM in log space refines it.
//! A query vector takes the label of the mixture that gives it the highest
//! likelihood; a file takes the majority of its vectors' labels; two
//! modalities combine through weighted scores.
//!
//! ```rust
//! use emomix::{classify_vector, Decision, EmotionMixture, Gmm};
//!
//! let calm: Vec<Vec<f64>> = (0..20).map(|i| vec![(i % 5) as f64 * 0.1, (i % 4) as f64 * 0.1]).collect();
//! let angry: Vec<Vec<f64>> = calm.iter().map(|x| vec![x[0] + 8.0, x[1] + 8.0]).collect();
//!
//! let gmm = Gmm::new(1).with_seed(0);
//! let models = vec![
//!     EmotionMixture::train("calm", &calm, &gmm).unwrap(),
//!     EmotionMixture::train("angry", &angry, &gmm).unwrap(),
//! ];
//!
//! assert_eq!(classify_vector(&[8.1, 8.2], &models), Decision::Label("angry".into()));
//! ```

pub mod classify;
pub mod cluster;
pub mod config;
/// Error types used across `emomix`.
pub mod error;
pub mod fusion;
pub mod knn;
pub mod mixture;
pub mod model;
pub mod report;
pub mod sequence;
pub mod stats;

#[cfg(test)]
mod pipeline_tests;

pub use classify::{classify_majority, classify_vector, posterior, posterior_scores, Decision};
pub use cluster::{Clustering, EmObserver, Gmm, GmmFit, Kmeans, KmeansFit, SeedStrategy, SoftClustering};
pub use config::TrainingConfig;
pub use error::{Error, Result};
pub use fusion::{fuse_posterior, fuse_posterior_sequence, fuse_scores, fuse_votes, ModalityScores};
pub use knn::{NearestNeighbor, TaggedExample};
pub use mixture::{Gaussian, GaussianMixture};
pub use model::{
    load_model, load_model_dir, save_model, save_model_dir, EmotionMixture, ModalityModel,
    WeightedEmotionMixture,
};
pub use report::{corpus_posterior, evaluate_files, AccuracyTable, VoteTally};
