//! Training configuration.
//!
//! Every tunable of a training run in one serde record, so a run can be
//! described by a JSON file. Missing fields take their defaults:
//!
//! ```json
//! {"n_components": 4, "seed_strategy": "farthest-point", "seed": 7}
//! ```

use crate::cluster::{Gmm, Kmeans, SeedStrategy};
use crate::error::{Error, Result};
use crate::stats::VARIANCE_FLOOR;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for K-means seeding and EM refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Mixture components per emotion class.
    pub n_components: usize,
    /// How K-means picks its initial centroids.
    pub seed_strategy: SeedStrategy,
    /// Fixed seed; `None` draws from the thread RNG.
    pub seed: Option<u64>,
    /// Cap on K-means assign/update iterations.
    pub kmeans_max_iter: usize,
    /// Early stop once RSS moves less than this.
    pub kmeans_tol: f64,
    /// Cap on EM iterations.
    pub em_max_iter: usize,
    /// Convergence threshold on the log-likelihood change.
    pub em_tol: f64,
    /// Responsibilities more than this many nats below a row's best are
    /// zeroed.
    pub prune_threshold: f64,
    /// Lower bound on every variance. Never below [`VARIANCE_FLOOR`], which
    /// saved models are checked against.
    pub variance_floor: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_components: 8,
            seed_strategy: SeedStrategy::Random,
            seed: None,
            kmeans_max_iter: 100,
            kmeans_tol: 1e-7,
            em_max_iter: 200,
            em_tol: 1e-5,
            prune_threshold: 10.0,
            variance_floor: VARIANCE_FLOOR,
        }
    }
}

impl TrainingConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Reject values no training run can use.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(Error::InvalidParameter {
                name: "n_components",
                message: "must be at least 1",
            });
        }
        if self.kmeans_max_iter == 0 || self.em_max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "iteration caps must be at least 1",
            });
        }
        if !(self.variance_floor.is_finite() && self.variance_floor >= VARIANCE_FLOOR) {
            return Err(Error::InvalidParameter {
                name: "variance_floor",
                message: "must be finite and at least 1e-5",
            });
        }
        if [self.kmeans_tol, self.em_tol].iter().any(|t| t.is_nan() || *t < 0.0) {
            return Err(Error::InvalidParameter {
                name: "tol",
                message: "tolerances must be >= 0",
            });
        }
        if self.prune_threshold.is_nan() || self.prune_threshold <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "prune_threshold",
                message: "must be > 0",
            });
        }
        Ok(())
    }

    /// The configured K-means seeder.
    pub fn kmeans(&self) -> Kmeans {
        let kmeans = Kmeans::new(self.n_components)
            .with_max_iter(self.kmeans_max_iter)
            .with_tol(self.kmeans_tol)
            .with_seed_strategy(self.seed_strategy)
            .with_variance_floor(self.variance_floor);
        match self.seed {
            Some(seed) => kmeans.with_seed(seed),
            None => kmeans,
        }
    }

    /// The configured mixture trainer.
    pub fn gmm(&self) -> Gmm {
        Gmm::new(self.n_components)
            .with_max_iter(self.em_max_iter)
            .with_tol(self.em_tol)
            .with_prune_threshold(self.prune_threshold)
            .with_kmeans(self.kmeans())
            .with_variance_floor(self.variance_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = TrainingConfig::from_json_str(r#"{"n_components": 3, "seed": 11}"#).unwrap();
        assert_eq!(config.n_components, 3);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.em_max_iter, 200);
        assert_eq!(config.em_tol, 1e-5);
        assert_eq!(config.variance_floor, 1e-5);
        assert_eq!(config.seed_strategy, SeedStrategy::Random);
    }

    #[test]
    fn test_seed_strategy_spelling() {
        let config =
            TrainingConfig::from_json_str(r#"{"seed_strategy": "farthest-point"}"#).unwrap();
        assert_eq!(config.seed_strategy, SeedStrategy::FarthestPoint);
        assert!(TrainingConfig::from_json_str(r#"{"seed_strategy": "kmeans++"}"#).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TrainingConfig::from_json_str(r#"{"n_components": 0}"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{"variance_floor": 0.0}"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{"variance_floor": 1e-6}"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{"variance_floor": 1e-3}"#).is_ok());
        assert!(TrainingConfig::from_json_str(r#"{"em_tol": -1.0}"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{"prune_threshold": 0.0}"#).is_err());
    }

    #[test]
    fn test_builds_configured_estimators() {
        let config = TrainingConfig {
            n_components: 2,
            seed: Some(5),
            seed_strategy: SeedStrategy::FarthestPoint,
            ..TrainingConfig::default()
        };
        let kmeans = config.kmeans();
        assert_eq!(kmeans.seed(), Some(5));
        assert_eq!(config.gmm().kmeans(), &kmeans);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        std::fs::write(&path, r#"{"em_max_iter": 50}"#).unwrap();
        assert_eq!(TrainingConfig::from_json_file(&path).unwrap().em_max_iter, 50);
    }
}
