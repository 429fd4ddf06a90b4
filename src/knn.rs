//! Nearest-neighbour baseline over raw labelled exemplars.
//!
//! No mixture is fitted: every training vector is kept, and a query takes
//! the tag of the single exemplar closest in Mahalanobis distance, using the
//! floor-clamped variance of the whole training set.

use crate::classify::Decision;
use crate::error::{Error, Result};
use crate::report::VoteTally;
use crate::stats::{self, mahalanobis, VARIANCE_FLOOR};
use ndarray::{aview1, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// An emotion tag with the feature vectors of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedExample {
    /// Emotion label.
    pub tag: String,
    /// Feature vectors in file order.
    pub data: Vec<Vec<f64>>,
}

impl TaggedExample {
    /// Create a tagged example.
    pub fn new(tag: impl Into<String>, data: Vec<Vec<f64>>) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }
}

/// Read a JSON array of [`TaggedExample`] records.
pub fn load_examples(path: impl AsRef<Path>) -> Result<Vec<TaggedExample>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

/// 1-nearest-neighbour classifier.
#[derive(Debug, Clone)]
pub struct NearestNeighbor {
    tags: Vec<String>,
    exemplars: Array2<f64>,
    owner: Vec<usize>,
    variance: Array1<f64>,
}

impl NearestNeighbor {
    /// Index every vector of every example.
    pub fn new(train: &[TaggedExample]) -> Result<Self> {
        Self::with_variance_floor(train, VARIANCE_FLOOR)
    }

    /// Like [`NearestNeighbor::new`] with an explicit variance floor.
    pub fn with_variance_floor(train: &[TaggedExample], floor: f64) -> Result<Self> {
        let mut rows = Vec::new();
        let mut owner = Vec::new();
        for (i, example) in train.iter().enumerate() {
            rows.extend(example.data.iter().cloned());
            owner.extend(std::iter::repeat(i).take(example.data.len()));
        }
        let exemplars = stats::to_matrix(&rows)?;
        let (_, variance) = stats::mean_and_variance(exemplars.view(), floor)?;
        debug!(
            examples = train.len(),
            exemplars = exemplars.nrows(),
            dim = exemplars.ncols(),
            "indexed nearest-neighbour exemplars"
        );
        Ok(Self {
            tags: train.iter().map(|e| e.tag.clone()).collect(),
            exemplars,
            owner,
            variance,
        })
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.exemplars.ncols()
    }

    /// Tag of the closest exemplar; ties go to the first one indexed.
    pub fn classify(&self, x: &[f64]) -> Result<&str> {
        if x.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        let query = aview1(x);
        let mut best = (0, f64::INFINITY);
        for (i, row) in self.exemplars.rows().into_iter().enumerate() {
            let d = mahalanobis(query, row, self.variance.view());
            if d < best.1 {
                best = (i, d);
            }
        }
        Ok(&self.tags[self.owner[best.0]])
    }

    /// Classify every vector and tally the votes.
    pub fn classify_many(&self, xs: &[Vec<f64>]) -> Result<VoteTally> {
        let mut tally = VoteTally::new(self.tags.iter().cloned());
        for x in xs {
            tally.record(&Decision::Label(self.classify(x)?.to_string()));
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training() -> Vec<TaggedExample> {
        vec![
            TaggedExample::new("calm", vec![vec![0.0, 0.0], vec![0.0, 100.0]]),
            TaggedExample::new("angry", vec![vec![2.0, 10.0], vec![2.0, 100.0]]),
        ]
    }

    #[test]
    fn test_classify_uses_variance_weighting() {
        let nn = NearestNeighbor::new(&training()).unwrap();
        // Euclidean distance would pick the exemplar at (2, 10).
        assert_eq!(nn.classify(&[0.0, 20.0]).unwrap(), "calm");
        assert_eq!(nn.classify(&[2.0, 50.0]).unwrap(), "angry");
    }

    #[test]
    fn test_ties_go_to_first_exemplar() {
        let nn = NearestNeighbor::new(&training()).unwrap();
        assert_eq!(nn.classify(&[1.0, 55.0]).unwrap(), "calm");
    }

    #[test]
    fn test_classify_many_tallies() {
        let nn = NearestNeighbor::new(&training()).unwrap();
        let tally = nn
            .classify_many(&[vec![0.1, 1.0], vec![1.9, 12.0], vec![2.1, 99.0]])
            .unwrap();
        assert_eq!(tally.count("angry"), 2);
        assert_eq!(tally.majority(), Decision::Label("angry".into()));
    }

    #[test]
    fn test_dimension_mismatch() {
        let nn = NearestNeighbor::new(&training()).unwrap();
        assert_eq!(
            nn.classify(&[1.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_load_examples_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        std::fs::write(
            &path,
            r#"[{"tag": "calm", "data": [[0.0, 1.0]]}, {"tag": "fear", "data": [[2.0, 3.0], [4.0, 5.0]]}]"#,
        )
        .unwrap();
        let examples = load_examples(&path).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[1].tag, "fear");
        assert_eq!(examples[1].data[1], vec![4.0, 5.0]);
        assert!(NearestNeighbor::new(&[]).is_err());
    }
}
