//! Trained models: one labelled mixture per emotion class, and their JSON
//! interchange format.
//!
//! A class record is
//!
//! ```json
//! {"emotion": "happiness", "mixture": [{"phi": 0.4, "mean": [..], "variance": [..]}, ..]}
//! ```
//!
//! and the fusion variant adds a top-level `"alpha"` weight. A model set is a
//! directory holding one record per file, loaded back in file-name order.

use crate::cluster::Gmm;
use crate::error::{Error, Result};
use crate::mixture::GaussianMixture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// An emotion label bound to its trained mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionMixture {
    /// Emotion tag.
    pub emotion: String,
    /// Mixture trained on that emotion's feature vectors.
    pub mixture: GaussianMixture,
}

impl EmotionMixture {
    /// Bind a label to a mixture.
    pub fn new(emotion: impl Into<String>, mixture: GaussianMixture) -> Self {
        Self {
            emotion: emotion.into(),
            mixture,
        }
    }

    /// Train a mixture on one class's feature vectors.
    pub fn train(emotion: impl Into<String>, data: &[Vec<f64>], gmm: &Gmm) -> Result<Self> {
        let emotion = emotion.into();
        let fit = gmm.fit(data)?;
        info!(
            emotion = %emotion,
            vectors = data.len(),
            steps = fit.iterations,
            log_likelihood = fit.log_likelihood,
            converged = fit.converged,
            "trained emotion mixture"
        );
        Ok(Self::new(emotion, fit.mixture))
    }
}

/// An [`EmotionMixture`] with the fusion weight of its modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEmotionMixture {
    /// Fusion weight; identical for every entry of one modality.
    pub alpha: f64,
    /// The labelled mixture.
    #[serde(flatten)]
    pub model: EmotionMixture,
}

/// A record that can live in a model directory.
pub trait ModelRecord: Serialize + DeserializeOwned {
    /// Emotion label, used as the file stem when saving.
    fn emotion(&self) -> &str;

    /// Reject records whose mixture is malformed.
    fn validate(&self) -> Result<()>;
}

impl ModelRecord for EmotionMixture {
    fn emotion(&self) -> &str {
        &self.emotion
    }

    fn validate(&self) -> Result<()> {
        self.mixture.validate()
    }
}

impl ModelRecord for WeightedEmotionMixture {
    fn emotion(&self) -> &str {
        &self.model.emotion
    }

    fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: "must be finite",
            });
        }
        self.model.validate()
    }
}

/// The trained mixtures of one modality plus its fusion weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityModel {
    /// Fusion weight.
    pub alpha: f64,
    /// One mixture per emotion class.
    pub mixtures: Vec<EmotionMixture>,
}

impl ModalityModel {
    /// Create a modality model.
    pub fn new(alpha: f64, mixtures: Vec<EmotionMixture>) -> Self {
        Self { alpha, mixtures }
    }

    /// Split a weighted record set into one weight and plain mixtures.
    ///
    /// Every record must carry the same `alpha`.
    pub fn from_weighted(records: &[WeightedEmotionMixture]) -> Result<Self> {
        let first = records.first().ok_or(Error::EmptyInput)?;
        if records.iter().any(|r| r.alpha != first.alpha) {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: "entries of one modality must share a fusion weight",
            });
        }
        Ok(Self {
            alpha: first.alpha,
            mixtures: records.iter().map(|r| r.model.clone()).collect(),
        })
    }

    /// Attach `alpha` to every mixture.
    pub fn to_weighted(&self) -> Vec<WeightedEmotionMixture> {
        self.mixtures
            .iter()
            .map(|m| WeightedEmotionMixture {
                alpha: self.alpha,
                model: m.clone(),
            })
            .collect()
    }

    /// Class labels in model order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.mixtures.iter().map(|m| m.emotion.as_str())
    }
}

/// Write one record as JSON.
pub fn save_model<T: ModelRecord>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, record)?;
    Ok(())
}

/// Read and validate one JSON record.
pub fn load_model<T: ModelRecord>(path: impl AsRef<Path>) -> Result<T> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let record: T = serde_json::from_reader(reader)?;
    record.validate()?;
    Ok(record)
}

/// Write every record to `dir/<emotion>.json`, creating `dir` if needed.
pub fn save_model_dir<T: ModelRecord>(dir: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for record in records {
        let name = record.emotion();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::InvalidParameter {
                name: "emotion",
                message: "label must be usable as a file name",
            });
        }
        save_model(dir.join(format!("{name}.json")), record)?;
    }
    debug!(dir = %dir.display(), records = records.len(), "saved model set");
    Ok(())
}

/// Load every regular file in `dir` as a record, in file-name order.
pub fn load_model_dir<T: ModelRecord>(dir: impl AsRef<Path>) -> Result<Vec<T>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let records = paths.iter().map(load_model).collect::<Result<Vec<T>>>()?;
    debug!(dir = %dir.display(), records = records.len(), "loaded model set");
    Ok(records)
}
