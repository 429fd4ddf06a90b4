//! Likelihood-based classification against a set of emotion mixtures.
//!
//! Every candidate mixture scores the query with
//! [`GaussianMixture::likelihood`](crate::mixture::GaussianMixture::likelihood);
//! the label with the largest score wins. A mixture that cannot score a
//! query (zero likelihood, wrong dimension) is skipped for that query only.
//! When no mixture can score it, the result is [`Decision::Undecided`].

use crate::error::Error;
use crate::model::EmotionMixture;
use crate::report::VoteTally;
use std::fmt;
use tracing::{trace, warn};

/// Outcome of classifying one vector or one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The winning emotion label.
    Label(String),
    /// No candidate could score the input.
    Undecided,
}

impl Decision {
    /// The winning label, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Decision::Label(l) => Some(l),
            Decision::Undecided => None,
        }
    }

    /// Whether classification failed for every candidate.
    pub fn is_undecided(&self) -> bool {
        matches!(self, Decision::Undecided)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Label(l) => write!(f, "{l}"),
            Decision::Undecided => write!(f, "undecided"),
        }
    }
}

/// Likelihood of `x` under each mixture, `None` where the mixture failed.
pub fn likelihoods(x: &[f64], mixtures: &[EmotionMixture]) -> Vec<Option<f64>> {
    mixtures
        .iter()
        .map(|m| match m.mixture.likelihood(x) {
            Ok(p) => Some(p),
            Err(Error::ZeroLikelihood) => {
                trace!(emotion = %m.emotion, "zero likelihood, skipping mixture");
                None
            }
            Err(e) => {
                warn!(emotion = %m.emotion, error = %e, "skipping mixture");
                None
            }
        })
        .collect()
}

/// Pick the label whose mixture gives `x` the highest likelihood.
///
/// Ties go to the earlier mixture.
pub fn classify_vector(x: &[f64], mixtures: &[EmotionMixture]) -> Decision {
    let mut best: Option<(usize, f64)> = None;
    for (j, p) in likelihoods(x, mixtures).into_iter().enumerate() {
        if let Some(p) = p {
            if best.map_or(true, |(_, b)| p > b) {
                best = Some((j, p));
            }
        }
    }
    match best {
        Some((j, _)) => Decision::Label(mixtures[j].emotion.clone()),
        None => Decision::Undecided,
    }
}

/// Classify every vector independently and tally the per-label votes.
///
/// The tally's [`VoteTally::majority`] is the file-level decision.
pub fn classify_majority(vectors: &[Vec<f64>], mixtures: &[EmotionMixture]) -> VoteTally {
    let mut tally = VoteTally::new(mixtures.iter().map(|m| m.emotion.clone()));
    for x in vectors {
        tally.record(&classify_vector(x, mixtures));
    }
    tally
}

/// Normalized posterior of every mixture for `x`: each likelihood divided by
/// the sum over all mixtures.
///
/// Failed mixtures score 0. Returns `None` when every mixture failed.
pub fn posterior_scores(x: &[f64], mixtures: &[EmotionMixture]) -> Option<Vec<f64>> {
    let scores = likelihoods(x, mixtures);
    let total: f64 = scores.iter().flatten().sum();
    if total <= 0.0 {
        return None;
    }
    Some(scores.into_iter().map(|p| p.unwrap_or(0.0) / total).collect())
}

/// Normalized posterior of `label` for `x`.
///
/// A label with no mixture scores 0. Returns `None` when every mixture
/// failed.
pub fn posterior(x: &[f64], label: &str, mixtures: &[EmotionMixture]) -> Option<f64> {
    let scores = posterior_scores(x, mixtures)?;
    Some(
        mixtures
            .iter()
            .zip(scores)
            .filter(|(m, _)| m.emotion == label)
            .map(|(_, s)| s)
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::{Gaussian, GaussianMixture};

    fn unit_at(emotion: &str, center: f64) -> EmotionMixture {
        EmotionMixture::new(
            emotion,
            GaussianMixture::new(vec![
                Gaussian::new(1.0, vec![center, center], vec![1.0, 1.0]).unwrap(),
            ])
            .unwrap(),
        )
    }

    fn models() -> Vec<EmotionMixture> {
        vec![unit_at("happy", 0.0), unit_at("sad", 4.0)]
    }

    #[test]
    fn test_classify_vector_picks_nearest_mixture() {
        let m = models();
        assert_eq!(classify_vector(&[0.2, -0.1], &m), Decision::Label("happy".into()));
        assert_eq!(classify_vector(&[3.9, 4.4], &m), Decision::Label("sad".into()));
    }

    #[test]
    fn test_tie_goes_to_first_mixture() {
        let m = models();
        assert_eq!(classify_vector(&[2.0, 2.0], &m), Decision::Label("happy".into()));
    }

    #[test]
    fn test_failed_mixture_is_skipped() {
        let mut m = models();
        m.push(EmotionMixture::new(
            "three_dim",
            GaussianMixture::new(vec![
                Gaussian::new(1.0, vec![0.0; 3], vec![1.0; 3]).unwrap(),
            ])
            .unwrap(),
        ));
        assert_eq!(classify_vector(&[4.0, 4.0], &m), Decision::Label("sad".into()));
    }

    #[test]
    fn test_undecided_when_every_mixture_fails() {
        let m = models();
        let far = [1e4, 1e4];
        assert_eq!(classify_vector(&far, &m), Decision::Undecided);
        assert_eq!(posterior_scores(&far, &m), None);
        assert_eq!(classify_vector(&[0.0], &m), Decision::Undecided);
        assert_eq!(classify_vector(&[0.0, 0.0], &[]), Decision::Undecided);
    }

    #[test]
    fn test_majority_counts_votes() {
        let m = models();
        let vectors = vec![
            vec![0.0, 0.0],
            vec![4.0, 4.0],
            vec![0.5, 0.1],
            vec![1e4, 1e4],
        ];
        let tally = classify_majority(&vectors, &m);
        assert_eq!(tally.count("happy"), 2);
        assert_eq!(tally.count("sad"), 1);
        assert_eq!(tally.undecided(), 1);
        assert_eq!(tally.majority(), Decision::Label("happy".into()));
    }

    #[test]
    fn test_posteriors_sum_to_one() {
        let m = models();
        let scores = posterior_scores(&[1.0, 1.5], &m).unwrap();
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(scores[0] > scores[1]);

        let happy = posterior(&[1.0, 1.5], "happy", &m).unwrap();
        assert!((happy - scores[0]).abs() < 1e-15);
        assert_eq!(posterior(&[1.0, 1.5], "angry", &m), Some(0.0));
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Label("calm".into()).to_string(), "calm");
        assert_eq!(Decision::Undecided.to_string(), "undecided");
        assert!(Decision::Undecided.label().is_none());
    }
}
