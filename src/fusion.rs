//! Two-modality score fusion.
//!
//! Each modality scores every label, then the fused score of label `e` is
//!
//! ```text
//! S(e) = α_A · score_A(e) + α_B · score_B(e)
//! ```
//!
//! where `score_X` is either the share of votes `e` won over a sequence
//! ([`fuse_votes`]) or the normalized posterior of `e` for one paired vector
//! ([`fuse_posterior`]). The weights are calibrated elsewhere. Sequences are
//! truncated to a common length before pairing.

use crate::classify::{classify_majority, posterior_scores, Decision};
use crate::model::ModalityModel;
use crate::report::VoteTally;
use crate::sequence::align_lengths;
use tracing::debug;

/// One modality's weight and per-label scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityScores {
    /// Fusion weight.
    pub alpha: f64,
    /// Score per label; repeated labels add up.
    pub scores: Vec<(String, f64)>,
}

impl ModalityScores {
    /// Pair a weight with its scores.
    pub fn new(alpha: f64, scores: Vec<(String, f64)>) -> Self {
        Self { alpha, scores }
    }

    fn score(&self, label: &str) -> f64 {
        self.scores
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, s)| s)
            .sum()
    }
}

/// Weighted combination of two modalities' scores.
///
/// Labels appear in first-seen order, `a` before `b`; a label missing from
/// one modality scores 0 there.
pub fn fuse_scores(a: &ModalityScores, b: &ModalityScores) -> Vec<(String, f64)> {
    let mut labels: Vec<&str> = Vec::new();
    for (l, _) in a.scores.iter().chain(&b.scores) {
        if !labels.contains(&l.as_str()) {
            labels.push(l);
        }
    }
    labels
        .into_iter()
        .map(|l| (l.to_string(), a.alpha * a.score(l) + b.alpha * b.score(l)))
        .collect()
}

/// Label with the largest positive fused score; ties go to the earlier label.
pub fn best_label(fused: &[(String, f64)]) -> Decision {
    let mut best: Option<(&str, f64)> = None;
    for (l, s) in fused {
        if *s > 0.0 && best.map_or(true, |(_, b)| *s > b) {
            best = Some((l.as_str(), *s));
        }
    }
    best.map_or(Decision::Undecided, |(l, _)| Decision::Label(l.to_string()))
}

fn vote_scores(model: &ModalityModel, tally: &VoteTally) -> ModalityScores {
    ModalityScores::new(
        model.alpha,
        model
            .labels()
            .map(|l| (l.to_string(), tally.fraction(l)))
            .collect(),
    )
}

/// Fuse per-modality vote shares over two time-aligned sequences.
pub fn fuse_votes(
    a: &ModalityModel,
    a_vectors: &[Vec<f64>],
    b: &ModalityModel,
    b_vectors: &[Vec<f64>],
) -> Decision {
    let (a_vectors, b_vectors) = align_lengths(a_vectors, b_vectors);
    let a_tally = classify_majority(a_vectors, &a.mixtures);
    let b_tally = classify_majority(b_vectors, &b.mixtures);
    let fused = fuse_scores(&vote_scores(a, &a_tally), &vote_scores(b, &b_tally));
    let decision = best_label(&fused);
    debug!(
        vectors = a_vectors.len(),
        decision = %decision,
        "fused vote shares"
    );
    decision
}

fn posterior_modality(model: &ModalityModel, x: &[f64]) -> ModalityScores {
    let scores = posterior_scores(x, &model.mixtures)
        .unwrap_or_else(|| vec![0.0; model.mixtures.len()]);
    ModalityScores::new(
        model.alpha,
        model.labels().map(str::to_string).zip(scores).collect(),
    )
}

/// Fuse normalized posteriors for one paired vector.
///
/// A modality whose mixtures all fail contributes nothing; if both fail the
/// result is [`Decision::Undecided`].
pub fn fuse_posterior(a: &ModalityModel, xa: &[f64], b: &ModalityModel, xb: &[f64]) -> Decision {
    let fused = fuse_scores(&posterior_modality(a, xa), &posterior_modality(b, xb));
    best_label(&fused)
}

/// Fuse posteriors pair by pair over two aligned sequences and tally the
/// per-pair winners.
pub fn fuse_posterior_sequence(
    a: &ModalityModel,
    a_vectors: &[Vec<f64>],
    b: &ModalityModel,
    b_vectors: &[Vec<f64>],
) -> VoteTally {
    let (a_vectors, b_vectors) = align_lengths(a_vectors, b_vectors);
    let mut tally = VoteTally::new(a.labels().chain(b.labels()).map(str::to_string));
    for (xa, xb) in a_vectors.iter().zip(b_vectors) {
        tally.record(&fuse_posterior(a, xa, b, xb));
    }
    tally
}
