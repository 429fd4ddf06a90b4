//! Vote tallies and accuracy accounting.
//!
//! Undecided votes are counted, never folded into right or wrong: accuracy
//! denominators exclude them.

use crate::classify::{classify_majority, posterior, Decision};
use crate::knn::TaggedExample;
use crate::model::EmotionMixture;
use std::fmt;
use tracing::debug;

/// Per-label vote counts for one file or sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteTally {
    labels: Vec<String>,
    counts: Vec<usize>,
    undecided: usize,
}

impl VoteTally {
    /// Empty tally over `labels`, in that order.
    pub fn new(labels: impl IntoIterator<Item = String>) -> Self {
        let mut tally = Self::default();
        for label in labels {
            tally.position_or_insert(&label);
        }
        tally
    }

    fn position_or_insert(&mut self, label: &str) -> usize {
        match self.labels.iter().position(|l| l == label) {
            Some(i) => i,
            None => {
                self.labels.push(label.to_string());
                self.counts.push(0);
                self.labels.len() - 1
            }
        }
    }

    /// Count one vote. Labels not yet in the tally are appended.
    pub fn record(&mut self, decision: &Decision) {
        match decision {
            Decision::Label(l) => {
                let i = self.position_or_insert(l);
                self.counts[i] += 1;
            }
            Decision::Undecided => self.undecided += 1,
        }
    }

    /// Votes for `label`.
    pub fn count(&self, label: &str) -> usize {
        self.labels
            .iter()
            .position(|l| l == label)
            .map_or(0, |i| self.counts[i])
    }

    /// Votes that no mixture could decide.
    pub fn undecided(&self) -> usize {
        self.undecided
    }

    /// All votes, undecided included.
    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.undecided
    }

    /// Labels with their counts, in tally order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(String::as_str).zip(self.counts.iter().copied())
    }

    /// Label with the most votes; ties go to the earlier label.
    ///
    /// [`Decision::Undecided`] when no label received a vote.
    pub fn majority(&self) -> Decision {
        let mut best: Option<(usize, usize)> = None;
        for (i, &c) in self.counts.iter().enumerate() {
            if c > 0 && best.map_or(true, |(_, b)| c > b) {
                best = Some((i, c));
            }
        }
        match best {
            Some((i, _)) => Decision::Label(self.labels[i].clone()),
            None => Decision::Undecided,
        }
    }

    /// Share of all votes won by `label`; 0 for an empty tally.
    pub fn fraction(&self, label: &str) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(label) as f64 / total as f64,
        }
    }
}

/// Accuracy counters for one emotion class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassAccuracy {
    /// Emotion label.
    pub label: String,
    /// Files tagged with this label.
    pub files: usize,
    /// Files whose majority vote was this label.
    pub correct_files: usize,
    /// Files where no vector could be decided.
    pub undecided_files: usize,
    /// Vectors across all files.
    pub vectors: usize,
    /// Vectors classified as this label.
    pub correct_vectors: usize,
    /// Vectors every mixture assigned zero likelihood.
    pub failed_vectors: usize,
}

impl ClassAccuracy {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Correct files over decided files.
    pub fn file_accuracy(&self) -> f64 {
        ratio(self.correct_files, self.files.saturating_sub(self.undecided_files))
    }

    /// Correct vectors over vectors some mixture could score.
    pub fn vector_accuracy(&self) -> f64 {
        ratio(self.correct_vectors, self.vectors.saturating_sub(self.failed_vectors))
    }

    fn absorb(&mut self, other: &ClassAccuracy) {
        self.files += other.files;
        self.correct_files += other.correct_files;
        self.undecided_files += other.undecided_files;
        self.vectors += other.vectors;
        self.correct_vectors += other.correct_vectors;
        self.failed_vectors += other.failed_vectors;
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class accuracy table, rows in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccuracyTable {
    rows: Vec<ClassAccuracy>,
}

impl AccuracyTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn row_mut(&mut self, label: &str) -> &mut ClassAccuracy {
        let i = match self.rows.iter().position(|r| r.label == label) {
            Some(i) => i,
            None => {
                self.rows.push(ClassAccuracy::new(label));
                self.rows.len() - 1
            }
        };
        &mut self.rows[i]
    }

    /// Record a file scored by majority vote.
    pub fn record_tally(&mut self, truth: &str, tally: &VoteTally) {
        let decision = tally.majority();
        let row = self.row_mut(truth);
        row.files += 1;
        match decision.label() {
            None => row.undecided_files += 1,
            Some(l) if l == truth => row.correct_files += 1,
            Some(_) => {}
        }
        row.vectors += tally.total();
        row.correct_vectors += tally.count(truth);
        row.failed_vectors += tally.undecided();
    }

    /// Record a file scored by a single decision.
    pub fn record_decision(&mut self, truth: &str, decision: &Decision) {
        let row = self.row_mut(truth);
        row.files += 1;
        row.vectors += 1;
        match decision.label() {
            None => {
                row.undecided_files += 1;
                row.failed_vectors += 1;
            }
            Some(l) if l == truth => {
                row.correct_files += 1;
                row.correct_vectors += 1;
            }
            Some(_) => {}
        }
    }

    /// Rows in first-seen order.
    pub fn rows(&self) -> &[ClassAccuracy] {
        &self.rows
    }

    /// Row for `label`, if any file of that class was recorded.
    pub fn row(&self, label: &str) -> Option<&ClassAccuracy> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// Counters summed over every class.
    pub fn totals(&self) -> ClassAccuracy {
        let mut total = ClassAccuracy::new("total");
        for row in &self.rows {
            total.absorb(row);
        }
        total
    }
}

impl fmt::Display for AccuracyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "emotion\tfiles\tcorrect\tundecided\tfile_acc\tvectors\tcorrect\tfailed\tvector_acc"
        )?;
        for row in self.rows.iter().chain(std::iter::once(&self.totals())) {
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{:.3}\t{}\t{}\t{}\t{:.3}",
                row.label,
                row.files,
                row.correct_files,
                row.undecided_files,
                row.file_accuracy(),
                row.vectors,
                row.correct_vectors,
                row.failed_vectors,
                row.vector_accuracy(),
            )?;
        }
        Ok(())
    }
}

/// Classify each labelled file by majority vote and tabulate the results.
pub fn evaluate_files(corpus: &[TaggedExample], mixtures: &[EmotionMixture]) -> AccuracyTable {
    let mut table = AccuracyTable::new();
    for example in corpus {
        let tally = classify_majority(&example.data, mixtures);
        debug!(
            truth = %example.tag,
            decision = %tally.majority(),
            vectors = tally.total(),
            "classified file"
        );
        table.record_tally(&example.tag, &tally);
    }
    table
}

/// Soft corpus score: normalized posteriors of each vector's true label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PosteriorScore {
    /// Sum of true-label posteriors over scored vectors.
    pub total: f64,
    /// Vectors scored.
    pub vectors: usize,
    /// Vectors no mixture could score.
    pub failed: usize,
}

impl PosteriorScore {
    /// Mean true-label posterior over scored vectors.
    pub fn mean(&self) -> f64 {
        if self.vectors == 0 {
            0.0
        } else {
            self.total / self.vectors as f64
        }
    }

    /// Whether any vector was unscorable.
    pub fn failed(&self) -> bool {
        self.failed > 0
    }
}

/// Sum the normalized posterior of every example's true label.
pub fn corpus_posterior(examples: &[TaggedExample], mixtures: &[EmotionMixture]) -> PosteriorScore {
    let mut score = PosteriorScore::default();
    for example in examples {
        for x in &example.data {
            match posterior(x, &example.tag, mixtures) {
                Some(p) => {
                    score.total += p;
                    score.vectors += 1;
                }
                None => score.failed += 1,
            }
        }
    }
    score
}
