//! Ordinal checks over precomputed embeddings.
//!
//! Every comparison is evaluated; a violated expectation is recorded as a
//! [`CheckFailure`] and the remaining comparisons still run.

use std::fmt;

use crate::domain::EmbeddingVector;
use crate::processing::similarity::cosine_similarity;

/// A violated relative-ordering expectation.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckFailure {
    pub message: String,
    /// Score that was expected to be higher.
    pub expected_higher: f32,
    /// Score it was compared against.
    pub compared_to: f32,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.4} <= {:.4})",
            self.message, self.expected_higher, self.compared_to
        )
    }
}

/// Outcome of one check pattern.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckReport {
    pub comparisons: usize,
    pub failures: Vec<CheckFailure>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    fn expect_greater(&mut self, higher: f32, lower: f32, message: impl FnOnce() -> String) {
        self.comparisons += 1;
        if higher > lower {
            return;
        }
        let failure = CheckFailure {
            message: message(),
            expected_higher: higher,
            compared_to: lower,
        };
        log::warn!("Ordering check failed: {failure}");
        self.failures.push(failure);
    }
}

/// Two embeddings expected to share (or not share) a topic.
pub struct Pair<'a> {
    pub label: &'a str,
    pub left: &'a EmbeddingVector,
    pub right: &'a EmbeddingVector,
}

impl Pair<'_> {
    fn similarity(&self) -> f32 {
        cosine_similarity(self.left.as_slice(), self.right.as_slice())
    }
}

/// Both within-topic pairs must score higher than the cross-topic pair.
pub fn check_intra_modal(first: &Pair<'_>, second: &Pair<'_>, cross: &Pair<'_>) -> CheckReport {
    let cross_score = cross.similarity();
    let mut report = CheckReport::default();

    for pair in [first, second] {
        report.expect_greater(pair.similarity(), cross_score, || {
            format!(
                "{} should be more similar to each other than {}",
                pair.label, cross.label
            )
        });
    }

    report
}

/// Each text and its own image must be mutual nearest neighbours.
///
/// For every index `i`, `sim(text_i, image_i)` has to beat `sim(text_j,
/// image_i)` and `sim(text_i, image_j)` for every other `j`.
///
/// # Panics
///
/// Panics if the two slices differ in length.
pub fn check_cross_modal(
    text_embeddings: &[EmbeddingVector],
    image_embeddings: &[EmbeddingVector],
) -> CheckReport {
    assert_eq!(
        text_embeddings.len(),
        image_embeddings.len(),
        "Every text needs a matching image"
    );

    let mut report = CheckReport::default();
    let count = text_embeddings.len();

    for i in 0..count {
        let pair_score =
            cosine_similarity(text_embeddings[i].as_slice(), image_embeddings[i].as_slice());

        for j in (0..count).filter(|&j| j != i) {
            let other_text =
                cosine_similarity(text_embeddings[j].as_slice(), image_embeddings[i].as_slice());
            report.expect_greater(pair_score, other_text, || {
                format!("Image {i} should be more similar to text {i} than to text {j}")
            });

            let other_image =
                cosine_similarity(text_embeddings[i].as_slice(), image_embeddings[j].as_slice());
            report.expect_greater(pair_score, other_image, || {
                format!("Text {i} should be more similar to image {i} than to image {j}")
            });
        }
    }

    report
}
