//! Per-model verification runs.
//!
//! A run acquires the model's encoders, embeds every fixture one at a time and
//! evaluates the ordering checks. Models are processed strictly in sequence.

use thiserror::Error;

use crate::credential::Credential;
use crate::domain::{EmbeddingVector, SampleSet};
use crate::encoders::{EncoderError, EncoderHub, TextEncoder, preview};
use crate::images::{ImageError, ImageSource};
use crate::processing::checks::{CheckReport, Pair, check_cross_modal, check_intra_modal};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Encoder(#[from] EncoderError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("text check needs exactly four texts (two per topic), got {0}")]
    TextLayout(usize),
    #[error("nearest-neighbour check needs at least two captioned images, got {0}")]
    TooFewImages(usize),
    #[error("sample {index} ({text}) has no image")]
    MissingImage { index: usize, text: String },
}

pub type VerifyResult<T> = Result<T, VerifyError>;

/// What to do with the remaining models once one of them fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPolicy {
    FailFast,
    ContinueOnError,
}

/// Check results for one model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelReport {
    pub text: CheckReport,
    pub image: CheckReport,
}

impl ModelReport {
    pub fn passed(&self) -> bool {
        self.text.passed() && self.image.passed()
    }
}

#[derive(Debug)]
pub enum ModelOutcome {
    Checked(ModelReport),
    Failed(VerifyError),
    Skipped,
}

impl ModelOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ModelOutcome::Checked(report) if report.passed())
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, ModelOutcome)>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, outcome)| outcome.passed())
    }

    pub fn outcome(&self, model_id: &str) -> Option<&ModelOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == model_id)
            .map(|(_, outcome)| outcome)
    }
}

/// Embeds fixtures with encoders from `hub` and checks their ordering.
pub struct Verifier<'a> {
    hub: &'a dyn EncoderHub,
    images: &'a dyn ImageSource,
    credential: Option<&'a Credential>,
}

impl<'a> Verifier<'a> {
    pub fn new(
        hub: &'a dyn EncoderHub,
        images: &'a dyn ImageSource,
        credential: Option<&'a Credential>,
    ) -> Self {
        Self {
            hub,
            images,
            credential,
        }
    }

    /// Texts 0 and 1 share a topic, as do texts 2 and 3; both pairs must be
    /// closer than texts 0 and 2.
    pub async fn verify_text_embeddings(
        &self,
        model_id: &str,
        texts: &SampleSet,
    ) -> VerifyResult<CheckReport> {
        let encoder = self.hub.load_text_encoder(model_id, self.credential).await?;
        check_texts(encoder.as_ref(), texts).await
    }

    /// Every captioned sample's text and image must be mutual nearest
    /// neighbours among the set.
    pub async fn verify_image_embeddings(
        &self,
        model_id: &str,
        captioned: &SampleSet,
    ) -> VerifyResult<CheckReport> {
        let encoder = self.hub.load_text_encoder(model_id, self.credential).await?;
        self.check_images(model_id, encoder.as_ref(), captioned).await
    }

    /// Runs both checks, sharing one text encoder between them.
    pub async fn verify_model(
        &self,
        model_id: &str,
        texts: &SampleSet,
        captioned: &SampleSet,
    ) -> VerifyResult<ModelReport> {
        log::info!("Verifying model {model_id}");
        let text_encoder = self.hub.load_text_encoder(model_id, self.credential).await?;

        let text = check_texts(text_encoder.as_ref(), texts).await?;
        let image = self
            .check_images(model_id, text_encoder.as_ref(), captioned)
            .await?;

        let report = ModelReport { text, image };
        log::info!(
            "Finished model {model_id}: {} text and {} cross-modal comparisons, {} failed",
            report.text.comparisons,
            report.image.comparisons,
            report.text.failures.len() + report.image.failures.len()
        );
        Ok(report)
    }

    async fn check_images(
        &self,
        model_id: &str,
        text_encoder: &dyn TextEncoder,
        captioned: &SampleSet,
    ) -> VerifyResult<CheckReport> {
        validate_captioned(captioned)?;
        let image_encoder = self.hub.load_image_encoder(model_id, self.credential).await?;

        let mut text_embeddings = Vec::with_capacity(captioned.len());
        let mut image_embeddings = Vec::with_capacity(captioned.len());
        for (text, locator) in captioned.captioned() {
            let image = self.images.load(locator).await?;
            text_embeddings.push(text_encoder.encode(text).await?);
            image_embeddings.push(image_encoder.encode(&image).await?);
        }

        Ok(check_cross_modal(&text_embeddings, &image_embeddings))
    }
}

/// Every sample needs an image, and a nearest neighbour needs a rival.
fn validate_captioned(captioned: &SampleSet) -> VerifyResult<()> {
    if let Some((index, sample)) = captioned
        .samples()
        .iter()
        .enumerate()
        .find(|(_, sample)| sample.image.is_none())
    {
        return Err(VerifyError::MissingImage {
            index,
            text: preview(&sample.text),
        });
    }
    if captioned.len() < 2 {
        return Err(VerifyError::TooFewImages(captioned.len()));
    }
    Ok(())
}

async fn check_texts(encoder: &dyn TextEncoder, texts: &SampleSet) -> VerifyResult<CheckReport> {
    if texts.len() != 4 {
        return Err(VerifyError::TextLayout(texts.len()));
    }

    let mut embeddings: Vec<EmbeddingVector> = Vec::with_capacity(texts.len());
    for text in texts.texts() {
        embeddings.push(encoder.encode(text).await?);
    }

    Ok(check_intra_modal(
        &Pair {
            label: "Texts 0 and 1",
            left: &embeddings[0],
            right: &embeddings[1],
        },
        &Pair {
            label: "Texts 2 and 3",
            left: &embeddings[2],
            right: &embeddings[3],
        },
        &Pair {
            label: "texts 0 and 2 are",
            left: &embeddings[0],
            right: &embeddings[2],
        },
    ))
}

/// Verifies each model in order.
///
/// With [`RunPolicy::FailFast`] the first model that errors or fails a check
/// stops the sequence and later models are reported as skipped.
pub async fn verify_models(
    verifier: &Verifier<'_>,
    models: &[String],
    texts: &SampleSet,
    captioned: &SampleSet,
    policy: RunPolicy,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut halted = false;

    for model_id in models {
        if halted {
            log::warn!("Skipping model {model_id} after an earlier failure");
            summary.outcomes.push((model_id.clone(), ModelOutcome::Skipped));
            continue;
        }

        let outcome = match verifier.verify_model(model_id, texts, captioned).await {
            Ok(report) => ModelOutcome::Checked(report),
            Err(e) => {
                log::error!("Model {model_id} could not be verified: {e}");
                ModelOutcome::Failed(e)
            }
        };

        halted = policy == RunPolicy::FailFast && !outcome.passed();
        summary.outcomes.push((model_id.clone(), outcome));
    }

    summary
}
