use async_trait::async_trait;
use thiserror::Error;

use crate::credential::Credential;
use crate::domain::EmbeddingVector;
use crate::images::LoadedImage;

pub mod local;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("unknown model identifier: {0}")]
    UnknownModel(String),
    #[error("failed to load {kind} encoder for {model}: {message}")]
    Load {
        model: String,
        kind: &'static str,
        message: String,
    },
    #[error("failed to fetch {file} for {model}: {message}")]
    Fetch {
        model: String,
        file: String,
        message: String,
    },
    #[error("failed to encode {0}")]
    Encode(String),
    #[error("encoder returned no embedding for {0}")]
    EmptyOutput(String),
    #[error("encoder task failed: {0}")]
    Task(String),
}

pub type EncoderResult<T> = Result<T, EncoderError>;

/// Source of pretrained encoders, addressed by model identifier.
#[async_trait]
pub trait EncoderHub: Send + Sync {
    /// Fetches (or reuses cached) text-encoder artefacts for `model_id`.
    async fn load_text_encoder(
        &self,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<Box<dyn TextEncoder>>;

    /// Fetches (or reuses cached) image-encoder artefacts for `model_id`.
    async fn load_image_encoder(
        &self,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<Box<dyn ImageEncoder>>;
}

#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode(&self, text: &str) -> EncoderResult<EmbeddingVector>;
}

#[async_trait]
pub trait ImageEncoder: Send + Sync {
    async fn encode(&self, image: &LoadedImage) -> EncoderResult<EmbeddingVector>;
}

/// Shortens long captions for log and error messages.
pub(crate) fn preview(text: &str) -> String {
    const LIMIT: usize = 48;
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("\"{}...\"", &text[..end]),
        None => format!("\"{text}\""),
    }
}
