//! Encoders backed by `fastembed` ONNX models.
//!
//! Each supported identifier names a text model and a vision model trained
//! into the same embedding space, so their outputs can be compared directly.
//! Model files are fetched from the hub with `hf-hub`, which attaches the
//! resolved credential to every request, and handed to fastembed as
//! user-defined models.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{
    ImageEmbedding, ImageInitOptionsUserDefined, InitOptionsUserDefined, Pooling, TextEmbedding,
    TokenizerFiles, UserDefinedEmbeddingModel, UserDefinedImageEmbeddingModel,
};
use hf_hub::api::tokio::{ApiBuilder, ApiRepo};

use crate::credential::Credential;
use crate::domain::EmbeddingVector;
use crate::encoders::{EncoderError, EncoderHub, EncoderResult, ImageEncoder, TextEncoder, preview};
use crate::images::LoadedImage;

/// Hub repositories backing one model identifier.
#[derive(Clone, Copy, Debug)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub text_repo: &'static str,
    pub text_onnx: &'static str,
    pub vision_repo: &'static str,
    pub vision_onnx: &'static str,
    /// Token limit of the text model's position embeddings.
    pub max_length: usize,
}

/// Model identifiers understood by [`FastembedHub`].
pub const MODEL_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "Qdrant/clip-ViT-B-32",
        text_repo: "Qdrant/clip-ViT-B-32-text",
        text_onnx: "model.onnx",
        vision_repo: "Qdrant/clip-ViT-B-32-vision",
        vision_onnx: "model.onnx",
        max_length: 77,
    },
    CatalogEntry {
        id: "nomic-ai/nomic-embed-v1.5",
        text_repo: "nomic-ai/nomic-embed-text-v1.5",
        text_onnx: "onnx/model.onnx",
        vision_repo: "nomic-ai/nomic-embed-vision-v1.5",
        vision_onnx: "onnx/model.onnx",
        max_length: 512,
    },
];

pub fn catalog_entry(model_id: &str) -> EncoderResult<&'static CatalogEntry> {
    MODEL_CATALOG
        .iter()
        .find(|entry| entry.id == model_id)
        .ok_or_else(|| EncoderError::UnknownModel(model_id.to_string()))
}

/// Loads encoders from the model hub, caching artefacts on disk.
#[derive(Clone, Debug)]
pub struct FastembedHub {
    cache_dir: PathBuf,
    endpoint: Option<String>,
    show_download_progress: bool,
}

impl FastembedHub {
    pub fn new(cache_dir: impl Into<PathBuf>, show_download_progress: bool) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            endpoint: None,
            show_download_progress,
        }
    }

    /// Uses a hub mirror instead of the public endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn repo(
        &self,
        model_id: &str,
        repo: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<ApiRepo> {
        match credential {
            Some(credential) => {
                log::debug!("Fetching {repo} with credential from {}", credential.source())
            }
            None => log::debug!("Fetching {repo} anonymously"),
        }

        let mut builder = ApiBuilder::new()
            .with_token(credential.map(|c| c.token().to_string()))
            .with_cache_dir(self.cache_dir.clone())
            .with_progress(self.show_download_progress);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        let api = builder.build().map_err(|e| EncoderError::Fetch {
            model: model_id.to_string(),
            file: repo.to_string(),
            message: e.to_string(),
        })?;
        Ok(api.model(repo.to_string()))
    }
}

/// Downloads (or reuses the cached copy of) one file and reads it.
async fn fetch(model_id: &str, repo: &ApiRepo, file: &str) -> EncoderResult<Vec<u8>> {
    let fetch_error = |message: String| EncoderError::Fetch {
        model: model_id.to_string(),
        file: file.to_string(),
        message,
    };
    let path = repo.get(file).await.map_err(|e| fetch_error(e.to_string()))?;
    tokio::fs::read(&path)
        .await
        .map_err(|e| fetch_error(format!("{}: {e}", path.display())))
}

async fn run_blocking<T, F>(task: F) -> EncoderResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> EncoderResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| EncoderError::Task(e.to_string()))?
}

#[async_trait]
impl EncoderHub for FastembedHub {
    async fn load_text_encoder(
        &self,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<Box<dyn TextEncoder>> {
        let entry = catalog_entry(model_id)?;
        let repo = self.repo(model_id, entry.text_repo, credential)?;

        let onnx_file = fetch(model_id, &repo, entry.text_onnx).await?;
        let tokenizer_files = TokenizerFiles {
            tokenizer_file: fetch(model_id, &repo, "tokenizer.json").await?,
            config_file: fetch(model_id, &repo, "config.json").await?,
            special_tokens_map_file: fetch(model_id, &repo, "special_tokens_map.json").await?,
            tokenizer_config_file: fetch(model_id, &repo, "tokenizer_config.json").await?,
        };
        let model =
            UserDefinedEmbeddingModel::new(onnx_file, tokenizer_files).with_pooling(Pooling::Mean);
        let options = InitOptionsUserDefined::new().with_max_length(entry.max_length);

        let id = model_id.to_string();
        let embedding = run_blocking(move || {
            TextEmbedding::try_new_from_user_defined(model, options).map_err(|e| {
                EncoderError::Load {
                    model: id,
                    kind: "text",
                    message: format!("{e:?}"),
                }
            })
        })
        .await?;

        log::info!("Loaded text encoder for {model_id}");
        Ok(Box::new(FastembedTextEncoder {
            model: Arc::new(Mutex::new(embedding)),
        }))
    }

    async fn load_image_encoder(
        &self,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<Box<dyn ImageEncoder>> {
        let entry = catalog_entry(model_id)?;
        let repo = self.repo(model_id, entry.vision_repo, credential)?;

        let onnx_file = fetch(model_id, &repo, entry.vision_onnx).await?;
        let preprocessor_file = fetch(model_id, &repo, "preprocessor_config.json").await?;
        let model = UserDefinedImageEmbeddingModel::new(onnx_file, preprocessor_file);

        let id = model_id.to_string();
        let embedding = run_blocking(move || {
            ImageEmbedding::try_new_from_user_defined(model, ImageInitOptionsUserDefined::default())
                .map_err(|e| EncoderError::Load {
                    model: id,
                    kind: "image",
                    message: format!("{e:?}"),
                })
        })
        .await?;

        log::info!("Loaded image encoder for {model_id}");
        Ok(Box::new(FastembedImageEncoder {
            model: Arc::new(Mutex::new(embedding)),
        }))
    }
}

struct FastembedTextEncoder {
    model: Arc<Mutex<TextEmbedding>>,
}

#[async_trait]
impl TextEncoder for FastembedTextEncoder {
    async fn encode(&self, text: &str) -> EncoderResult<EmbeddingVector> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        run_blocking(move || {
            let label = preview(&text);
            let mut model = model
                .lock()
                .map_err(|e| EncoderError::Task(format!("Lock poisoned: {e}")))?;
            model
                .embed(vec![text], None)
                .map_err(|e| EncoderError::Encode(format!("{label}: {e:?}")))?
                .into_iter()
                .next()
                .map(EmbeddingVector::from)
                .ok_or(EncoderError::EmptyOutput(label))
        })
        .await
    }
}

struct FastembedImageEncoder {
    model: Arc<Mutex<ImageEmbedding>>,
}

#[async_trait]
impl ImageEncoder for FastembedImageEncoder {
    async fn encode(&self, image: &LoadedImage) -> EncoderResult<EmbeddingVector> {
        let model = Arc::clone(&self.model);
        let decoded = image.image.clone();
        let locator = image.locator.clone();
        run_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| EncoderError::Task(format!("Lock poisoned: {e}")))?;
            model
                .embed_images(vec![decoded])
                .map_err(|e| EncoderError::Encode(format!("image {locator}: {e:?}")))?
                .into_iter()
                .next()
                .map(EmbeddingVector::from)
                .ok_or(EncoderError::EmptyOutput(locator))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique_and_resolvable() {
        for entry in MODEL_CATALOG {
            assert_eq!(catalog_entry(entry.id).unwrap().id, entry.id);
            assert_eq!(
                MODEL_CATALOG.iter().filter(|other| other.id == entry.id).count(),
                1
            );
        }
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let hub = FastembedHub::new(dir.path(), false).with_endpoint("http://127.0.0.1:9");

        let text = hub.load_text_encoder("acme/unknown", None).await;
        let image = hub.load_image_encoder("acme/unknown", None).await;

        assert!(matches!(text, Err(EncoderError::UnknownModel(id)) if id == "acme/unknown"));
        assert!(matches!(image, Err(EncoderError::UnknownModel(_))));
    }
}
