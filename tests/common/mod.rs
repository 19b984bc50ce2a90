//! Helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use embedding_verifier::credential::{Credential, CredentialSources, resolve_with};
use embedding_verifier::domain::EmbeddingVector;
use embedding_verifier::encoders::{
    EncoderError, EncoderHub, EncoderResult, ImageEncoder, TextEncoder,
};
use embedding_verifier::images::{ImageError, ImageResult, ImageSource, LoadedImage};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Keyword groups; each group is one embedding dimension.
const TOPICS: &[&[&str]] = &[
    &["beach", "sandy", "sandbeach", "sun", "sunny"],
    &["forest", "trees", "park", "green"],
    &["barbecue", "bbq", "grill", "grilling"],
    &["cat"],
    &["garden"],
    &["rain", "umbrella"],
    &["bedroom", "bed"],
    &["louvre", "museum"],
];

/// Deterministic embedding: one dimension per topic present in `content`.
pub fn topic_embedding(content: &str) -> EmbeddingVector {
    let words: Vec<String> = content
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .collect();
    TOPICS
        .iter()
        .map(|keywords| {
            if words.iter().any(|word| keywords.contains(&word.as_str())) {
                1.0
            } else {
                0.05
            }
        })
        .collect::<Vec<f32>>()
        .into()
}

/// A credential resolved from a configured fallback.
pub fn credential(token: &str) -> Credential {
    let sources = CredentialSources {
        token_file: "/nonexistent/.hf_token".into(),
        env_var: "UNUSED_TEST_TOKEN".to_string(),
        fallback: Some(token.to_string()),
    };
    resolve_with(&sources, |_| None).expect("Fallback credential should resolve")
}

/// Shared record of hub activity, in call order.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Encoder hub producing [`topic_embedding`]s for any model identifier.
///
/// Images are embedded from their locator text unless `depictions` says what
/// the image at that locator actually shows.
#[derive(Default)]
pub struct KeywordHub {
    pub failing_models: Vec<String>,
    pub depictions: HashMap<String, String>,
    pub events: EventLog,
    pub seen_tokens: Mutex<Vec<Option<String>>>,
}

impl KeywordHub {
    pub fn failing_on(models: &[&str]) -> Self {
        Self {
            failing_models: models.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn depicting(locator: &str, content: &str) -> Self {
        Self {
            depictions: HashMap::from([(locator.to_string(), content.to_string())]),
            ..Self::default()
        }
    }

    fn record_load(
        &self,
        model_id: &str,
        kind: &'static str,
        credential: Option<&Credential>,
    ) -> EncoderResult<()> {
        self.events.push(format!("load {kind} {model_id}"));
        self.seen_tokens
            .lock()
            .unwrap()
            .push(credential.map(|c| c.token().to_string()));
        if self.failing_models.iter().any(|m| m == model_id) {
            return Err(EncoderError::Load {
                model: model_id.to_string(),
                kind,
                message: "model hub unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EncoderHub for KeywordHub {
    async fn load_text_encoder(
        &self,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<Box<dyn TextEncoder>> {
        self.record_load(model_id, "text", credential)?;
        Ok(Box::new(KeywordEncoder {
            events: self.events.clone(),
            depictions: self.depictions.clone(),
        }))
    }

    async fn load_image_encoder(
        &self,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> EncoderResult<Box<dyn ImageEncoder>> {
        self.record_load(model_id, "image", credential)?;
        Ok(Box::new(KeywordEncoder {
            events: self.events.clone(),
            depictions: self.depictions.clone(),
        }))
    }
}

struct KeywordEncoder {
    events: EventLog,
    depictions: HashMap<String, String>,
}

#[async_trait]
impl TextEncoder for KeywordEncoder {
    async fn encode(&self, text: &str) -> EncoderResult<EmbeddingVector> {
        let first_word = text.split_whitespace().next().unwrap_or("");
        self.events.push(format!("text {first_word}"));
        Ok(topic_embedding(text))
    }
}

#[async_trait]
impl ImageEncoder for KeywordEncoder {
    async fn encode(&self, image: &LoadedImage) -> EncoderResult<EmbeddingVector> {
        self.events.push(format!("image {}", image.locator));
        let content = self
            .depictions
            .get(&image.locator)
            .unwrap_or(&image.locator);
        Ok(topic_embedding(content))
    }
}

/// Image source returning a blank pixel for every locator not in `missing`.
#[derive(Default)]
pub struct KeywordImages {
    pub missing: Vec<String>,
}

#[async_trait]
impl ImageSource for KeywordImages {
    async fn load(&self, locator: &str) -> ImageResult<LoadedImage> {
        if self.missing.iter().any(|m| m == locator) {
            return Err(ImageError::UnsupportedLocator(locator.to_string()));
        }
        Ok(LoadedImage {
            locator: locator.to_string(),
            format: ImageFormat::Png,
            image: DynamicImage::new_rgb8(1, 1),
        })
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let buffer = ImageBuffer::from_pixel(width, height, Rgb([10u8, 120, 200]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

/// Local HTTP server that records the head of every request it receives.
pub struct TestServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn response_for(body: Option<&Vec<u8>>) -> Vec<u8> {
    match body {
        Some(body) => {
            let mut response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            response.extend_from_slice(body);
            response
        }
        None => {
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec()
        }
    }
}

/// Serves `routes` over plain HTTP on a local port; unknown paths get 404.
pub async fn serve(routes: HashMap<String, Vec<u8>>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let address = listener.local_addr().expect("Failed to read local address");
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let routes = Arc::clone(&routes);
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buffer = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buffer).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => head.extend_from_slice(&buffer[..read]),
                    }
                }
                let request = String::from_utf8_lossy(&head).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                recorded.lock().unwrap().push(request);

                let _ = socket.write_all(&response_for(routes.get(&path))).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        base: format!("http://{address}"),
        requests,
    }
}
