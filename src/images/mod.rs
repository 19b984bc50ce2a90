//! Resolution of image locators into decoded in-memory images.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),
    #[error("unsupported image locator: {0}")]
    UnsupportedLocator(String),
    #[error("could not fetch image from {locator}: {source}")]
    Request {
        locator: String,
        source: reqwest::Error,
    },
    #[error("could not fetch image from {locator}: HTTP {status}")]
    Status {
        locator: String,
        status: reqwest::StatusCode,
    },
    #[error("could not read image from {locator}: {source}")]
    Io {
        locator: String,
        source: std::io::Error,
    },
    #[error("could not decode image from {locator}: {source}")]
    Decode {
        locator: String,
        source: image::ImageError,
    },
}

pub type ImageResult<T> = Result<T, ImageError>;

/// An image that has been fetched and successfully decoded.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub locator: String,
    pub format: ImageFormat,
    pub image: DynamicImage,
}

impl LoadedImage {
    /// Decodes `bytes`, failing with an error naming `locator`.
    pub fn decode(locator: &str, bytes: &[u8]) -> ImageResult<Self> {
        let decode_error = |source| ImageError::Decode {
            locator: locator.to_string(),
            source,
        };
        let format = image::guess_format(bytes).map_err(decode_error)?;
        let image = image::load_from_memory_with_format(bytes, format).map_err(decode_error)?;
        Ok(Self {
            locator: locator.to_string(),
            format,
            image,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Resolves image locators to decoded images.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, locator: &str) -> ImageResult<LoadedImage>;
}

pub fn build_reqwest_client(timeout: Duration) -> ImageResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ImageError::Build(e.to_string()))
}

/// Loads images from `http(s)://` URLs, `file://` URLs and plain paths.
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> ImageResult<Self> {
        Ok(Self {
            client: build_reqwest_client(timeout)?,
        })
    }

    async fn fetch(&self, locator: &str) -> ImageResult<Vec<u8>> {
        let request_error = |source| ImageError::Request {
            locator: locator.to_string(),
            source,
        };
        let res = self.client.get(locator).send().await.map_err(request_error)?;
        if !res.status().is_success() {
            log::error!("Failed to get URL {}: {}", locator, res.status());
            return Err(ImageError::Status {
                locator: locator.to_string(),
                status: res.status(),
            });
        }
        let bytes = res.bytes().await.map_err(request_error)?;
        Ok(bytes.to_vec())
    }

    async fn read(&self, locator: &str, path: &Path) -> ImageResult<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|source| ImageError::Io {
            locator: locator.to_string(),
            source,
        })
    }
}

enum Location {
    Remote,
    Local(PathBuf),
}

fn classify(locator: &str) -> ImageResult<Location> {
    match Url::parse(locator) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(Location::Remote),
            "file" => url
                .to_file_path()
                .map(Location::Local)
                .map_err(|_| ImageError::UnsupportedLocator(locator.to_string())),
            _ => Err(ImageError::UnsupportedLocator(locator.to_string())),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Location::Local(PathBuf::from(locator))),
        Err(_) => Err(ImageError::UnsupportedLocator(locator.to_string())),
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn load(&self, locator: &str) -> ImageResult<LoadedImage> {
        let bytes = match classify(locator)? {
            Location::Remote => self.fetch(locator).await?,
            Location::Local(path) => self.read(locator, &path).await?,
        };
        let image = LoadedImage::decode(locator, &bytes)?;
        log::debug!(
            "Loaded {}x{} {:?} image from {locator}",
            image.width(),
            image.height(),
            image.format
        );
        Ok(image)
    }
}
