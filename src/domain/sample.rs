use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// A fixture item: a caption and, for cross-modal sets, the locator of the
/// image it describes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Sample {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Sample {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            image: None,
        }
    }

    pub fn captioned(text: &str, image: &str) -> Self {
        Self {
            text: text.to_string(),
            image: Some(image.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SampleSetError {
    #[error("failed to read sample set {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse sample set {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("sample set {0} is empty")]
    Empty(String),
}

pub type SampleSetResult<T> = Result<T, SampleSetError>;

/// An ordered, read-only list of samples shared by every model run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Four short scene descriptions: two about beaches, two about greenery.
    ///
    /// Index 0 and 1 share a topic, index 2 and 3 share the other one.
    pub fn scenery_texts() -> Self {
        Self::new(vec![
            Sample::text("sunny beach with clear blue water"),
            Sample::text("crowded sandbeach under the bright sun"),
            Sample::text("dense forest with tall green trees"),
            Sample::text("quiet park in the morning light"),
        ])
    }

    /// Five detailed captions, each paired with the photo it describes.
    pub fn captioned_images() -> Self {
        Self::new(vec![
            Sample::captioned(
                "A group of friends enjoy a barbecue on a sandy beach, with one person grilling over a large black grill, while the other sits nearby, laughing and enjoying the camaraderie.",
                "https://github.com/ashvardanian/ashvardanian/blob/master/demos/bbq-on-beach.jpg?raw=true",
            ),
            Sample::captioned(
                "A white and orange cat stands on its hind legs, reaching towards a wicker basket filled with red raspberries on a wooden table in a garden, surrounded by orange flowers and a white teapot, creating a serene and whimsical scene.",
                "https://github.com/ashvardanian/ashvardanian/blob/master/demos/cat-in-garden.jpg?raw=true",
            ),
            Sample::captioned(
                "A little girl in a yellow dress stands in a grassy field, holding an umbrella and looking at the camera, amidst rain.",
                "https://github.com/ashvardanian/ashvardanian/blob/master/demos/girl-and-rain.jpg?raw=true",
            ),
            Sample::captioned(
                "This serene bedroom features a white bed with a black canopy, a gray armchair, a black dresser with a mirror, a vase with a plant, a window with white curtains, a rug, and a wooden floor, creating a tranquil and elegant atmosphere.",
                "https://github.com/ashvardanian/ashvardanian/blob/master/demos/light-bedroom-furniture.jpg?raw=true",
            ),
            Sample::captioned(
                "The image captures the iconic Louvre Museum in Paris, illuminated by warm lights against a dark sky, with the iconic glass pyramid in the center, surrounded by ornate buildings and a large courtyard, showcasing the museum's grandeur and historical significance.",
                "https://github.com/ashvardanian/ashvardanian/blob/master/demos/louvre-at-night.jpg?raw=true",
            ),
        ])
    }

    /// Loads a sample set from a JSON file of the form
    /// `{"samples": [{"text": "...", "image": "..."}]}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> SampleSetResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| SampleSetError::Read {
            path: display.clone(),
            source,
        })?;
        let set: SampleSet = serde_json::from_str(&raw).map_err(|source| SampleSetError::Parse {
            path: display.clone(),
            source,
        })?;
        if set.is_empty() {
            return Err(SampleSetError::Empty(display));
        }
        Ok(set)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|sample| sample.text.as_str())
    }

    /// Samples that carry an image locator, in their original order.
    pub fn captioned(&self) -> impl Iterator<Item = (&str, &str)> {
        self.samples
            .iter()
            .filter_map(|sample| Some((sample.text.as_str(), sample.image.as_deref()?)))
    }
}
