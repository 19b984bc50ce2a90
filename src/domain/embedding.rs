use std::ops::Deref;

/// An embedding produced by an encoder model.
///
/// The values are frozen at construction; every vector produced by the same
/// model has the same number of dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingVector(Box<[f32]>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into_boxed_slice())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl Deref for EmbeddingVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
