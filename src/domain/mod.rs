pub mod embedding;
pub mod sample;

pub use embedding::EmbeddingVector;
pub use sample::{Sample, SampleSet, SampleSetError};
