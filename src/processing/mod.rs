pub mod checks;
pub mod similarity;
pub mod verify;

pub use similarity::cosine_similarity;
pub use verify::{ModelOutcome, ModelReport, RunPolicy, RunSummary, Verifier, verify_models};
