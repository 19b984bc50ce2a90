pub mod credential;
pub mod domain;
pub mod encoders;
pub mod images;
pub mod models;
pub mod processing;

/// Configuration file read by the binary, without extension.
pub const DEFAULT_CONFIG_FILE: &str = "config/default";
