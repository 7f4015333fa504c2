use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vendor profile error: {0}")]
    Profile(String),
}

pub type Result<T> = std::result::Result<T, ExtractorError>;
