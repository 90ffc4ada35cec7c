use thiserror::Error;

#[derive(Error, Debug)]
pub enum CountingError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Train first: no palette has been trained or restored")]
    NotTrained,

    #[error("No training pixels in any class: pick some regions first")]
    NoSamples,

    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index encoding error: {0}")]
    IndexEncode(#[from] bincode::error::EncodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CountingError>;
