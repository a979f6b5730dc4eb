use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommerceError>;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::commerce::CatalogError),

    #[error("Cart error: {0}")]
    Cart(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Audio queue error: {0}")]
    AudioQueue(#[from] crate::audio_queue::AudioQueueError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
