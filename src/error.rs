// Error types shared across layers
use thiserror::Error;

/// Errors raised while talking to the live telemetry stream
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("message is not a JSON array")]
    NotAnArray,

    #[error("record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerError {
    #[error("icon '{icon}' is not registered, cannot create layer '{layer}'")]
    IconNotRegistered { layer: String, icon: String },
}

/// Errors raised while loading a marker icon
#[derive(Debug, Error)]
pub enum IconError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode icon image: {0}")]
    Decode(#[from] image::ImageError),
}
