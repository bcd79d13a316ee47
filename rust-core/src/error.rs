//! Error type shared by the equalizer core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EqError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("No audio loaded")]
    NoAudioLoaded,

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    #[error("Failed to resample audio: {0}")]
    Resample(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EqError>;
