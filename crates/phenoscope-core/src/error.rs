//! Error types for Phenoscope

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhenoscopeError {
    // Transport errors
    #[error("Search request failed: {reason}")]
    Transport { reason: String },

    #[error("Backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    // Response shape errors
    #[error("Malformed backend response: {reason}")]
    MalformedResponse { reason: String },

    // Portable query form errors
    #[error("Invalid portable query form: {reason}")]
    PortableForm { reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PhenoscopeError>;
