//! Error types for qrcard operations

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using qrcard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qrcard operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or disallowed payload, size or color
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A single provider failed and the caller asked for that provider directly
    #[error("Provider {provider} failed: {source}")]
    Provider {
        /// Label of the failing provider
        provider: &'static str,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },

    /// History store could not be read or written
    #[error("History store error: {0}")]
    Persistence(String),

    /// Output artifact could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Output {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// QR code encoding failed
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// QR code decoding failed
    #[error("Failed to decode QR code: {0}")]
    QrDecode(String),

    /// No QR code found in image
    #[error("No QR code found in image")]
    NoQrCodeFound,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Failure of one provider attempt. Recovered by the chain advancing to the next provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network or HTTP client error
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("unexpected status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        message: String,
    },

    /// Response body was not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Image decoded to a different payload than requested
    #[error("image encodes {found:?} instead of the requested payload")]
    Mismatch {
        /// Payload actually found in the image
        found: String,
    },

    /// Response body exceeded the accepted size
    #[error("response body exceeds {limit} bytes")]
    TooLarge {
        /// Byte limit that was exceeded
        limit: usize,
    },

    /// Attempt exceeded its time budget
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Local encoding failed
    #[error("local encoding failed: {0}")]
    Encode(String),
}

impl ProviderError {
    /// Short machine-friendly label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Mismatch { .. } => "mismatch",
            Self::TooLarge { .. } => "too_large",
            Self::Timeout(_) => "timeout",
            Self::Encode(_) => "encode",
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<image::ImageError> for ProviderError {
    fn from(e: image::ImageError) -> Self {
        ProviderError::Decode(e.to_string())
    }
}
