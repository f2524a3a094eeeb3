//! QR code encoding and decoding
//!
//! Local encoding renders rasters, SVG and terminal previews; decoding is used
//! to check that images returned by remote services carry the requested payload.

mod decoder;
mod encoder;

pub use decoder::QrDecoder;
pub use encoder::QrEncoder;

use crate::request::ErrorCorrection;
use serde::Serialize;

/// Shape of the symbol a request produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrInfo {
    /// Encoded text
    pub payload: String,
    /// Payload length in characters
    pub length: usize,
    /// Symbol version (`1`..`40`, or `M1`..`M4` for micro codes)
    pub version: String,
    /// Modules per side, excluding the quiet zone
    pub modules: usize,
    /// Error-correction level
    pub error_correction: ErrorCorrection,
    /// Kind of data carried
    pub data_type: &'static str,
}
