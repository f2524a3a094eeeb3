//! QR image providers
//!
//! Each provider is one way of turning a [`GenerationRequest`] into a raster.
//! The chain holds them as a plain ordered list of variants.

mod placeholder;
mod remote;

pub use placeholder::Placeholder;
pub use remote::{MAX_BODY_BYTES, MAX_IMAGE_DIMENSION, RemoteFlavor, RemoteService};

use crate::error::ProviderError;
use crate::qr::QrEncoder;
use crate::request::GenerationRequest;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a provider in configuration, logs and results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// api.qrserver.com
    QrServer,
    /// quickchart.io
    QuickChart,
    /// In-process encoder
    #[serde(alias = "local")]
    LocalEncoder,
    /// Diagnostic image, never fails
    Placeholder,
}

impl ProviderKind {
    /// Stable lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::QrServer => "qrserver",
            Self::QuickChart => "quickchart",
            Self::LocalEncoder => "local",
            Self::Placeholder => "placeholder",
        }
    }

    /// Parse a label as used in configuration.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "qrserver" => Some(Self::QrServer),
            "quickchart" => Some(Self::QuickChart),
            "local" | "localencoder" => Some(Self::LocalEncoder),
            "placeholder" => Some(Self::Placeholder),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One strategy for obtaining a QR raster
#[derive(Debug, Clone)]
pub enum Provider {
    /// HTTP image service
    Remote(RemoteService),
    /// Encode in-process with the `qrcode` crate
    LocalEncoder(QrEncoder),
    /// Fixed diagnostic image
    Placeholder(Placeholder),
}

impl Provider {
    /// Kind tag of this provider.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Remote(service) => service.kind(),
            Self::LocalEncoder(_) => ProviderKind::LocalEncoder,
            Self::Placeholder(_) => ProviderKind::Placeholder,
        }
    }

    /// Try once to produce a raster for `request`.
    pub async fn attempt(&self, request: &GenerationRequest) -> Result<RgbaImage, ProviderError> {
        match self {
            Self::Remote(service) => service.attempt(request).await,
            Self::LocalEncoder(encoder) => encoder
                .render(request)
                .map_err(|e| ProviderError::Encode(e.to_string())),
            Self::Placeholder(placeholder) => Ok(placeholder.render(request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_round_trip() {
        for kind in [
            ProviderKind::QrServer,
            ProviderKind::QuickChart,
            ProviderKind::LocalEncoder,
            ProviderKind::Placeholder,
        ] {
            assert_eq!(ProviderKind::parse(kind.label()), Some(kind));
        }
        assert_eq!(ProviderKind::parse("nope"), None);
    }

    #[tokio::test]
    async fn local_encoder_variant_renders() {
        let request = GenerationRequest::new("https://a.b/c", 120).unwrap();
        let provider = Provider::LocalEncoder(QrEncoder::new());
        let image = provider.attempt(&request).await.unwrap();
        assert_eq!(image.dimensions(), (120, 120));
        assert_eq!(provider.kind(), ProviderKind::LocalEncoder);
    }
}
