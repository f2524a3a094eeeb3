//! Public QR image services reached over HTTP.

use crate::error::{Error, ProviderError};
use crate::provider::ProviderKind;
use crate::qr::QrDecoder;
use crate::request::{GenerationRequest, MAX_SIZE};
use bytes::{Bytes, BytesMut};
use image::{DynamicImage, ImageReader, Limits, RgbaImage};
use std::io::Cursor;
use url::Url;

const MAX_ERROR_BODY: usize = 200;

/// Largest response body accepted from a service.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Largest width or height decoded from a service image.
pub const MAX_IMAGE_DIMENSION: u32 = 2 * MAX_SIZE;

/// Query dialect spoken by a remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFlavor {
    /// `api.qrserver.com/v1/create-qr-code/`
    QrServer,
    /// `quickchart.io/qr`
    QuickChart,
}

impl RemoteFlavor {
    /// Public endpoint used when none is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::QrServer => "https://api.qrserver.com/v1/create-qr-code/",
            Self::QuickChart => "https://quickchart.io/qr",
        }
    }
}

/// A remote QR image service
#[derive(Debug, Clone)]
pub struct RemoteService {
    flavor: RemoteFlavor,
    endpoint: Url,
    client: reqwest::Client,
    verify: bool,
}

impl RemoteService {
    /// Service of `flavor` reachable at `endpoint`.
    pub fn new(flavor: RemoteFlavor, endpoint: Url, client: reqwest::Client) -> Self {
        Self {
            flavor,
            endpoint,
            client,
            verify: true,
        }
    }

    /// Service at its public endpoint.
    pub fn public(flavor: RemoteFlavor, client: reqwest::Client) -> Result<Self, Error> {
        let endpoint = Url::parse(flavor.default_endpoint())
            .map_err(|e| Error::Config(format!("Invalid built-in endpoint: {e}")))?;
        Ok(Self::new(flavor, endpoint, client))
    }

    /// Toggle decoding the returned image to confirm it carries the payload.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Kind tag matching the flavor.
    pub fn kind(&self) -> ProviderKind {
        match self.flavor {
            RemoteFlavor::QrServer => ProviderKind::QrServer,
            RemoteFlavor::QuickChart => ProviderKind::QuickChart,
        }
    }

    /// Full request URL; the payload is percent-encoded as a query value.
    pub fn request_url(&self, request: &GenerationRequest) -> Url {
        let mut url = self.endpoint.clone();
        let size = request.size().to_string();
        let margin = request.margin().to_string();
        let dark = request.dark().hex();
        let light = request.light().hex();

        {
            let mut query = url.query_pairs_mut();
            match self.flavor {
                RemoteFlavor::QrServer => {
                    query
                        .append_pair("data", request.payload())
                        .append_pair("size", &format!("{size}x{size}"))
                        .append_pair("qzone", &margin)
                        .append_pair("color", &dark)
                        .append_pair("bgcolor", &light)
                        .append_pair("ecc", request.ecc().as_str())
                        .append_pair("format", "png");
                }
                RemoteFlavor::QuickChart => {
                    query
                        .append_pair("text", request.payload())
                        .append_pair("size", &size)
                        .append_pair("margin", &margin)
                        .append_pair("dark", &dark)
                        .append_pair("light", &light)
                        .append_pair("ecLevel", request.ecc().as_str())
                        .append_pair("format", "png");
                }
            }
        }

        url
    }

    /// Fetch and decode one image.
    pub async fn attempt(&self, request: &GenerationRequest) -> Result<RgbaImage, ProviderError> {
        let url = self.request_url(request);
        tracing::debug!(provider = %self.kind(), %url, "Requesting QR image");

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Err(ProviderError::TooLarge {
                limit: MAX_BODY_BYTES,
            });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(ProviderError::TooLarge {
                    limit: MAX_BODY_BYTES,
                });
            }
            body.extend_from_slice(&chunk);
        }
        let body = body.freeze();

        // Decoding runs off the runtime so the attempt timeout can still fire.
        let service = self.clone();
        let expected = request.payload().to_string();
        tokio::task::spawn_blocking(move || service.decode_checked(body, &expected))
            .await
            .map_err(|e| ProviderError::Decode(format!("decode task failed: {e}")))?
    }

    fn decode_checked(&self, body: Bytes, expected: &str) -> Result<RgbaImage, ProviderError> {
        let image = decode_image(&body)?;
        if self.verify {
            self.verify_payload(&image, expected)?;
        }
        Ok(image)
    }

    fn verify_payload(&self, image: &RgbaImage, expected: &str) -> Result<(), ProviderError> {
        match QrDecoder::new().decode(&DynamicImage::ImageRgba8(image.clone())) {
            Ok(found) if found == expected => Ok(()),
            Ok(found) => Err(ProviderError::Mismatch { found }),
            Err(err) => {
                // Styled service output can defeat the detector; that alone is not a failure.
                tracing::debug!(provider = %self.kind(), error = %err, "Could not verify QR image");
                Ok(())
            }
        }
    }
}

/// Decode a service image, refusing oversized dimensions before allocating.
fn decode_image(body: &[u8]) -> Result<RgbaImage, ProviderError> {
    let mut reader = ImageReader::new(Cursor::new(body))
        .with_guessed_format()
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    Ok(reader.decode()?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Color, encode_png};
    use image::Rgba;

    fn service(flavor: RemoteFlavor) -> RemoteService {
        RemoteService::public(flavor, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn qrserver_url_encodes_payload() {
        let request = GenerationRequest::new("https://a.b/c?x=1&y=two words", 300).unwrap();
        let url = service(RemoteFlavor::QrServer).request_url(&request);

        assert_eq!(url.host_str(), Some("api.qrserver.com"));
        let query = url.query().unwrap();
        assert!(query.starts_with("data=https%3A%2F%2Fa.b%2Fc%3Fx%3D1%26y%3Dtwo+words&"));
        assert!(query.contains("size=300x300"));
        assert!(query.contains("ecc=M"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("data".into(), request.payload().to_string()));
    }

    #[test]
    fn quickchart_url_carries_colors() {
        let request = GenerationRequest::builder("https://a.b/c")
            .size(256)
            .colors(Color::parse("#112233").unwrap(), Color::WHITE)
            .build()
            .unwrap();
        let url = service(RemoteFlavor::QuickChart).request_url(&request);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("text".into(), "https://a.b/c".into())));
        assert!(pairs.contains(&("size".into(), "256".into())));
        assert!(pairs.contains(&("dark".into(), "112233".into())));
        assert!(pairs.contains(&("light".into(), "ffffff".into())));
        assert_eq!(service(RemoteFlavor::QuickChart).kind(), ProviderKind::QuickChart);
    }

    #[test]
    fn oversized_dimensions_are_refused() {
        let wide = RgbaImage::from_pixel(MAX_IMAGE_DIMENSION + 1, 1, Rgba([0, 0, 0, 255]));
        let png = encode_png(&wide).unwrap();
        assert!(matches!(decode_image(&png), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn small_png_decodes() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        let png = encode_png(&image).unwrap();
        assert_eq!(decode_image(&png).unwrap().dimensions(), (8, 8));
    }
}
