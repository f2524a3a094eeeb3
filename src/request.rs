//! Generation requests and results
//!
//! A [`GenerationRequest`] is validated once at construction and never mutated.
//! A [`GenerationResult`] is produced once per acquisition and handed to the caller.

use crate::error::{Error, ProviderError, Result};
use crate::provider::ProviderKind;
use crate::validate;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Largest accepted pixel dimension.
pub const MAX_SIZE: u32 = 2048;
/// Largest accepted quiet zone, in modules.
pub const MAX_MARGIN: u32 = 32;

/// An opaque RGB color, written as `#RRGGBB` (or `#RGB`) in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Pure black
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    /// Pure white
    pub const WHITE: Color = Color {
        r: 0xff,
        g: 0xff,
        b: 0xff,
    };

    /// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB`.
    pub fn parse(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => {
                return Err(Error::Validation(format!(
                    "color '{value}' must be #RGB or #RRGGBB"
                )));
            }
        };

        let bytes = hex::decode(&expanded)
            .map_err(|e| Error::Validation(format!("color '{value}' is not hex: {e}")))?;
        Ok(Self {
            r: bytes[0],
            g: bytes[1],
            b: bytes[2],
        })
    }

    /// Lowercase hex digits without the leading `#`, as remote services expect.
    pub fn hex(&self) -> String {
        hex::encode([self.r, self.g, self.b])
    }

    /// Fully opaque RGBA pixel.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 0xff])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex())
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// QR symbol error-correction strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery
    #[serde(rename = "L", alias = "l", alias = "low")]
    Low,
    /// ~15% recovery
    #[default]
    #[serde(rename = "M", alias = "m", alias = "medium")]
    Medium,
    /// ~25% recovery
    #[serde(rename = "Q", alias = "q", alias = "quartile")]
    Quartile,
    /// ~30% recovery
    #[serde(rename = "H", alias = "h", alias = "high")]
    High,
}

impl ErrorCorrection {
    /// Single-letter level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::Quartile => "Q",
            Self::High => "H",
        }
    }

    /// Equivalent level for the `qrcode` crate.
    pub fn to_qrcode(self) -> qrcode::EcLevel {
        match self {
            Self::Low => qrcode::EcLevel::L,
            Self::Medium => qrcode::EcLevel::M,
            Self::Quartile => qrcode::EcLevel::Q,
            Self::High => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "q" | "quartile" => Ok(Self::Quartile),
            "h" | "high" => Ok(Self::High),
            other => Err(Error::Validation(format!(
                "unknown error correction level '{other}', expected L, M, Q or H"
            ))),
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request to render `payload` as a `size`×`size` QR image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    payload: String,
    size: u32,
    margin: u32,
    dark: Color,
    light: Color,
    ecc: ErrorCorrection,
}

impl GenerationRequest {
    /// Start building a request for `payload` with default rendering settings.
    pub fn builder(payload: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(payload)
    }

    /// Shorthand for a request with default colors, margin and error correction.
    pub fn new(payload: impl Into<String>, size: u32) -> Result<Self> {
        Self::builder(payload).size(size).build()
    }

    /// The text encoded into the symbol.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Output edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Quiet zone in modules.
    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Module color.
    pub fn dark(&self) -> Color {
        self.dark
    }

    /// Background color.
    pub fn light(&self) -> Color {
        self.light
    }

    /// Error-correction level.
    pub fn ecc(&self) -> ErrorCorrection {
        self.ecc
    }
}

/// Builder for [`GenerationRequest`].
#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    payload: String,
    size: u32,
    margin: u32,
    dark: Color,
    light: Color,
    ecc: ErrorCorrection,
}

impl GenerationRequestBuilder {
    fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            size: 300,
            margin: 2,
            dark: Color::BLACK,
            light: Color::WHITE,
            ecc: ErrorCorrection::default(),
        }
    }

    /// Output edge length in pixels.
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Quiet zone in modules.
    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Module and background colors.
    pub fn colors(mut self, dark: Color, light: Color) -> Self {
        self.dark = dark;
        self.light = light;
        self
    }

    /// Error-correction level.
    pub fn ecc(mut self, ecc: ErrorCorrection) -> Self {
        self.ecc = ecc;
        self
    }

    /// Validate and freeze the request.
    pub fn build(self) -> Result<GenerationRequest> {
        let payload = self.payload.trim().to_string();
        validate::parse_target(&payload)?;

        if self.size == 0 || self.size > MAX_SIZE {
            return Err(Error::Validation(format!(
                "size {} is out of range 1..={MAX_SIZE}",
                self.size
            )));
        }
        if self.margin > MAX_MARGIN {
            return Err(Error::Validation(format!(
                "margin {} exceeds {MAX_MARGIN} modules",
                self.margin
            )));
        }

        Ok(GenerationRequest {
            payload,
            size: self.size,
            margin: self.margin,
            dark: self.dark,
            light: self.light,
            ecc: self.ecc,
        })
    }
}

/// A rendered QR image plus its PNG data URI.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    image: RgbaImage,
    encoding: String,
    source: ProviderKind,
}

impl GenerationResult {
    /// Normalise `image` to `size`×`size` and encode it as a PNG data URI.
    pub fn new(
        image: RgbaImage,
        size: u32,
        source: ProviderKind,
    ) -> std::result::Result<Self, ProviderError> {
        let image = normalise(image, size);
        let png = encode_png(&image).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(Self {
            image,
            encoding: data_uri("image/png", &png),
            source,
        })
    }

    /// Result whose PNG encoding failed; the raster is still usable.
    pub(crate) fn without_encoding(image: RgbaImage, source: ProviderKind) -> Self {
        Self {
            image,
            encoding: String::new(),
            source,
        }
    }

    /// The raster image, exactly the requested size.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// `data:image/png;base64,...`
    pub fn data_uri(&self) -> &str {
        &self.encoding
    }

    /// Which provider produced the image.
    pub fn source(&self) -> ProviderKind {
        self.source
    }

    /// True when no provider delivered a real QR code.
    pub fn is_placeholder(&self) -> bool {
        self.source == ProviderKind::Placeholder
    }

    /// PNG bytes behind the data URI.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        match self.encoding.split_once(";base64,") {
            Some((_, body)) if !body.is_empty() => STANDARD
                .decode(body)
                .map_err(|e| Error::Image(format!("corrupt data URI: {e}"))),
            _ => encode_png(&self.image),
        }
    }
}

fn normalise(image: RgbaImage, size: u32) -> RgbaImage {
    if image.width() == size && image.height() == size {
        image
    } else {
        imageops::resize(&image, size, size, FilterType::Nearest)
    }
}

/// Encode an RGBA raster as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Build a base64 data URI for `bytes` with the given MIME type.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "https://stevedok22.github.io/Project-CV-Code-0.2/";

    #[test]
    fn color_parsing() {
        assert_eq!(Color::parse("#000000").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("#1A2b3C").unwrap().hex(), "1a2b3c");
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#zzzzzz").is_err());
    }

    #[test]
    fn error_correction_from_str() {
        assert_eq!("q".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::Quartile);
        assert_eq!("High".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::High);
        assert!("x".parse::<ErrorCorrection>().is_err());
    }

    #[test]
    fn builder_validates() {
        let request = GenerationRequest::builder(format!("  {TARGET} "))
            .size(256)
            .margin(4)
            .ecc(ErrorCorrection::High)
            .build()
            .unwrap();
        assert_eq!(request.payload(), TARGET);
        assert_eq!(request.size(), 256);
        assert_eq!(request.margin(), 4);

        assert!(GenerationRequest::new("ftp://x.com", 300).is_err());
        assert!(GenerationRequest::new(TARGET, 0).is_err());
        assert!(GenerationRequest::new(TARGET, MAX_SIZE + 1).is_err());
        assert!(
            GenerationRequest::builder(TARGET)
                .margin(MAX_MARGIN + 1)
                .build()
                .is_err()
        );
    }

    #[test]
    fn result_is_resized_and_encoded() {
        let image = RgbaImage::from_pixel(10, 10, Color::WHITE.to_rgba());
        let result = GenerationResult::new(image, 40, ProviderKind::QrServer).unwrap();
        assert_eq!(result.image().dimensions(), (40, 40));
        assert!(result.data_uri().starts_with("data:image/png;base64,"));

        let png = result.png_bytes().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 40);
    }

    #[test]
    fn png_bytes_reencodes_when_unencoded() {
        let image = RgbaImage::from_pixel(8, 8, Color::BLACK.to_rgba());
        let result = GenerationResult::without_encoding(image, ProviderKind::Placeholder);
        assert!(result.is_placeholder());
        assert!(!result.png_bytes().unwrap().is_empty());
    }
}
