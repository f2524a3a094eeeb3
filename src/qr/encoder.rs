//! QR code encoder

use crate::error::{Error, Result};
use crate::qr::QrInfo;
use crate::request::GenerationRequest;
use image::RgbaImage;
use qrcode::render::unicode;
use qrcode::{QrCode, Version};
use std::fmt::Write as _;

/// Local QR encoder backed by the `qrcode` crate
#[derive(Debug, Clone, Default)]
pub struct QrEncoder {}

impl QrEncoder {
    /// Create a new QR encoder
    pub fn new() -> Self {
        Self {}
    }

    fn symbol(&self, request: &GenerationRequest) -> Result<QrCode> {
        QrCode::with_error_correction_level(request.payload().as_bytes(), request.ecc().to_qrcode())
            .map_err(|e| Error::QrEncode(format!("Failed to create QR code: {}", e)))
    }

    /// Render the request as a `size`×`size` raster.
    ///
    /// Modules are scaled fractionally so the output is exactly the requested size,
    /// with `margin` light modules on every side.
    pub fn render(&self, request: &GenerationRequest) -> Result<RgbaImage> {
        let code = self.symbol(request)?;
        let modules = code.width();
        let colors = code.to_colors();

        let size = request.size();
        let margin = request.margin() as i64;
        let total = modules as f64 + 2.0 * margin as f64;
        let scale = size as f64 / total;

        let dark = request.dark().to_rgba();
        let light = request.light().to_rgba();

        let image = RgbaImage::from_fn(size, size, |x, y| {
            let mx = (x as f64 / scale).floor() as i64 - margin;
            let my = (y as f64 / scale).floor() as i64 - margin;
            let inside = (0..modules as i64).contains(&mx) && (0..modules as i64).contains(&my);
            if inside && colors[my as usize * modules + mx as usize] == qrcode::Color::Dark {
                dark
            } else {
                light
            }
        });

        tracing::debug!(
            modules,
            size,
            scale = format_args!("{scale:.2}"),
            "Rendered QR raster"
        );
        Ok(image)
    }

    /// Render the request as standalone SVG markup, one unit per module.
    pub fn render_svg(&self, request: &GenerationRequest) -> Result<String> {
        let code = self.symbol(request)?;
        let modules = code.width();
        let colors = code.to_colors();
        let margin = request.margin() as usize;
        let extent = modules + 2 * margin;

        let mut path = String::new();
        for y in 0..modules {
            let row = &colors[y * modules..(y + 1) * modules];
            let mut x = 0;
            while x < modules {
                if row[x] != qrcode::Color::Dark {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < modules && row[x] == qrcode::Color::Dark {
                    x += 1;
                }
                let run = x - start;
                let _ = write!(
                    path,
                    "M{} {}h{}v1h-{}z",
                    start + margin,
                    y + margin,
                    run,
                    run
                );
            }
        }

        let size = request.size();
        let mut svg = String::with_capacity(path.len() + 256);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" \
             viewBox=\"0 0 {extent} {extent}\" shape-rendering=\"crispEdges\">"
        );
        let _ = write!(
            svg,
            "<path fill=\"{}\" d=\"M0 0h{extent}v{extent}H0z\"/>",
            request.light()
        );
        let _ = write!(svg, "<path fill=\"{}\" d=\"{path}\"/>", request.dark());
        svg.push_str("</svg>\n");
        Ok(svg)
    }

    /// Render a compact Unicode preview for terminals.
    pub fn render_terminal(&self, request: &GenerationRequest) -> Result<String> {
        let code = self.symbol(request)?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .quiet_zone(true)
            .build())
    }

    /// Describe the symbol the request would produce.
    pub fn info(&self, request: &GenerationRequest) -> Result<QrInfo> {
        let code = self.symbol(request)?;
        let version = match code.version() {
            Version::Normal(v) => format!("{v}"),
            Version::Micro(v) => format!("M{v}"),
        };

        Ok(QrInfo {
            payload: request.payload().to_string(),
            length: request.payload().chars().count(),
            version,
            modules: code.width(),
            error_correction: request.ecc(),
            data_type: "URL",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Color, ErrorCorrection};

    fn request() -> GenerationRequest {
        GenerationRequest::builder("https://stevedok22.github.io/Project-CV-Code-0.2/")
            .size(330)
            .margin(4)
            .build()
            .unwrap()
    }

    #[test]
    fn raster_has_requested_size_and_light_margin() {
        let image = QrEncoder::new().render(&request()).unwrap();
        assert_eq!(image.dimensions(), (330, 330));
        assert_eq!(*image.get_pixel(0, 0), Color::WHITE.to_rgba());
        assert_eq!(*image.get_pixel(329, 329), Color::WHITE.to_rgba());
    }

    #[test]
    fn raster_uses_custom_colors() {
        let dark = Color::parse("#0f172a").unwrap();
        let light = Color::parse("#f8fafc").unwrap();
        let request = GenerationRequest::builder("https://a.b/c")
            .size(100)
            .margin(0)
            .colors(dark, light)
            .build()
            .unwrap();
        let image = QrEncoder::new().render(&request).unwrap();
        // Top-left finder pattern corner is always dark.
        assert_eq!(*image.get_pixel(0, 0), dark.to_rgba());
        assert!(image.pixels().any(|p| *p == light.to_rgba()));
    }

    #[test]
    fn svg_embeds_colors_and_size() {
        let svg = QrEncoder::new().render_svg(&request()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"330\""));
        assert!(svg.contains("#000000"));
        assert!(svg.contains("#ffffff"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn terminal_preview_is_multiline() {
        let preview = QrEncoder::new().render_terminal(&request()).unwrap();
        assert!(preview.lines().count() > 10);
    }

    #[test]
    fn info_reports_symbol_shape() {
        let info = QrEncoder::new().info(&request()).unwrap();
        assert_eq!(info.length, 49);
        assert_eq!(info.error_correction, ErrorCorrection::Medium);
        assert_eq!((info.modules - 17) % 4, 0);
    }

    #[test]
    fn round_trip() {
        use crate::qr::QrDecoder;

        let request = request();
        let image = QrEncoder::new().render(&request).unwrap();
        let decoded = QrDecoder::new()
            .decode(&image::DynamicImage::ImageRgba8(image))
            .unwrap();
        assert_eq!(decoded, request.payload());
    }
}
