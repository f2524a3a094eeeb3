//! Offline diagnostic image shown when no service delivered a QR code.

use crate::request::GenerationRequest;
use image::{Rgba, RgbaImage};

const LINES: [&str; 3] = ["QR CODE", "UNAVAILABLE", "TRY AGAIN"];
const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Renders a bordered square with a short notice. Never fails and never does I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholder;

impl Placeholder {
    /// Draw the notice in the request's colors at the request's size.
    pub fn render(&self, request: &GenerationRequest) -> RgbaImage {
        let size = request.size();
        let ink = request.dark().to_rgba();
        let mut image = RgbaImage::from_pixel(size, size, request.light().to_rgba());

        let border = (size / 50).max(1);
        for y in 0..size {
            for x in 0..size {
                if x < border || y < border || x >= size - border || y >= size - border {
                    image.put_pixel(x, y, ink);
                }
            }
        }

        let inner = size.saturating_sub(4 * border);
        let longest = LINES.iter().map(|l| l.len() as u32).max().unwrap_or(1);
        let line_h = GLYPH_H + 3;
        let scale = (inner / (longest * (GLYPH_W + 1)))
            .min(inner / (LINES.len() as u32 * line_h))
            .max(1);

        let block_h = LINES.len() as u32 * line_h * scale - 3 * scale;
        let mut top = size.saturating_sub(block_h) / 2;
        for line in LINES {
            let width = line.len() as u32 * (GLYPH_W + 1) * scale - scale;
            let left = size.saturating_sub(width) / 2;
            draw_text(&mut image, line, left, top, scale, ink);
            top += line_h * scale;
        }

        image
    }
}

fn draw_text(image: &mut RgbaImage, text: &str, left: u32, top: u32, scale: u32, ink: Rgba<u8>) {
    let (w, h) = image.dimensions();
    for (i, ch) in text.chars().enumerate() {
        let rows = glyph(ch);
        let origin = left + i as u32 * (GLYPH_W + 1) * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = origin + col * scale + dx;
                        let y = top + row as u32 * scale + dy;
                        if x < w && y < h {
                            image.put_pixel(x, y, ink);
                        }
                    }
                }
            }
        }
    }
}

// 5x7 bitmaps, one byte per row, high bit on the left.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11],
        'B' => [0x1e, 0x11, 0x11, 0x1e, 0x11, 0x11, 0x1e],
        'C' => [0x0e, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0e],
        'D' => [0x1e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1e],
        'E' => [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f],
        'G' => [0x0e, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0f],
        'I' => [0x0e, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e],
        'Q' => [0x0e, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0d],
        'R' => [0x1e, 0x11, 0x11, 0x1e, 0x14, 0x12, 0x11],
        'T' => [0x1f, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0a, 0x04],
        'Y' => [0x11, 0x11, 0x0a, 0x04, 0x04, 0x04, 0x04],
        _ => [0; 7],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Color;

    fn request(size: u32) -> GenerationRequest {
        GenerationRequest::new("https://a.b/c", size).unwrap()
    }

    #[test]
    fn renders_bordered_square() {
        let image = Placeholder.render(&request(300));
        assert_eq!(image.dimensions(), (300, 300));
        assert_eq!(*image.get_pixel(0, 0), Color::BLACK.to_rgba());
        assert_eq!(*image.get_pixel(299, 150), Color::BLACK.to_rgba());
        assert_eq!(*image.get_pixel(20, 20), Color::WHITE.to_rgba());
    }

    #[test]
    fn contains_text_ink_inside_border() {
        let image = Placeholder.render(&request(300));
        let inked = (20..280)
            .flat_map(|y| (20..280).map(move |x| (x, y)))
            .filter(|&(x, y)| *image.get_pixel(x, y) == Color::BLACK.to_rgba())
            .count();
        assert!(inked > 500, "expected rendered text, found {inked} ink pixels");
    }

    #[test]
    fn deterministic() {
        assert_eq!(Placeholder.render(&request(200)), Placeholder.render(&request(200)));
    }

    #[test]
    fn tiny_sizes_do_not_panic() {
        for size in [1, 2, 3, 10, 33] {
            let image = Placeholder.render(&request(size));
            assert_eq!(image.dimensions(), (size, size));
        }
    }
}
