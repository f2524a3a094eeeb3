//! Encode a URL locally and save it as PNG and SVG
//!
//! Usage: cargo run --example generate_qr -- https://example.com/

use qrcard::request::encode_png;
use qrcard::{ErrorCorrection, GenerationRequest, QrEncoder};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com/".to_string());

    let request = GenerationRequest::builder(url)
        .size(300)
        .margin(2)
        .ecc(ErrorCorrection::Quartile)
        .build()?;

    let encoder = QrEncoder::new();
    let image = encoder.render(&request)?;
    std::fs::write("qr_output.png", encode_png(&image)?)?;
    println!("✓ QR code generated and saved to qr_output.png");

    std::fs::write("qr_output.svg", encoder.render_svg(&request)?)?;
    println!("✓ SVG saved to qr_output.svg");

    println!("{}", encoder.render_terminal(&request)?);
    Ok(())
}
