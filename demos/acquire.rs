//! Fetch a QR image through the public provider chain
//!
//! Usage: cargo run --example acquire -- https://example.com/

use qrcard::{AcquisitionChain, GenerationRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("qrcard=debug")
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com/".to_string());
    let request = GenerationRequest::new(url, 300)?;

    let chain = AcquisitionChain::public()?;
    let result = chain.acquire(&request).await;

    std::fs::write("qr_remote.png", result.png_bytes()?)?;
    println!("✓ Saved qr_remote.png (source: {})", result.source());
    if result.is_placeholder() {
        println!("  No service answered; the file holds a placeholder. Try again later.");
    }
    Ok(())
}
