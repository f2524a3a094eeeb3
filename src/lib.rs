//! qrcard - QR codes for a personal site URL
//!
//! Encodes a configured URL into a QR image. Images come either from the local
//! encoder or from an acquisition chain that asks two public QR services in turn
//! and falls back to a locally drawn placeholder, so acquisition never fails.
//!
//! # Features
//!
//! - **Local encoding**: PNG raster, SVG and terminal previews via `qrcode`
//! - **Fallback chain**: qrserver, then quickchart, then placeholder, each attempt time-boxed
//! - **Session guard**: overlapping requests are coalesced, superseded results discarded
//! - **History**: the five most recent targets, persisted with graceful degradation
//!
//! # Example
//!
//! ```no_run
//! use qrcard::{AcquisitionChain, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> qrcard::Result<()> {
//!     let chain = AcquisitionChain::public()?;
//!     let request = GenerationRequest::new("https://example.com/", 300)?;
//!
//!     let result = chain.acquire(&request).await;
//!     println!("{} via {}", &result.data_uri()[..32], result.source());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod chain;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod provider;
pub mod qr;
pub mod request;
pub mod session;
pub mod validate;

// Re-exports for convenience
pub use error::{Error, ProviderError, Result};

pub use chain::AcquisitionChain;
pub use config::{HistoryOptions, LogRotation, LoggingOptions, ProvidersOptions, QrcardConfig};
pub use history::History;
pub use provider::{Placeholder, Provider, ProviderKind, RemoteFlavor, RemoteService};
pub use qr::{QrDecoder, QrEncoder, QrInfo};
pub use request::{Color, ErrorCorrection, GenerationRequest, GenerationResult};
pub use session::{AcquireOutcome, Session};
pub use validate::is_acceptable;
