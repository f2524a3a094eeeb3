//! Sequential provider fallback
//!
//! Providers are tried strictly in order, each under its own time budget.
//! The first success wins. A placeholder closes the chain, so acquisition
//! always yields an image.

use crate::config::ProvidersOptions;
use crate::error::{Error, ProviderError, Result};
use crate::metrics;
use crate::provider::{Placeholder, Provider, ProviderKind, RemoteFlavor, RemoteService};
use crate::qr::QrEncoder;
use crate::request::{GenerationRequest, GenerationResult};
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{info, warn};
use url::Url;

/// Per-attempt budget when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

/// Ordered list of providers tried until one succeeds
#[derive(Debug, Clone)]
pub struct AcquisitionChain {
    providers: Vec<Provider>,
    attempt_timeout: Duration,
}

impl AcquisitionChain {
    /// Chain over `providers` in the given order.
    pub fn new(providers: Vec<Provider>, attempt_timeout: Duration) -> Self {
        Self {
            providers,
            attempt_timeout,
        }
    }

    /// The default public chain: qrserver, then quickchart, then placeholder.
    pub fn public() -> Result<Self> {
        Self::from_options(&ProvidersOptions::default())
    }

    /// Build the chain described by configuration.
    pub fn from_options(options: &ProvidersOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(options.connect_timeout_ms.max(1)))
            .user_agent(concat!("qrcard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        let mut providers: Vec<Provider> = Vec::with_capacity(options.order.len());
        for kind in &options.order {
            if providers.iter().any(|p| p.kind() == *kind) {
                warn!(provider = %kind, "Ignoring repeated provider in configured order");
                continue;
            }
            let provider = match kind {
                ProviderKind::QrServer => Provider::Remote(remote(
                    RemoteFlavor::QrServer,
                    &options.qrserver_endpoint,
                    &client,
                    options.verify,
                )?),
                ProviderKind::QuickChart => Provider::Remote(remote(
                    RemoteFlavor::QuickChart,
                    &options.quickchart_endpoint,
                    &client,
                    options.verify,
                )?),
                ProviderKind::LocalEncoder => Provider::LocalEncoder(QrEncoder::new()),
                ProviderKind::Placeholder => Provider::Placeholder(Placeholder),
            };
            providers.push(provider);
        }

        Ok(Self::new(
            providers,
            Duration::from_millis(options.timeout_ms.max(1)),
        ))
    }

    /// Providers in attempt order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Time budget for a single attempt.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Obtain an image for `request`. Never fails.
    pub async fn acquire(&self, request: &GenerationRequest) -> GenerationResult {
        for provider in &self.providers {
            let kind = provider.kind();
            let started = Instant::now();

            let outcome = match time::timeout(self.attempt_timeout, provider.attempt(request)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout(self.attempt_timeout)),
            };
            let outcome = outcome.and_then(|image| GenerationResult::new(image, request.size(), kind));
            let elapsed = started.elapsed();

            match outcome {
                Ok(result) => {
                    metrics::record_attempt(kind, elapsed, None);
                    info!(
                        provider = %kind,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "QR image acquired"
                    );
                    return result;
                }
                Err(err) => {
                    metrics::record_attempt(kind, elapsed, Some(&err));
                    warn!(
                        provider = %kind,
                        reason = err.kind(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "QR provider failed: {err}"
                    );
                }
            }
        }

        warn!("Every provider failed, rendering placeholder");
        placeholder_result(request)
    }

    /// Run a single provider of the given kind, surfacing its failure.
    pub async fn attempt_only(
        &self,
        kind: ProviderKind,
        request: &GenerationRequest,
    ) -> Result<GenerationResult> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| Error::Config(format!("Provider '{kind}' is not configured")))?;

        let outcome = match time::timeout(self.attempt_timeout, provider.attempt(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout(self.attempt_timeout)),
        };
        outcome
            .and_then(|image| GenerationResult::new(image, request.size(), kind))
            .map_err(|source| Error::Provider {
                provider: kind.label(),
                source,
            })
    }
}

fn remote(
    flavor: RemoteFlavor,
    endpoint: &str,
    client: &reqwest::Client,
    verify: bool,
) -> Result<RemoteService> {
    let endpoint = Url::parse(endpoint)
        .map_err(|e| Error::Config(format!("Invalid endpoint '{endpoint}': {e}")))?;
    Ok(RemoteService::new(flavor, endpoint, client.clone()).with_verification(verify))
}

fn placeholder_result(request: &GenerationRequest) -> GenerationResult {
    let image = Placeholder.render(request);
    match GenerationResult::new(image.clone(), request.size(), ProviderKind::Placeholder) {
        Ok(result) => result,
        Err(err) => {
            warn!("Failed to encode placeholder image: {err}");
            GenerationResult::without_encoding(image, ProviderKind::Placeholder)
        }
    }
}
