//! Writing artifacts and rendering run summaries

use crate::config::OutputOptions;
use crate::error::{Error, Result};
use crate::provider::ProviderKind;
use crate::qr::QrInfo;
use crate::request::GenerationRequest;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Artifact file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// PNG raster
    Png,
    /// SVG vector
    Svg,
}

impl ArtifactFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

/// A file written by a run
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Format of the file
    pub format: ArtifactFormat,
    /// Where it was written
    pub path: PathBuf,
    /// Size in bytes
    pub bytes: usize,
}

/// Default filename derived from the target host, e.g. `example-com-qr.png`.
pub fn default_filename(target: &Url, format: ArtifactFormat) -> String {
    let stem: String = target
        .host_str()
        .unwrap_or_default()
        .trim_start_matches("www.")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let stem = stem.trim_matches('-');

    if stem.is_empty() {
        format!("qr-code.{}", format.extension())
    } else {
        format!("{stem}-qr.{}", format.extension())
    }
}

/// Resolve the destination for `format` from configuration and the target.
pub fn artifact_path(options: &OutputOptions, target: &Url, format: ArtifactFormat) -> PathBuf {
    let configured = match format {
        ArtifactFormat::Png => options.png.clone(),
        ArtifactFormat::Svg => options.svg.clone(),
    };
    let name = configured.unwrap_or_else(|| default_filename(target, format));

    match &options.dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Write `contents` to `path`, creating missing parent directories.
pub fn write_artifact(path: &Path, format: ArtifactFormat, contents: &[u8]) -> Result<Artifact> {
    let output_error = |source: std::io::Error| Error::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(output_error)?;
    }
    fs::write(path, contents).map_err(output_error)?;

    tracing::info!(path = %path.display(), bytes = contents.len(), "Wrote {}", format.extension());
    Ok(Artifact {
        format,
        path: path.to_path_buf(),
        bytes: contents.len(),
    })
}

/// Everything worth reporting about one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The validated request
    pub request: GenerationRequest,
    /// Symbol description
    pub info: QrInfo,
    /// Provider that produced the raster
    pub source: ProviderKind,
    /// Files written
    pub artifacts: Vec<Artifact>,
    /// PNG data URI, when requested
    pub data_uri: Option<String>,
}

/// Combined structured and human-readable representation of a run
#[derive(Debug, Clone)]
pub struct RenderedSummary {
    /// Structured JSON representation suitable for downstream consumers
    pub json: Value,
    /// Human-readable lines for terminal presentation
    pub human: Vec<String>,
}

/// Render a run summary into both JSON and human-readable forms.
pub fn render_summary(summary: &RunSummary) -> RenderedSummary {
    let request = &summary.request;
    let json = json!({
        "target": request.payload(),
        "source": summary.source.label(),
        "placeholder": summary.source == ProviderKind::Placeholder,
        "settings": {
            "size": request.size(),
            "margin": request.margin(),
            "dark": request.dark().to_string(),
            "light": request.light().to_string(),
            "ecc": request.ecc().as_str(),
        },
        "info": summary.info,
        "artifacts": summary.artifacts,
        "data_uri": summary.data_uri,
    });

    let mut human = Vec::new();
    human.push(format!("URL: {}", request.payload()));
    human.push(format!(
        "Settings: {}x{} px, margin {}, {} on {}, error correction {}",
        request.size(),
        request.size(),
        request.margin(),
        request.dark(),
        request.light(),
        request.ecc()
    ));
    human.push(format!(
        "Symbol: version {}, {} modules, {} characters",
        summary.info.version, summary.info.modules, summary.info.length
    ));
    human.push(format!("Source: {}", summary.source));
    if summary.source == ProviderKind::Placeholder {
        human.push(
            "  No QR service responded; the image is a placeholder. Run again to retry."
                .to_string(),
        );
    }
    for artifact in &summary.artifacts {
        human.push(format!(
            "Saved {}: {} ({} bytes)",
            artifact.format.extension().to_uppercase(),
            artifact.path.display(),
            artifact.bytes
        ));
    }

    RenderedSummary { json, human }
}
