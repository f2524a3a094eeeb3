//! qrcard runtime configuration handling

use crate::chain::DEFAULT_ATTEMPT_TIMEOUT;
use crate::error::{Error, Result};
use crate::history::DEFAULT_CAPACITY;
use crate::provider::{ProviderKind, RemoteFlavor};
use crate::request::{Color, ErrorCorrection, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrcardConfig {
    /// URL encoded into the QR code
    pub target: Option<String>,
    /// Rendering settings
    pub render: RenderOptions,
    /// Output artifact locations
    pub output: OutputOptions,
    /// Provider chain settings
    pub providers: ProvidersOptions,
    /// Recent-targets history
    pub history: HistoryOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl QrcardConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrcard.toml / qrcard.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrcard.toml", "qrcard.yaml", "qrcard.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let base = config_dir.join("qrcard");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("QRCARD_URL") {
            self.target = Some(url);
        }
        self.render.apply_env_overrides();
        self.output.apply_env_overrides();
        self.providers.apply_env_overrides();
        self.history.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// The configured target, or a validation error when none is set.
    pub fn target(&self) -> Result<&str> {
        self.target
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Validation(
                    "no target URL configured (use --url, QRCARD_URL or `target` in qrcard.toml)"
                        .to_string(),
                )
            })
    }

    /// Build a validated generation request from the target and render settings.
    pub fn request(&self) -> Result<GenerationRequest> {
        GenerationRequest::builder(self.target()?)
            .size(self.render.size)
            .margin(self.render.margin)
            .colors(self.render.dark, self.render.light)
            .ecc(self.render.ecc)
            .build()
    }
}

/// Rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Edge length in pixels
    pub size: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// Module color
    pub dark: Color,
    /// Background color
    pub light: Color,
    /// Error-correction level
    pub ecc: ErrorCorrection,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: 300,
            margin: 2,
            dark: Color::BLACK,
            light: Color::WHITE,
            ecc: ErrorCorrection::Medium,
        }
    }
}

impl RenderOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(size) = env::var("QRCARD_SIZE") {
            if let Ok(parsed) = size.parse::<u32>() {
                self.size = parsed;
            }
        }
        if let Ok(margin) = env::var("QRCARD_MARGIN") {
            if let Ok(parsed) = margin.parse::<u32>() {
                self.margin = parsed;
            }
        }
        if let Ok(dark) = env::var("QRCARD_DARK") {
            match Color::from_str(&dark) {
                Ok(color) => self.dark = color,
                Err(err) => tracing::warn!("Ignoring QRCARD_DARK: {err}"),
            }
        }
        if let Ok(light) = env::var("QRCARD_LIGHT") {
            match Color::from_str(&light) {
                Ok(color) => self.light = color,
                Err(err) => tracing::warn!("Ignoring QRCARD_LIGHT: {err}"),
            }
        }
        if let Ok(ecc) = env::var("QRCARD_ECC") {
            if let Ok(parsed) = ecc.parse::<ErrorCorrection>() {
                self.ecc = parsed;
            }
        }
    }
}

/// Output artifact locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Directory artifacts are written into (defaults to cwd)
    pub dir: Option<PathBuf>,
    /// PNG filename; derived from the target host when unset
    pub png: Option<String>,
    /// SVG filename; derived from the target host when unset
    pub svg: Option<String>,
}

impl OutputOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("QRCARD_OUTPUT_DIR") {
            self.dir = Some(PathBuf::from(dir));
        }
    }
}

/// Provider chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersOptions {
    /// Attempt order
    pub order: Vec<ProviderKind>,
    /// qrserver endpoint
    pub qrserver_endpoint: String,
    /// quickchart endpoint
    pub quickchart_endpoint: String,
    /// Budget for a single attempt, in milliseconds
    pub timeout_ms: u64,
    /// TCP connect budget, in milliseconds
    pub connect_timeout_ms: u64,
    /// Decode fetched images and reject ones carrying another payload
    pub verify: bool,
}

impl Default for ProvidersOptions {
    fn default() -> Self {
        Self {
            order: vec![
                ProviderKind::QrServer,
                ProviderKind::QuickChart,
                ProviderKind::Placeholder,
            ],
            qrserver_endpoint: RemoteFlavor::QrServer.default_endpoint().to_string(),
            quickchart_endpoint: RemoteFlavor::QuickChart.default_endpoint().to_string(),
            timeout_ms: DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
            connect_timeout_ms: 4_000,
            verify: true,
        }
    }
}

impl ProvidersOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(order) = env::var("QRCARD_PROVIDERS") {
            let parsed: Vec<ProviderKind> =
                order.split(',').filter_map(ProviderKind::parse).collect();
            if parsed.is_empty() {
                tracing::warn!("Ignoring QRCARD_PROVIDERS: no known provider in '{order}'");
            } else {
                self.order = parsed;
            }
        }
        if let Ok(timeout) = env::var("QRCARD_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.timeout_ms = value.max(1);
            }
        }
        if let Some(verify) = env_flag("QRCARD_VERIFY") {
            self.verify = verify;
        }
    }
}

/// Recent-targets history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Persist accepted targets
    pub enabled: bool,
    /// History file; defaults to the user data directory
    pub path: Option<PathBuf>,
    /// Number of entries kept
    pub capacity: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HistoryOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("QRCARD_HISTORY_PATH") {
            if path.trim().is_empty() {
                self.path = None;
            } else {
                self.path = Some(PathBuf::from(path));
            }
        }
        if let Some(enabled) = env_flag("QRCARD_HISTORY") {
            self.enabled = enabled;
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRCARD_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in terminal logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
    /// Print provider metrics when the run finishes
    pub metrics: bool,
    /// Format used when printing metrics
    pub metrics_format: MetricsFormat,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
            metrics: false,
            metrics_format: MetricsFormat::Json,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRCARD_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRCARD_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(color) = env_flag("QRCARD_LOG_COLOR") {
            self.color = color;
        }
        if let Ok(rotation) = env::var("QRCARD_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::from_str(&rotation) {
                self.rotation = Some(parsed);
            }
        }
        if let Some(metrics) = env_flag("QRCARD_METRICS") {
            self.metrics = metrics;
        }
        if let Ok(format) = env::var("QRCARD_METRICS_FORMAT") {
            if let Ok(parsed) = format.parse::<MetricsFormat>() {
                self.metrics_format = parsed;
            }
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

/// Supported serialization formats for metrics output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Emit metrics as structured JSON
    Json,
    /// Emit metrics in Prometheus text exposition format
    Prometheus,
}

impl MetricsFormat {
    /// Parse a metrics format identifier (case-insensitive) from a string slice.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "prometheus" => Some(Self::Prometheus),
            _ => None,
        }
    }
}

impl FromStr for MetricsFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            format!("Unsupported metrics format '{value}', expected 'json' or 'prometheus'")
        })
    }
}
