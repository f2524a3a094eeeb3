//! qrcard command-line entrypoint

use clap::Parser;
use qrcard::output::{self, ArtifactFormat, RunSummary, render_summary};
use qrcard::{
    AcquireOutcome, AcquisitionChain, Color, Error, GenerationResult, History, ProviderKind,
    QrEncoder, QrcardConfig, Result, Session, logging, metrics, validate,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrcard",
    version,
    about = "Generate a QR code image for a personal site URL"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to qrcard.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// URL to encode (overrides configuration)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Image edge length in pixels
    #[arg(long, value_name = "PX")]
    size: Option<u32>,

    /// Quiet zone in modules
    #[arg(long, value_name = "MODULES")]
    margin: Option<u32>,

    /// Module color (#RRGGBB)
    #[arg(long, value_name = "HEX")]
    dark: Option<String>,

    /// Background color (#RRGGBB)
    #[arg(long, value_name = "HEX")]
    light: Option<String>,

    /// Error correction level: L, M, Q or H
    #[arg(long, value_name = "LEVEL")]
    ecc: Option<String>,

    /// PNG output file
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Directory for generated files
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Write both PNG and SVG
    #[arg(short, long)]
    multiple: bool,

    /// Fetch the raster from the remote service chain instead of encoding locally
    #[arg(long)]
    remote: bool,

    /// Use only this provider and fail if it fails (qrserver, quickchart, local, placeholder)
    #[arg(long, value_name = "PROVIDER", conflicts_with = "remote")]
    only: Option<String>,

    /// Print a terminal preview of the code
    #[arg(long)]
    preview: bool,

    /// Print the PNG data URI to stdout
    #[arg(long)]
    data_uri: bool,

    /// Output the run summary as JSON
    #[arg(long)]
    json: bool,

    /// List recently used targets and exit
    #[arg(long)]
    history: bool,

    /// Print provider attempt metrics when done
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!("{}", retry_hint(&err));
            ExitCode::FAILURE
        }
    }
}

fn retry_hint(err: &Error) -> &'static str {
    match err {
        Error::Validation(_) => "Check the URL (http/https only) and render settings, then run again.",
        Error::Output { .. } => "Check that the output directory exists and is writable, then run again.",
        Error::Config(_) => "Fix the configuration file or environment overrides, then run again.",
        Error::Provider { .. } => "The provider may be unavailable; run again or drop --only to use the fallback chain.",
        _ => "Run the command again; use QRCARD_LOG_LEVEL=debug for details.",
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = QrcardConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli)?;

    logging::init(&config.logging)?;
    if config.logging.metrics {
        metrics::enable();
    }

    let mut history = History::open(&config.history);

    if cli.history {
        if history.entries().is_empty() {
            println!("No recent targets");
        } else {
            println!("Recent targets ({}):", history.active_store());
            for (i, entry) in history.entries().iter().enumerate() {
                println!("  {}. {entry}", i + 1);
            }
        }
        return Ok(());
    }

    let request = config.request()?;
    let target = validate::parse_target(request.payload())?;
    let encoder = QrEncoder::new();
    let info = encoder.info(&request)?;

    info!(target = %request.payload(), size = request.size(), "Generating QR code");

    let result: GenerationResult = if cli.remote {
        let chain = AcquisitionChain::from_options(&config.providers)?;
        let session = Session::new(chain, history);
        match session.generate(&request).await {
            AcquireOutcome::Ready(result) => result,
            AcquireOutcome::Busy | AcquireOutcome::Superseded => {
                return Err(Error::Other("QR acquisition was interrupted".to_string()));
            }
        }
    } else {
        let result = match cli.only.as_deref() {
            Some(label) => {
                let kind = ProviderKind::parse(label)
                    .ok_or_else(|| Error::Validation(format!("unknown provider '{label}'")))?;
                let mut options = config.providers.clone();
                options.order = vec![kind];
                AcquisitionChain::from_options(&options)?
                    .attempt_only(kind, &request)
                    .await?
            }
            None => {
                let image = encoder.render(&request)?;
                GenerationResult::new(image, request.size(), ProviderKind::LocalEncoder).map_err(
                    |source| Error::Provider {
                        provider: ProviderKind::LocalEncoder.label(),
                        source,
                    },
                )?
            }
        };
        history.record(request.payload());
        result
    };

    let mut artifacts = Vec::new();
    let png_path = cli
        .output
        .clone()
        .unwrap_or_else(|| output::artifact_path(&config.output, &target, ArtifactFormat::Png));
    artifacts.push(output::write_artifact(
        &png_path,
        ArtifactFormat::Png,
        &result.png_bytes()?,
    )?);

    if cli.multiple {
        let svg_path = output::artifact_path(&config.output, &target, ArtifactFormat::Svg);
        let svg = encoder.render_svg(&request)?;
        artifacts.push(output::write_artifact(
            &svg_path,
            ArtifactFormat::Svg,
            svg.as_bytes(),
        )?);
    }

    if cli.preview && !cli.json {
        match encoder.render_terminal(&request) {
            Ok(preview) => println!("{preview}"),
            Err(err) => println!("(Terminal preview not available: {err})"),
        }
    }

    let summary = RunSummary {
        request,
        info,
        source: result.source(),
        artifacts,
        data_uri: cli.data_uri.then(|| result.data_uri().to_string()),
    };
    let rendered = render_summary(&summary);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rendered.json)?);
    } else {
        for line in &rendered.human {
            println!("{line}");
        }
        if let Some(uri) = &summary.data_uri {
            println!("{uri}");
        }
    }

    if let Some(snapshot) = metrics::snapshot() {
        metrics::log_snapshot(&snapshot);
        eprintln!(
            "{}",
            metrics::render(&snapshot, config.logging.metrics_format)?
        );
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut QrcardConfig, cli: &Cli) -> Result<()> {
    if let Some(url) = &cli.url {
        config.target = Some(url.clone());
    }
    if let Some(size) = cli.size {
        config.render.size = size;
    }
    if let Some(margin) = cli.margin {
        config.render.margin = margin;
    }
    if let Some(dark) = &cli.dark {
        config.render.dark = Color::parse(dark)?;
    }
    if let Some(light) = &cli.light {
        config.render.light = Color::parse(light)?;
    }
    if let Some(ecc) = &cli.ecc {
        config.render.ecc = ecc.parse()?;
    }
    if let Some(dir) = &cli.out_dir {
        config.output.dir = Some(dir.clone());
    }
    if cli.metrics {
        config.logging.metrics = true;
    }
    Ok(())
}
