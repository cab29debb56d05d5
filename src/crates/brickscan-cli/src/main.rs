//! # brickscan
//!
//! Identify LEGO minifigures from a photo and show price-guide data for each match.

use anyhow::{bail, Context, Result};
use brickscan::models::image_mime_type;
use brickscan::render::{format_price, render_json, render_text};
use brickscan::{
    Condition, ConfigLayer, ConfigLoader, EndpointLayer, HttpClient, HttpPriceGuide, ImageSource,
    PriceGuide, ScanConfig, UploadOrchestrator, UploadedImage, ViewModel,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brickscan")]
#[command(about = "Identify LEGO minifigures from a photo and look up their prices", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Price-guide backend base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Legacy recognition endpoint tried once when the primary fails
    #[arg(long, global = true)]
    fallback_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize an image and show matches with prices
    Scan {
        /// Image file, or "-" to read a captured image from stdin
        image: String,

        /// Price condition: new or used
        #[arg(long)]
        condition: Option<Condition>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Re-price the matches under the other condition afterwards
        #[arg(long)]
        compare: bool,
    },

    /// Look up the price guide for one item
    Price {
        /// Catalog item id
        id: String,

        /// Price condition: new or used
        #[arg(long)]
        condition: Option<Condition>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli).await?;

    match cli.command {
        Commands::Scan {
            image,
            condition,
            format,
            compare,
        } => scan(config, &image, condition, format, compare).await,
        Commands::Price { id, condition } => price(config, &id, condition).await,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(cli: &Cli) -> Result<ScanConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().await.context("Failed to load configuration")?;

    config.apply(ConfigLayer {
        api_base: cli.api_base.clone(),
        fallback: cli.fallback_url.clone().map(|url| EndpointLayer {
            url: Some(url),
            field: None,
        }),
        ..Default::default()
    });
    config.validate()?;
    debug!(
        api_base = %config.api_base,
        condition = %config.condition,
        fallback = config.fallback.url.is_some(),
        "Configuration loaded"
    );

    Ok(config)
}

async fn scan(
    config: ScanConfig,
    image: &str,
    condition: Option<Condition>,
    format: OutputFormat,
    compare: bool,
) -> Result<()> {
    let image = read_image(image).await?;
    let condition = condition.unwrap_or(config.condition);
    let orchestrator = UploadOrchestrator::from_config(&config)?.with_condition(condition);

    let view = match orchestrator.submit(image).await {
        Ok(view) => view,
        Err(e) => {
            emit(&orchestrator.view(), format)?;
            return Err(e).context("Scan failed");
        }
    };
    emit(&view, format)?;

    if compare && !view.results.is_empty() {
        let other = match condition {
            Condition::New => Condition::Used,
            Condition::Used => Condition::New,
        };
        debug!(%other, "Comparing against the other condition");
        let view = orchestrator.refresh_condition(other).await?;
        if format == OutputFormat::Text {
            println!();
        }
        emit(&view, format)?;
    }

    Ok(())
}

async fn price(config: ScanConfig, id: &str, condition: Option<Condition>) -> Result<()> {
    let condition = condition.unwrap_or(config.condition);
    let http = HttpClient::new(config.client_config())?;
    let guide = HttpPriceGuide::new(http, config.api_base.clone());

    match guide.price(id, Some(condition)).await? {
        Some(quote) => {
            println!("{} ({})", id, condition);
            println!("  Avg Price: {}", format_price(quote.avg_price));
            println!(
                "  Min: {} | Max: {}",
                format_price(quote.min_price),
                format_price(quote.max_price)
            );
            println!("  Available: {}", quote.total_quantity);
        }
        None => println!("{} ({}): no price data available.", id, condition),
    }

    Ok(())
}

fn emit(view: &ViewModel, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(view)),
        OutputFormat::Json => println!("{}", render_json(view)?),
    }
    Ok(())
}

/// Read an image file, or a captured image from stdin when `arg` is "-".
async fn read_image(arg: &str) -> Result<UploadedImage> {
    if arg == "-" {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read image from stdin")?;
        if bytes.is_empty() {
            bail!("No image data on stdin");
        }
        return Ok(UploadedImage::new(bytes, "capture.jpg", ImageSource::Capture));
    }

    // Same filter a browser file picker applies with accept="image/*".
    if image_mime_type(arg).is_none() {
        bail!("{} is not an image file", arg);
    }

    UploadedImage::from_path(arg)
        .await
        .with_context(|| format!("Failed to read {}", arg))
}
