//! Minifigure recognition with price-guide enrichment.
//!
//! An uploaded photo is sent to a recognition service; every candidate it
//! returns is looked up in a price guide, and the joined results are
//! published as a [`ViewModel`] for a front end to draw.
//!
//! # Modules
//!
//! - [`orchestrator`] - `UploadOrchestrator`: submit, refresh on condition change
//! - [`recognition`] - `Recognizer` trait and the multipart HTTP client with fallback
//! - [`pricing`] - `PriceGuide` trait and the `/priceguide/{id}` client
//! - [`models`] - wire and view types
//! - [`render`] - text cards and JSON output
//! - [`config`] - layered configuration (files, environment)
//! - [`client`] - shared reqwest wrapper
//!
//! # Example
//!
//! ```rust,ignore
//! use brickscan::{render, ConfigLoader, UploadOrchestrator, UploadedImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load().await?;
//!     let orchestrator = UploadOrchestrator::from_config(&config)?;
//!
//!     let image = UploadedImage::from_path("minifig.jpg").await?;
//!     let view = orchestrator.submit(image).await?;
//!     print!("{}", render::render_text(&view));
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pricing;
pub mod recognition;
pub mod render;

// Re-export commonly used types
pub use client::{ClientConfig, HttpClient};
pub use config::{ConfigLayer, ConfigLoader, EndpointLayer, ScanConfig};
pub use error::{BrickscanError, Result};
pub use models::{
    Condition, EnrichedResult, ExternalSite, ImageSource, PriceQuote, RecognizedItem,
    UploadedImage,
};
pub use orchestrator::{Notice, Phase, UploadOrchestrator, ViewModel};
pub use pricing::{HttpPriceGuide, PriceGuide};
pub use recognition::{HttpRecognizer, RecognitionEndpoint, Recognizer};
