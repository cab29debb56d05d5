//! Data model shared by the recognition and price-guide clients.
//!
//! The wire types here double as the schema check at the network boundary:
//! anything that does not deserialize into them is treated as a decode
//! failure rather than being passed along half-formed.

use crate::error::{BrickscanError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Where an uploaded image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// Chosen from the filesystem.
    Picker,
    /// Captured from a camera or piped in.
    Capture,
}

/// An image supplied by the user for a single recognition request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub source: ImageSource,
}

impl UploadedImage {
    /// Create an image from raw bytes.
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, source: ImageSource) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            source,
        }
    }

    /// Read an image from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BrickscanError::InvalidInput(format!("No file name in {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        Ok(Self::new(bytes, filename, ImageSource::Picker))
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        image_mime_type(&self.filename).unwrap_or("application/octet-stream")
    }
}

/// MIME type for a filename with a known image extension.
pub fn image_mime_type(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

/// A link to the item on another catalog site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSite {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A candidate match returned by the recognition endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub external_sites: Vec<ExternalSite>,
}

impl RecognizedItem {
    /// URL of the first external site named "bricklink", ignoring case.
    pub fn bricklink_url(&self) -> Option<String> {
        self.external_sites
            .iter()
            .find(|site| site.name.eq_ignore_ascii_case("bricklink"))
            .and_then(|site| site.url.clone())
    }
}

/// Body of a recognition response.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub items: Vec<RecognizedItem>,
}

/// Item condition used to select price statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Condition {
    #[default]
    #[serde(rename = "N", alias = "new")]
    New,
    #[serde(rename = "U", alias = "used")]
    Used,
}

impl Condition {
    /// Value sent in the `cond` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Condition::New => "N",
            Condition::Used => "U",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::New => write!(f, "new"),
            Condition::Used => write!(f, "used"),
        }
    }
}

impl FromStr for Condition {
    type Err = BrickscanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "new" => Ok(Condition::New),
            "u" | "used" => Ok(Condition::Used),
            other => Err(BrickscanError::InvalidInput(format!(
                "Unknown condition '{}', expected new or used",
                other
            ))),
        }
    }
}

/// Aggregate market prices for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    #[serde(deserialize_with = "de_f64")]
    pub avg_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub min_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub max_price: f64,
    #[serde(deserialize_with = "de_u64")]
    pub total_quantity: u64,
}

/// Body of a price-guide response.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceGuideResponse {
    #[serde(default)]
    pub data: Option<PriceQuote>,
}

// The price backend relays BrickLink figures, which arrive as decimal strings.
// Null counts as zero.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(NumberOrString::Number(n)) => Ok(n),
        Some(NumberOrString::String(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let n = de_f64(deserializer)?;
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
        Ok(n as u64)
    } else {
        Err(serde::de::Error::custom(format!("expected a whole quantity, got {}", n)))
    }
}

/// A recognized item joined with its price quote and BrickLink link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedResult {
    pub id: String,
    pub name: String,
    pub img_url: Option<String>,
    pub external_url: Option<String>,
    pub price: Option<PriceQuote>,
}

impl EnrichedResult {
    pub fn new(item: &RecognizedItem, price: Option<PriceQuote>) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            img_url: item.img_url.clone(),
            external_url: item.bricklink_url(),
            price,
        }
    }
}
