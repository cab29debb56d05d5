//! Image recognition clients.
//!
//! # Example
//!
//! ```rust,ignore
//! use brickscan::recognition::{HttpRecognizer, RecognitionEndpoint, Recognizer};
//!
//! let recognizer = HttpRecognizer::new(
//!     http,
//!     RecognitionEndpoint::new("http://localhost:3001/recognize", "image"),
//! )
//! .with_fallback(RecognitionEndpoint::new(
//!     "https://api.brickognize.com/predict/",
//!     "query_image",
//! ));
//!
//! let items = recognizer.recognize(&image).await?;
//! ```

use crate::client::{success_body, HttpClient};
use crate::error::{BrickscanError, Result};
use crate::models::{RecognitionResponse, RecognizedItem, UploadedImage};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Identifies catalog items in an uploaded image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Return candidate matches in the order the service ranked them.
    async fn recognize(&self, image: &UploadedImage) -> Result<Vec<RecognizedItem>>;
}

/// A recognition URL and the multipart field it expects the image under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionEndpoint {
    pub url: String,
    pub field: String,
}

impl RecognitionEndpoint {
    pub fn new(url: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            field: field.into(),
        }
    }
}

/// Recognizer backed by a multipart HTTP endpoint, with an optional legacy fallback.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    http: HttpClient,
    primary: RecognitionEndpoint,
    fallback: Option<RecognitionEndpoint>,
}

impl HttpRecognizer {
    pub fn new(http: HttpClient, primary: RecognitionEndpoint) -> Self {
        Self {
            http,
            primary,
            fallback: None,
        }
    }

    /// Try this endpoint once if the primary fails.
    pub fn with_fallback(mut self, fallback: RecognitionEndpoint) -> Self {
        self.fallback = Some(fallback);
        self
    }

    async fn call(
        &self,
        endpoint: &RecognitionEndpoint,
        image: &UploadedImage,
    ) -> Result<Vec<RecognizedItem>> {
        debug!(url = %endpoint.url, field = %endpoint.field, file = %image.filename, "Sending recognition request");

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(image.mime_type())?;
        let form = Form::new().part(endpoint.field.clone(), part);

        let response = self.http.post_multipart(&endpoint.url, form).await?;
        let body = success_body(response).await?;
        let parsed: RecognitionResponse = serde_json::from_str(&body)?;

        debug!(url = %endpoint.url, items = parsed.items.len(), "Recognition response decoded");
        Ok(parsed.items)
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, image: &UploadedImage) -> Result<Vec<RecognizedItem>> {
        let primary_err = match self.call(&self.primary, image).await {
            Ok(items) => return Ok(items),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(BrickscanError::RecognitionFailure(primary_err.to_string()));
        };

        warn!(
            url = %self.primary.url,
            fallback = %fallback.url,
            error = %primary_err,
            "Primary recognition failed, trying fallback"
        );

        self.call(fallback, image).await.map_err(|fallback_err| {
            BrickscanError::RecognitionFailure(format!(
                "primary: {}; fallback: {}",
                primary_err, fallback_err
            ))
        })
    }
}
