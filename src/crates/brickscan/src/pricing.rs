//! Price-guide lookups against the companion backend.

use crate::client::HttpClient;
use crate::error::{BrickscanError, Result};
use crate::models::{Condition, PriceGuideResponse, PriceQuote};
use async_trait::async_trait;
use tracing::debug;

/// Source of market price statistics.
#[async_trait]
pub trait PriceGuide: Send + Sync {
    /// Look up prices for one item. `Ok(None)` means the backend had no data.
    async fn price(&self, id: &str, condition: Option<Condition>) -> Result<Option<PriceQuote>>;
}

/// Price guide served at `{base_url}/priceguide/{id}`.
#[derive(Debug, Clone)]
pub struct HttpPriceGuide {
    http: HttpClient,
    base_url: String,
}

impl HttpPriceGuide {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for an item, with the id encoded as a single path segment.
    pub fn item_url(&self, id: &str) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| BrickscanError::Config(format!("Invalid price guide URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BrickscanError::Config("Price guide URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("priceguide")
            .push(id);
        Ok(url.to_string())
    }
}

#[async_trait]
impl PriceGuide for HttpPriceGuide {
    async fn price(&self, id: &str, condition: Option<Condition>) -> Result<Option<PriceQuote>> {
        let url = self.item_url(id)?;
        let query: Vec<(&str, &str)> = condition
            .map(|c| vec![("cond", c.as_query())])
            .unwrap_or_default();

        debug!(%url, ?condition, "Fetching price guide");

        let lookup_failure = |reason: String| BrickscanError::PriceLookupFailure {
            id: id.to_string(),
            reason,
        };

        let response = self
            .http
            .get(&url, &query)
            .await
            .map_err(|e| lookup_failure(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| lookup_failure(e.to_string()))?;

        if !status.is_success() {
            return Err(lookup_failure(format!("status {}: {}", status, body)));
        }

        let parsed: PriceGuideResponse =
            serde_json::from_str(&body).map_err(|e| lookup_failure(e.to_string()))?;
        Ok(parsed.data)
    }
}
