//! Upload orchestration: recognize an image, enrich the matches with prices,
//! and publish the result as a [`ViewModel`].
//!
//! Every submit takes a new generation number. Work belonging to an older
//! generation is dropped when it finishes instead of overwriting the view,
//! and the stale caller gets [`BrickscanError::Superseded`].
//!
//! # Example
//!
//! ```rust,ignore
//! use brickscan::{ScanConfig, UploadOrchestrator, UploadedImage, Condition};
//!
//! let orchestrator = UploadOrchestrator::from_config(&ScanConfig::default())?;
//! let view = orchestrator.submit(UploadedImage::from_path("fig.jpg").await?).await?;
//! let view = orchestrator.refresh_condition(Condition::Used).await?;
//! ```

use crate::client::HttpClient;
use crate::config::ScanConfig;
use crate::error::{BrickscanError, Result};
use crate::models::{Condition, EnrichedResult, PriceQuote, UploadedImage};
use crate::pricing::{HttpPriceGuide, PriceGuide};
use crate::recognition::{HttpRecognizer, Recognizer};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Coarse progress of the current scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Working,
    Settled,
    Failed,
}

/// Status shown alongside (or instead of) results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Notice {
    /// Recognition succeeded but matched nothing.
    NoMatch,
    /// Recognition failed; carries the underlying error text.
    RecognitionFailed(String),
}

/// Everything a front end needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub phase: Phase,
    pub condition: Condition,
    /// Filename of the last submitted image.
    pub preview: Option<String>,
    pub results: Vec<EnrichedResult>,
    pub notice: Option<Notice>,
    pub generation: u64,
}

impl ViewModel {
    fn idle(condition: Condition) -> Self {
        Self {
            phase: Phase::Idle,
            condition,
            preview: None,
            results: Vec::new(),
            notice: None,
            generation: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Working
    }
}

/// Drives recognize → enrich → publish for one user session.
pub struct UploadOrchestrator {
    recognizer: Arc<dyn Recognizer>,
    prices: Arc<dyn PriceGuide>,
    generation: AtomicU64,
    state: RwLock<ViewModel>,
}

impl UploadOrchestrator {
    pub fn new(recognizer: Arc<dyn Recognizer>, prices: Arc<dyn PriceGuide>) -> Self {
        Self {
            recognizer,
            prices,
            generation: AtomicU64::new(0),
            state: RwLock::new(ViewModel::idle(Condition::default())),
        }
    }

    /// Start with a specific price condition.
    pub fn with_condition(self, condition: Condition) -> Self {
        self.state.write().condition = condition;
        self
    }

    /// Build HTTP-backed collaborators from configuration.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::new(config.client_config())?;
        let mut recognizer = HttpRecognizer::new(http.clone(), config.recognition_endpoint());
        if let Some(fallback) = config.fallback_endpoint() {
            recognizer = recognizer.with_fallback(fallback);
        }
        let prices = HttpPriceGuide::new(http, config.api_base.clone());

        Ok(Self::new(Arc::new(recognizer), Arc::new(prices)).with_condition(config.condition))
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> ViewModel {
        self.state.read().clone()
    }

    pub fn condition(&self) -> Condition {
        self.state.read().condition
    }

    /// Recognize an image and enrich every match with price data.
    ///
    /// Zero matches settle with [`Notice::NoMatch`] and no price lookups.
    pub async fn submit(&self, image: UploadedImage) -> Result<ViewModel> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write();
            state.phase = Phase::Working;
            state.preview = Some(image.filename.clone());
            state.results.clear();
            state.notice = None;
            state.generation = generation;
        }
        info!(generation, file = %image.filename, source = ?image.source, "Scan started");

        let items = match self.recognizer.recognize(&image).await {
            Ok(items) => items,
            Err(e) => {
                let err = match e {
                    BrickscanError::RecognitionFailure(_) => e,
                    other => BrickscanError::RecognitionFailure(other.to_string()),
                };
                warn!(generation, error = %err, "Recognition failed");
                self.commit(generation, |state| {
                    state.phase = Phase::Failed;
                    state.results.clear();
                    state.notice = Some(Notice::RecognitionFailed(err.to_string()));
                })?;
                return Err(err);
            }
        };
        drop(image);

        if items.is_empty() {
            info!(generation, "No match found");
            return self.commit(generation, |state| {
                state.phase = Phase::Settled;
                state.notice = Some(Notice::NoMatch);
            });
        }

        // Read late so a condition change during recognition is honoured.
        let mut condition = self.condition();
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        loop {
            let prices = self.lookup_prices(ids.clone(), condition).await;

            let mut state = self.state.write();
            self.ensure_current(generation)?;
            if state.condition != condition {
                // Changed while the lookups were in flight.
                condition = state.condition;
                drop(state);
                info!(generation, %condition, "Condition changed during enrichment, re-pricing");
                continue;
            }

            state.phase = Phase::Settled;
            state.results = items
                .iter()
                .zip(prices)
                .map(|(item, price)| EnrichedResult::new(item, price))
                .collect();
            info!(generation, results = state.results.len(), %condition, "Scan settled");
            return Ok(state.clone());
        }
    }

    /// Re-fetch prices for the held results under a new condition.
    ///
    /// Stores the condition either way; issues no lookups if nothing is held.
    pub async fn refresh_condition(&self, condition: Condition) -> Result<ViewModel> {
        let ids: Vec<String> = {
            let mut state = self.state.write();
            state.condition = condition;
            if state.results.is_empty() {
                return Ok(state.clone());
            }
            state.results.iter().map(|r| r.id.clone()).collect()
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write();
            state.phase = Phase::Working;
            state.generation = generation;
        }
        info!(generation, %condition, items = ids.len(), "Refreshing prices");

        let prices = self
            .lookup_prices(ids.iter().map(String::as_str).collect(), condition)
            .await;

        self.commit(generation, |state| {
            for (result, price) in state.results.iter_mut().zip(prices) {
                result.price = price;
            }
            state.phase = Phase::Settled;
        })
    }

    /// Issue one lookup per id concurrently and wait for all of them.
    async fn lookup_prices(&self, ids: Vec<&str>, condition: Condition) -> Vec<Option<PriceQuote>> {
        let lookups = ids.into_iter().map(|id| async move {
            match self.prices.price(id, Some(condition)).await {
                Ok(quote) => quote,
                Err(e) => {
                    warn!(id, error = %e, "Price lookup failed");
                    None
                }
            }
        });

        join_all(lookups).await
    }

    /// Apply `update` if `generation` is still current.
    fn commit(&self, generation: u64, update: impl FnOnce(&mut ViewModel)) -> Result<ViewModel> {
        let mut state = self.state.write();
        self.ensure_current(generation)?;

        update(&mut state);
        Ok(state.clone())
    }

    /// Callers hold the state lock so no newer generation can publish in between.
    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.generation.load(Ordering::SeqCst) != generation {
            warn!(generation, "Discarding stale scan result");
            return Err(BrickscanError::Superseded { generation });
        }
        Ok(())
    }
}
