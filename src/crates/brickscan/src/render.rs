//! Text and JSON rendering of a [`ViewModel`].

use crate::error::Result;
use crate::models::{EnrichedResult, PriceQuote};
use crate::orchestrator::{Notice, ViewModel};
use std::fmt::Write;

pub const WORKING_MESSAGE: &str = "Working…";
pub const NO_MATCH_MESSAGE: &str = "No minifig match found.";
pub const FAILURE_MESSAGE: &str = "Failed to recognize the image. Please try another photo.";
pub const PRICE_PLACEHOLDER: &str = "Loading price data…";

/// Format a price with two decimals and a dollar sign.
pub fn format_price(value: f64) -> String {
    format!("${:.2}", value)
}

/// Render the whole view as plain text.
pub fn render_text(view: &ViewModel) -> String {
    let mut out = String::new();

    if let Some(preview) = &view.preview {
        let _ = writeln!(out, "Image: {}", preview);
    }
    let _ = writeln!(out, "Condition: {}", view.condition);

    if view.is_busy() {
        let _ = writeln!(out, "{}", WORKING_MESSAGE);
    }

    match &view.notice {
        Some(Notice::NoMatch) => {
            let _ = writeln!(out, "{}", NO_MATCH_MESSAGE);
        }
        Some(Notice::RecognitionFailed(_)) => {
            let _ = writeln!(out, "{}", FAILURE_MESSAGE);
        }
        None => {}
    }

    for result in &view.results {
        out.push('\n');
        out.push_str(&render_card(result));
    }

    out
}

/// Render one result card.
pub fn render_card(result: &EnrichedResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", result.name);
    let _ = writeln!(out, "  ID: {}", result.id);
    if let Some(img) = &result.img_url {
        let _ = writeln!(out, "  Image: {}", img);
    }
    if let Some(url) = &result.external_url {
        let _ = writeln!(out, "  View on BrickLink: {}", url);
    }

    match &result.price {
        Some(price) => out.push_str(&render_price(price)),
        None => {
            let _ = writeln!(out, "  {}", PRICE_PLACEHOLDER);
        }
    }

    out
}

fn render_price(price: &PriceQuote) -> String {
    format!(
        "  Avg Price: {}\n  Min: {} | Max: {}\n  Available: {}\n",
        format_price(price.avg_price),
        format_price(price.min_price),
        format_price(price.max_price),
        price.total_quantity
    )
}

/// Render the view as pretty JSON.
pub fn render_json(view: &ViewModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(view)?)
}
