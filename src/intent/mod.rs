//! Turning an utterance into a structured intent.
//!
//! The remote enhancer is tried first under a timeout; anything short of a
//! confident answer falls back to the local pattern table in [`patterns`].

pub mod http;
pub mod patterns;

use crate::commerce::{CartItem, Product};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub use http::HttpCommandEnhancer;
pub use patterns::{PatternCommand, PatternMatch};

#[derive(Error, Debug)]
pub enum EnhancementError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
    #[error("Enhancement timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM error: {0}")]
    LLM(String),
}

/// Closed set of things a shopper can ask for
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    SearchProduct,
    AddToCart,
    ShowDeals,
    ShowCart,
    Checkout,
    BrowseVendor,
    Greeting,
    AskAbout,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Intent {
    /// Intents that only read or inform
    pub fn is_informational(self) -> bool {
        matches!(
            self,
            Intent::SearchProduct
                | Intent::ShowDeals
                | Intent::ShowCart
                | Intent::BrowseVendor
                | Intent::Greeting
                | Intent::AskAbout
                | Intent::Unknown
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Values pulled out of an utterance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entities {
    #[serde(default, alias = "productName", alias = "product_name")]
    pub product: Option<String>,
    #[serde(default, alias = "vendorName", alias = "vendor_name")]
    pub vendor: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default, alias = "price_range")]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Entities {
    pub fn quantity_or_default(&self) -> u32 {
        self.quantity.filter(|q| *q > 0).unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResolution {
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub enhanced_query: Option<String>,
    #[serde(default)]
    pub suggested_response: Option<String>,
}

impl IntentResolution {
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// What the enhancer is told about the conversation so far
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementContext {
    pub has_current_product: bool,
    pub cart_items: usize,
    pub current_product_name: Option<String>,
    pub cart: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl EnhancementContext {
    pub fn new(current_product: Option<&Product>, cart: &[CartItem]) -> Self {
        Self {
            has_current_product: current_product.is_some(),
            cart_items: cart.len(),
            current_product_name: current_product.map(|p| p.name.clone()),
            cart: cart
                .iter()
                .map(|item| CartLine {
                    name: item.product.name.clone(),
                    quantity: item.quantity,
                    price: item.product.price,
                })
                .collect(),
        }
    }
}

#[async_trait]
pub trait CommandEnhancer: Send + Sync {
    async fn enhance_command(
        &self,
        transcript: &str,
        context: &EnhancementContext,
    ) -> Result<IntentResolution, EnhancementError>;
}

/// Where a resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Enhanced,
    Pattern(PatternCommand),
    Unmatched,
}

#[derive(Debug)]
pub struct Resolution {
    pub resolution: IntentResolution,
    pub source: ResolutionSource,
    /// Set when the enhancer failed and the pattern table was used instead
    pub enhancement_error: Option<EnhancementError>,
}

pub struct IntentResolver {
    enhancer: Option<Arc<dyn CommandEnhancer>>,
    confidence_threshold: f32,
    timeout: Duration,
}

impl IntentResolver {
    pub fn new(
        enhancer: Option<Arc<dyn CommandEnhancer>>,
        confidence_threshold: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            enhancer,
            confidence_threshold,
            timeout,
        }
    }

    /// Pattern table only
    pub fn offline() -> Self {
        Self::new(None, 0.7, Duration::from_secs(6))
    }

    pub async fn resolve(&self, transcript: &str, context: &EnhancementContext) -> Resolution {
        let mut enhancement_error = None;

        if let Some(enhancer) = &self.enhancer {
            match tokio::time::timeout(self.timeout, enhancer.enhance_command(transcript, context))
                .await
            {
                Ok(Ok(resolution)) if resolution.confidence >= self.confidence_threshold => {
                    log::info!(
                        "🧠 Enhanced '{}' → {} ({:.2})",
                        transcript,
                        resolution.intent,
                        resolution.confidence
                    );
                    return Resolution {
                        resolution,
                        source: ResolutionSource::Enhanced,
                        enhancement_error: None,
                    };
                }
                Ok(Ok(resolution)) => {
                    log::info!(
                        "🧠 Low confidence {:.2} for '{}', using patterns",
                        resolution.confidence,
                        transcript
                    );
                }
                Ok(Err(e)) => {
                    log::warn!("🧠 Enhancement failed, using patterns: {}", e);
                    enhancement_error = Some(e);
                }
                Err(_) => {
                    log::warn!("🧠 Enhancement timed out after {:?}", self.timeout);
                    enhancement_error = Some(EnhancementError::Timeout(self.timeout));
                }
            }
        }

        match patterns::match_command(transcript) {
            Some(matched) => {
                log::info!("🔤 Pattern {:?} matched '{}'", matched.command, transcript);
                Resolution {
                    source: ResolutionSource::Pattern(matched.command),
                    resolution: matched.into_resolution(),
                    enhancement_error,
                }
            }
            None => {
                log::info!("❓ Nothing matched '{}'", transcript);
                Resolution {
                    resolution: IntentResolution::unknown(),
                    source: ResolutionSource::Unmatched,
                    enhancement_error,
                }
            }
        }
    }
}
