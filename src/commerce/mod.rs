//! Marketplace collaborators consumed by the voice pipeline.
//!
//! The product API, the cart provider and the router live outside this
//! crate; these traits are the seams, with small adapters for the common
//! cases.

pub mod cart;
pub mod catalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cart::InMemoryCart;
pub use catalog::HttpProductCatalog;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
}

/// A product as returned by the marketplace search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "catalog::id_as_string")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub vendor: String,
    #[serde(default, deserialize_with = "catalog::optional_id_as_string")]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.product.price * self.quantity as f64
    }
}

/// Whole amounts without decimals ("72"), anything else with two ("72.50")
pub fn format_amount(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.2}", rounded)
    }
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Free-text product search. An empty result is not an error.
    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError>;
}

/// Cart provider. The pipeline reads it and adds to it, nothing else.
#[async_trait]
pub trait Cart: Send + Sync {
    async fn items(&self) -> Vec<CartItem>;
    async fn total(&self) -> f64;
    async fn add_to_cart(&self, item: CartItem) -> Result<(), crate::error::CommerceError>;
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn push(&self, path: &str) -> Result<(), crate::error::CommerceError>;
}

/// Navigator for front-ends without a router; records the route in the log
#[derive(Debug, Default)]
pub struct LogNavigator;

#[async_trait]
impl Navigator for LogNavigator {
    async fn push(&self, path: &str) -> Result<(), crate::error::CommerceError> {
        if !path.starts_with('/') {
            return Err(crate::error::CommerceError::Navigation(format!(
                "route must be absolute: '{}'",
                path
            )));
        }
        log::info!("🧭 Navigating to {}", path);
        Ok(())
    }
}
