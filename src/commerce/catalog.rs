use super::{CatalogError, Product, ProductCatalog};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

/// Product search over the marketplace REST API (`GET /api/products?search=`)
pub struct HttpProductCatalog {
    client: Client,
    base_url: String,
}

impl HttpProductCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let url = format!("{}/api/products", self.base_url);
        log::debug!("🔎 Searching products for '{}'", query);

        let response = self
            .client
            .get(&url)
            .query(&[("search", query)])
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        parse_products(&body)
    }
}

#[derive(Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    products: Vec<Product>,
}

/// Accepts `{ "products": [...] }` or a bare array
pub fn parse_products(body: &str) -> Result<Vec<Product>, CatalogError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| CatalogError::ParseError(format!("Invalid JSON: {}", e)))?;

    let products = if json.is_array() {
        serde_json::from_value::<Vec<Product>>(json)
    } else {
        serde_json::from_value::<ProductsEnvelope>(json).map(|envelope| envelope.products)
    };

    products.map_err(|e| CatalogError::ParseError(e.to_string()))
}

pub(crate) fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

pub(crate) fn optional_id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
