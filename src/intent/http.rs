use super::{CommandEnhancer, EnhancementContext, EnhancementError, IntentResolution};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Enhancer backed by the marketplace's own `/api/ai/enhance-command` route
pub struct HttpCommandEnhancer {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EnhanceRequest<'a> {
    transcript: &'a str,
    context: &'a EnhancementContext,
}

impl HttpCommandEnhancer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EnhancementError> {
        // The resolver applies its own, shorter timeout on top
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CommandEnhancer for HttpCommandEnhancer {
    async fn enhance_command(
        &self,
        transcript: &str,
        context: &EnhancementContext,
    ) -> Result<IntentResolution, EnhancementError> {
        let url = format!("{}/api/ai/enhance-command", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EnhanceRequest {
                transcript,
                context,
            })
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EnhancementError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        parse_resolution(&body)
    }
}

/// Accepts a bare resolution or one wrapped in `{ "result": ... }` / `{ "data": ... }`
pub fn parse_resolution(body: &str) -> Result<IntentResolution, EnhancementError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| EnhancementError::ParseError(format!("Invalid JSON: {}", e)))?;

    let payload = ["result", "data"]
        .iter()
        .find_map(|key| json.get(*key).filter(|inner| inner.is_object()))
        .cloned()
        .unwrap_or(json);

    if payload.get("intent").is_none() {
        return Err(EnhancementError::ParseError(
            "Missing 'intent' field".to_string(),
        ));
    }

    serde_json::from_value(payload).map_err(|e| EnhancementError::ParseError(e.to_string()))
}
