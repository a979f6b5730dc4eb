use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: f32,
    /// Ask the API for a JSON object instead of free text
    pub json_mode: bool,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.1,
            max_tokens: Some(512),
            top_p: 1.0,
            json_mode: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
    pub model: String,
    pub finish_reason: Option<String>,
}

#[derive(Debug)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

pub struct GroqLLM {
    client: Client,
    api_key: String,
    base_url: String,
    config: LLMConfig,
}

impl GroqLLM {
    pub fn new(api_key: String) -> Result<Self, LLMError> {
        Self::with_config(api_key, LLMConfig::default())
    }

    pub fn with_config(api_key: String, config: LLMConfig) -> Result<Self, LLMError> {
        if api_key.trim().is_empty() {
            return Err(LLMError::Config("Groq API key is empty".to_string()));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            config,
        })
    }

    /// Point the client at another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    fn request_payload(&self, messages: &[Message]) -> Value {
        let messages_json: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content
                })
            })
            .collect();

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_json,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "stream": false
        });

        if let Some(max_tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }

        if self.config.json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        payload
    }

    /// Generate a completion from messages
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LLMResponse, LLMError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = self.request_payload(&messages);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response.text().await?;
        parse_response(&response_text, &self.config.model)
    }

    /// Ask with system message
    pub async fn ask_with_system(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LLMError> {
        let messages = vec![Message::system(system_prompt), Message::user(user_prompt)];
        let response = self.complete(messages).await?;
        if let Some(usage) = &response.usage {
            log::debug!(
                "LLM usage: {} prompt + {} completion = {} tokens",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        Ok(response.content)
    }
}

/// Parse a non-streaming chat completion body
pub fn parse_response(response_text: &str, default_model: &str) -> Result<LLMResponse, LLMError> {
    let json: Value = serde_json::from_str(response_text)
        .map_err(|e| LLMError::ParseError(format!("Invalid JSON: {}", e)))?;

    let choices = json["choices"]
        .as_array()
        .ok_or_else(|| LLMError::ParseError("Missing 'choices' field".to_string()))?;

    let first_choice = choices
        .first()
        .ok_or_else(|| LLMError::ParseError("Empty choices array".to_string()))?;

    let content = first_choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let finish_reason = first_choice["finish_reason"]
        .as_str()
        .map(|s| s.to_string());

    let model = json["model"].as_str().unwrap_or(default_model).to_string();

    let usage = json.get("usage").map(|usage_json| Usage {
        prompt_tokens: usage_json["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage_json["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: usage_json["total_tokens"].as_u64().unwrap_or(0) as u32,
    });

    Ok(LLMResponse {
        content,
        usage,
        model,
        finish_reason,
    })
}
