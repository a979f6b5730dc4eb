use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TTSError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Voice personas offered to shoppers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone)]
pub struct TTSConfig {
    pub female_voice_id: String,
    pub male_voice_id: String,
    pub model: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            female_voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(), // Rachel
            male_voice_id: "29vD33N1CtxCmqQRPOHJ".to_string(),   // Drew
            model: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

impl TTSConfig {
    pub fn voice_id(&self, voice: Voice) -> &str {
        match voice {
            Voice::Female => &self.female_voice_id,
            Voice::Male => &self.male_voice_id,
        }
    }
}

/// Synthesized speech ready for an [`crate::audio_sink::AudioSink`]
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub text: String,
    pub voice: Voice,
    /// Encoded audio; empty for text-only front-ends
    pub data: Vec<u8>,
    pub format: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<AudioClip, TTSError>;
}

/// Passes the text through without audio. Used with [`crate::audio_sink::ConsoleSink`].
#[derive(Debug, Default)]
pub struct TextOnlySynthesizer;

#[async_trait]
impl SpeechSynthesizer for TextOnlySynthesizer {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<AudioClip, TTSError> {
        Ok(AudioClip {
            text: text.to_string(),
            voice,
            data: Vec::new(),
            format: "text".to_string(),
        })
    }
}

pub struct ElevenLabsTTS {
    client: Client,
    api_key: String,
    base_url: String,
    config: TTSConfig,
}

impl ElevenLabsTTS {
    pub fn new(api_key: String) -> Result<Self, TTSError> {
        Self::with_config(api_key, TTSConfig::default())
    }

    pub fn with_config(api_key: String, config: TTSConfig) -> Result<Self, TTSError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            config,
        })
    }

    fn request_payload(&self, text: &str) -> serde_json::Value {
        json!({
            "text": text,
            "model_id": self.config.model,
            "voice_settings": {
                "stability": self.config.stability,
                "similarity_boost": self.config.similarity_boost,
                "style": self.config.style,
                "use_speaker_boost": self.config.use_speaker_boost
            }
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<AudioClip, TTSError> {
        if text.trim().is_empty() {
            return Err(TTSError::Config("Cannot synthesize empty text".to_string()));
        }

        let url = format!(
            "{}/text-to-speech/{}",
            self.base_url,
            self.config.voice_id(voice)
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "audio/mpeg")
            .json(&self.request_payload(text))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TTSError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let data = response.bytes().await?.to_vec();
        log::debug!("🔊 Synthesized {} bytes for {:?} voice", data.len(), voice);

        Ok(AudioClip {
            text: text.to_string(),
            voice,
            data,
            format: "mp3".to_string(),
        })
    }
}
