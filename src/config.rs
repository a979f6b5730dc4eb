use secrecy::{ExposeSecret, SecretBox};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::validator::Locale;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid API key format for {service}: {reason}")]
    InvalidKeyFormat { service: String, reason: String },
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
    #[error("Environment error: {0}")]
    EnvError(#[from] env::VarError),
}

/// Configuration for API services
#[derive(Debug)]
pub struct ApiConfig {
    pub groq_key: SecretBox<String>,
    pub elevenlabs_key: SecretBox<String>,
}

impl ApiConfig {
    /// Load API configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let groq_key = Self::load_api_key("GROQ_API_KEY", "Groq")?;
        let elevenlabs_key = Self::load_api_key("ELEVENLABS_API_KEY", "ElevenLabs")?;

        Ok(Self {
            groq_key,
            elevenlabs_key,
        })
    }

    /// Load and validate a single API key from environment
    fn load_api_key(env_var: &str, service_name: &str) -> Result<SecretBox<String>, ConfigError> {
        let key = env::var(env_var).map_err(|_| ConfigError::MissingEnvVar(env_var.to_string()))?;

        if key.trim().is_empty() {
            return Err(ConfigError::InvalidKeyFormat {
                service: service_name.to_string(),
                reason: "API key cannot be empty".to_string(),
            });
        }

        Self::validate_key_format(&key, service_name)?;

        Ok(SecretBox::new(Box::new(key)))
    }

    /// Validate API key format for each service
    fn validate_key_format(key: &str, service: &str) -> Result<(), ConfigError> {
        match service {
            "Groq" => {
                // Groq keys typically start with "gsk_"
                if !key.starts_with("gsk_") {
                    return Err(ConfigError::InvalidKeyFormat {
                        service: service.to_string(),
                        reason: "Groq keys should start with 'gsk_'".to_string(),
                    });
                }
            }
            "ElevenLabs" => {
                if key.len() < 10 {
                    return Err(ConfigError::InvalidKeyFormat {
                        service: service.to_string(),
                        reason: "ElevenLabs keys should be at least 10 characters".to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Get Groq API key (use only when making API calls)
    pub fn groq_key(&self) -> &str {
        self.groq_key.expose_secret()
    }

    /// Get ElevenLabs API key (use only when making API calls)
    pub fn elevenlabs_key(&self) -> &str {
        self.elevenlabs_key.expose_secret()
    }
}

/// Load configuration with helpful error messages for development
pub fn load_config() -> Result<ApiConfig, ConfigError> {
    match ApiConfig::load() {
        Ok(config) => {
            log::info!("Successfully loaded API configuration");
            Ok(config)
        }
        Err(ConfigError::MissingEnvVar(var)) => {
            log::error!("Missing required environment variable: {}", var);
            log::error!("Create a .env file in the project root with:");
            log::error!("{}=your_api_key_here", var);
            Err(ConfigError::MissingEnvVar(var))
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            Err(e)
        }
    }
}

/// What to do when the answer to a confirmation prompt is neither yes nor no
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguousConfirmationPolicy {
    /// Drop the pending action and handle the utterance as a fresh command
    #[default]
    TreatAsNewCommand,
    /// Ask once more, then fall back to `TreatAsNewCommand`
    RepromptOnce,
    /// Cancel the pending action as if the user said no
    TreatAsNo,
}

impl FromStr for AmbiguousConfirmationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new_command" | "treat_as_new_command" => Ok(Self::TreatAsNewCommand),
            "reprompt" | "reprompt_once" => Ok(Self::RepromptOnce),
            "no" | "treat_as_no" => Ok(Self::TreatAsNo),
            other => Err(format!("unknown policy '{}'", other)),
        }
    }
}

/// Tuning for the command pipeline
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// Base URL of the marketplace REST API
    pub api_base_url: String,
    /// Quiet period before a transcript is processed
    pub debounce: Duration,
    /// Minimum AI confidence before the pattern table takes over
    pub confidence_threshold: f32,
    /// Upper bound on a single AI enhancement call
    pub enhancement_timeout: Duration,
    /// Checkout totals at or above this need a spoken yes
    pub checkout_confirmation_threshold: f64,
    /// Add-to-cart quantities at or above this need a spoken yes
    pub bulk_quantity_threshold: u32,
    pub ambiguous_confirmation: AmbiguousConfirmationPolicy,
    pub locale: Locale,
    pub currency: String,
    pub vendor_roster: Vec<String>,
    /// Spoken after a failed search
    pub search_suggestions: Vec<String>,
    /// Where session metrics are written; `None` keeps them in memory
    pub metrics_dir: Option<PathBuf>,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            debounce: Duration::from_millis(500),
            confidence_threshold: 0.7,
            enhancement_timeout: Duration::from_secs(6),
            checkout_confirmation_threshold: 500.0,
            bulk_quantity_threshold: 5,
            ambiguous_confirmation: AmbiguousConfirmationPolicy::default(),
            locale: Locale::English,
            currency: "shekels".to_string(),
            vendor_roster: vec![
                "Galilee Farms".to_string(),
                "Jaffa Bakery".to_string(),
                "Negev Dairy".to_string(),
                "Carmel Spice House".to_string(),
            ],
            search_suggestions: vec![
                "bread".to_string(),
                "cheese".to_string(),
                "olive oil".to_string(),
            ],
            metrics_dir: None,
        }
    }
}

impl CommerceConfig {
    /// Defaults overridden by `VOICE_COMMERCE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Some(url) = read_var("VOICE_COMMERCE_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = parse_var::<u64>("VOICE_COMMERCE_DEBOUNCE_MS")? {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(threshold) = parse_var::<f32>("VOICE_COMMERCE_CONFIDENCE_THRESHOLD")? {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue {
                    var: "VOICE_COMMERCE_CONFIDENCE_THRESHOLD".to_string(),
                    reason: "must be between 0 and 1".to_string(),
                });
            }
            config.confidence_threshold = threshold;
        }
        if let Some(ms) = parse_var::<u64>("VOICE_COMMERCE_ENHANCEMENT_TIMEOUT_MS")? {
            config.enhancement_timeout = Duration::from_millis(ms);
        }
        if let Some(total) = parse_var::<f64>("VOICE_COMMERCE_CHECKOUT_CONFIRM_TOTAL")? {
            config.checkout_confirmation_threshold = total;
        }
        if let Some(quantity) = parse_var::<u32>("VOICE_COMMERCE_BULK_QUANTITY")? {
            config.bulk_quantity_threshold = quantity;
        }
        if let Some(policy) = parse_var::<AmbiguousConfirmationPolicy>(
            "VOICE_COMMERCE_AMBIGUOUS_CONFIRMATION",
        )? {
            config.ambiguous_confirmation = policy;
        }
        if let Some(locale) = parse_var::<Locale>("VOICE_COMMERCE_LOCALE")? {
            config.locale = locale;
        }
        if let Some(dir) = read_var("VOICE_COMMERCE_METRICS_DIR") {
            config.metrics_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match read_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var: name.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}
