//! Rules deciding whether a resolved command may run, needs a spoken yes, or
//! is rejected, plus yes/no classification of the answer.

use crate::commerce::{format_amount, Product};
use crate::config::CommerceConfig;
use crate::intent::{Entities, Intent};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    English,
    /// Hebrew answers, with English still understood
    Hebrew,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::English),
            "he" | "he-il" | "iw" | "hebrew" => Ok(Locale::Hebrew),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::English => write!(f, "en"),
            Locale::Hebrew => write!(f, "he"),
        }
    }
}

const ENGLISH_YES: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "ok", "okay", "go ahead", "do it", "confirm",
    "absolutely", "please do", "correct", "sounds good",
];

const ENGLISH_NO: &[&str] = &[
    "no", "nope", "nah", "cancel", "never mind", "nevermind", "stop", "don't", "do not",
    "not now", "wait",
];

const HEBREW_YES: &[&str] = &["כן", "בטח", "יאללה", "אישור", "סבבה", "בסדר", "נכון"];

const HEBREW_NO: &[&str] = &["לא", "בטל", "תבטל", "עזוב", "עצור", "רגע"];

fn word_pattern(words: &[&str]) -> Regex {
    let alternatives = words
        .iter()
        .map(|word| regex::escape(word).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).expect("valid answer pattern")
}

static ENGLISH_YES_RE: Lazy<Regex> = Lazy::new(|| word_pattern(ENGLISH_YES));
static ENGLISH_NO_RE: Lazy<Regex> = Lazy::new(|| word_pattern(ENGLISH_NO));
static HEBREW_YES_RE: Lazy<Regex> = Lazy::new(|| word_pattern(HEBREW_YES));
static HEBREW_NO_RE: Lazy<Regex> = Lazy::new(|| word_pattern(HEBREW_NO));

/// Everything the rules look at for one command
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    pub intent: Intent,
    pub entities: &'a Entities,
    pub cart_total: f64,
    pub cart_items: usize,
    pub current_product: Option<&'a Product>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub needs_confirmation: bool,
    pub confidence: f32,
    /// Rejection reason, spoken as-is
    pub message: Option<String>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            needs_confirmation: false,
            confidence: 1.0,
            message: None,
        }
    }

    fn confirm() -> Self {
        Self {
            is_valid: true,
            needs_confirmation: true,
            confidence: 0.8,
            message: None,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            needs_confirmation: false,
            confidence: 0.0,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandValidator {
    checkout_confirmation_threshold: f64,
    bulk_quantity_threshold: u32,
    locale: Locale,
    currency: String,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::from_config(&CommerceConfig::default())
    }
}

impl CommandValidator {
    pub fn from_config(config: &CommerceConfig) -> Self {
        Self {
            checkout_confirmation_threshold: config.checkout_confirmation_threshold,
            bulk_quantity_threshold: config.bulk_quantity_threshold,
            locale: config.locale,
            currency: config.currency.clone(),
        }
    }

    pub fn validate_command(&self, request: &ValidationRequest<'_>) -> ValidationResult {
        match request.intent {
            Intent::AddToCart => {
                if request.current_product.is_none() {
                    return ValidationResult::rejected(
                        "Please search for a product first, then ask me to add it to your cart.",
                    );
                }
                if request.entities.quantity_or_default() >= self.bulk_quantity_threshold {
                    return ValidationResult::confirm();
                }
                ValidationResult::valid()
            }
            Intent::Checkout => {
                if request.cart_items == 0 || request.cart_total <= 0.0 {
                    return ValidationResult::rejected(
                        "Your cart is empty. Add some items before checking out.",
                    );
                }
                if request.cart_total >= self.checkout_confirmation_threshold {
                    return ValidationResult::confirm();
                }
                ValidationResult::valid()
            }
            intent => {
                debug_assert!(intent.is_informational());
                ValidationResult::valid()
            }
        }
    }

    pub fn generate_confirmation_prompt(
        &self,
        intent: Intent,
        entities: &Entities,
        request: &ValidationRequest<'_>,
    ) -> String {
        match intent {
            Intent::Checkout => format!(
                "Your total is {} {}. Would you like to proceed to checkout?",
                format_amount(request.cart_total),
                self.currency
            ),
            Intent::AddToCart => {
                let quantity = entities.quantity_or_default();
                match request.current_product {
                    Some(product) => format!(
                        "Just to confirm, add {} of {} for {} {}?",
                        quantity,
                        product.name,
                        format_amount(product.price * quantity as f64),
                        self.currency
                    ),
                    None => format!("Just to confirm, add {} items to your cart?", quantity),
                }
            }
            other => {
                let name: &str = other.as_ref();
                format!("Should I go ahead with {}?", name.replace('_', " "))
            }
        }
    }

    /// Contains a yes word and no no word
    pub fn is_affirmative_response(&self, text: &str) -> bool {
        let (yes, no) = self.classify(text);
        yes && !no
    }

    /// Contains a no word; a mixed answer counts as no
    pub fn is_negative_response(&self, text: &str) -> bool {
        self.classify(text).1
    }

    fn classify(&self, text: &str) -> (bool, bool) {
        let yes = ENGLISH_YES_RE.is_match(text);
        let no = ENGLISH_NO_RE.is_match(text);
        match self.locale {
            Locale::English => (yes, no),
            Locale::Hebrew => (
                yes || HEBREW_YES_RE.is_match(text),
                no || HEBREW_NO_RE.is_match(text),
            ),
        }
    }
}
