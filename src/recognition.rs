//! Events coming from whatever does speech recognition upstream.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "error", content = "detail")]
pub enum RecognitionError {
    #[error("No speech detected")]
    NoSpeech,
    #[error("Microphone access not allowed")]
    NotAllowed,
    #[error("Network error during recognition")]
    Network,
    #[error("Recognition aborted")]
    Aborted,
    #[error("Recognition error: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Map the browser-style error codes ("no-speech", "not-allowed", ...)
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => RecognitionError::NoSpeech,
            "not-allowed" | "service-not-allowed" => RecognitionError::NotAllowed,
            "network" => RecognitionError::Network,
            "aborted" => RecognitionError::Aborted,
            other => RecognitionError::Other(other.to_string()),
        }
    }

    /// What the shopper hears
    pub fn user_message(&self) -> &'static str {
        match self {
            RecognitionError::NoSpeech => "I didn't hear anything. Please try again.",
            RecognitionError::NotAllowed => {
                "I can't access the microphone. Please allow microphone access and try again."
            }
            RecognitionError::Network => {
                "I'm having connectivity issues. Please check your connection and try again."
            }
            RecognitionError::Aborted => "Listening was interrupted. Please try again.",
            RecognitionError::Other(_) => "Sorry, I had trouble hearing you. Could you try again?",
        }
    }

    /// Aborts are usually user-initiated and not worth speaking about
    pub fn should_speak(&self) -> bool {
        !matches!(self, RecognitionError::Aborted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Partial hypothesis while the user is still talking
    Interim(String),
    /// Settled transcript for one utterance
    Final(String),
    Error(RecognitionError),
}
