//! Voice-driven shopping for a local marketplace.
//!
//! Transcripts come in, get resolved to shopping intents (AI first, regex
//! table as the safety net), are validated and, for risky actions, confirmed
//! out loud before the cart or the router is touched. Replies go out through
//! a single serialized speech queue, and every turn is measured.

pub mod audio_queue;
pub mod audio_sink;
pub mod commerce;
pub mod config;
pub mod error;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod performance;
pub mod recognition;
pub mod tts;
pub mod validator;

pub use error::{CommerceError, Result};
pub use orchestrator::{Collaborators, DialogueState, VoiceCommerce};
