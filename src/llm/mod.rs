//! Chat-completion client and the LLM-backed command enhancer.

pub mod client;
pub mod enhancer;
pub mod prompts;

pub use client::{GroqLLM, LLMConfig, LLMError, LLMResponse, Message, Usage};
pub use enhancer::GroqCommandEnhancer;
