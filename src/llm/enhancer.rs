use super::client::{GroqLLM, LLMError};
use super::prompts::{ConversationTemplates, SystemPrompts};
use crate::intent::{CommandEnhancer, EnhancementContext, EnhancementError, IntentResolution};
use async_trait::async_trait;

impl From<LLMError> for EnhancementError {
    fn from(error: LLMError) -> Self {
        match error {
            LLMError::Request(e) => EnhancementError::Request(e),
            LLMError::ApiError { status, message } => EnhancementError::ApiError { status, message },
            LLMError::ParseError(message) => EnhancementError::ParseError(message),
            LLMError::Config(message) => EnhancementError::LLM(message),
        }
    }
}

/// Enhancer that asks a Groq-hosted model to classify the command
pub struct GroqCommandEnhancer {
    llm: GroqLLM,
}

impl GroqCommandEnhancer {
    pub fn new(llm: GroqLLM) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CommandEnhancer for GroqCommandEnhancer {
    async fn enhance_command(
        &self,
        transcript: &str,
        context: &EnhancementContext,
    ) -> Result<IntentResolution, EnhancementError> {
        let user_prompt = ConversationTemplates::enhancement_request(transcript, context);
        let content = self
            .llm
            .ask_with_system(SystemPrompts::command_enhancer(), &user_prompt)
            .await?;
        log::debug!("🧠 Raw enhancement: {}", content);
        parse_model_output(&content)
    }
}

/// Models sometimes wrap JSON in code fences or chatter; take the outermost object
pub fn parse_model_output(content: &str) -> Result<IntentResolution, EnhancementError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(EnhancementError::ParseError(format!(
                "No JSON object in model output: {}",
                content
            )))
        }
    };

    let mut resolution: IntentResolution =
        serde_json::from_str(json).map_err(|e| EnhancementError::ParseError(e.to_string()))?;
    resolution.confidence = resolution.confidence.clamp(0.0, 1.0);
    Ok(resolution)
}
