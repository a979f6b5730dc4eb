// System prompts for command enhancement

use crate::intent::EnhancementContext;

pub struct SystemPrompts;

impl SystemPrompts {
    /// JSON-only intent classifier for shopping commands
    pub fn command_enhancer() -> &'static str {
        "You classify spoken shopping commands for a local farmers' marketplace.
Reply with ONE JSON object and nothing else.

FORMAT:
{
  \"intent\": one of \"search_product\", \"add_to_cart\", \"show_deals\", \"show_cart\", \"checkout\", \"browse_vendor\", \"greeting\", \"ask_about\", \"unknown\",
  \"entities\": {
    \"product\": string or null,
    \"vendor\": string or null,
    \"quantity\": integer or null,
    \"priceRange\": {\"min\": number or null, \"max\": number or null} or null,
    \"category\": string or null
  },
  \"confidence\": number between 0 and 1,
  \"enhancedQuery\": cleaned-up product search text or null,
  \"suggestedResponse\": short spoken reply or null
}

RULES:
- \"add it\", \"I'll take that\" and similar refer to the product the shopper is looking at
- Prices are in shekels
- Use \"unknown\" with low confidence when the command is not about shopping
- Keep suggestedResponse to one short sentence suitable for speech
"
    }
}

pub struct ConversationTemplates;

impl ConversationTemplates {
    /// User message carrying the transcript and the shopping context
    pub fn enhancement_request(transcript: &str, context: &EnhancementContext) -> String {
        let product = context
            .current_product_name
            .as_deref()
            .unwrap_or("nothing selected");
        let cart = if context.cart.is_empty() {
            "empty".to_string()
        } else {
            context
                .cart
                .iter()
                .map(|line| format!("{} x{}", line.name, line.quantity))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Command: \"{}\"\nCurrent product: {}\nCart: {}",
            transcript.trim(),
            product,
            cart
        )
    }
}
