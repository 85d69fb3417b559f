//! Model pricing registry.
//!
//! Centralized pricing data for the models the pipeline defaults to.
//! Costs are in nanodollars (1e-9 USD) per token.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Pricing information for a model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Provider name.
    pub provider: &'static str,
    /// Cost per input token in nanodollars.
    pub input_nanos_per_token: i64,
    /// Cost per output token in nanodollars.
    pub output_nanos_per_token: i64,
}

impl ModelPricing {
    const fn new(provider: &'static str, input: i64, output: i64) -> Self {
        Self {
            provider,
            input_nanos_per_token: input,
            output_nanos_per_token: output,
        }
    }

    /// Calculate cost for a request.
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> i64 {
        (input_tokens as i64) * self.input_nanos_per_token
            + (output_tokens as i64) * self.output_nanos_per_token
    }
}

// =============================================================================
// PRICING DATA
// =============================================================================

// OpenAI (verify periodically against the OpenAI pricing page)
// GPT-3.5 Turbo: $0.50/1M input, $1.50/1M output
// GPT-4 Turbo: $10.00/1M input, $30.00/1M output
// GPT-4o-mini: $0.15/1M input, $0.60/1M output

const GPT_35_TURBO: ModelPricing = ModelPricing::new("openai", 500, 1_500);
const GPT_4_TURBO: ModelPricing = ModelPricing::new("openai", 10_000, 30_000);
const GPT_4O_MINI: ModelPricing = ModelPricing::new("openai", 150, 600);

// Anthropic
// Claude 3 Haiku: $0.25/1M input, $1.25/1M output
// Claude 3.5 Haiku: $0.80/1M input, $4.00/1M output
// Claude 3 Sonnet: $3.00/1M input, $15.00/1M output
// Claude 3 Opus: $15.00/1M input, $75.00/1M output

const CLAUDE_3_HAIKU: ModelPricing = ModelPricing::new("anthropic", 250, 1_250);
const CLAUDE_35_HAIKU: ModelPricing = ModelPricing::new("anthropic", 800, 4_000);
const CLAUDE_3_SONNET: ModelPricing = ModelPricing::new("anthropic", 3_000, 15_000);
const CLAUDE_3_OPUS: ModelPricing = ModelPricing::new("anthropic", 15_000, 75_000);

static PRICING_MAP: OnceLock<HashMap<&'static str, ModelPricing>> = OnceLock::new();

fn init_pricing() -> HashMap<&'static str, ModelPricing> {
    let mut map = HashMap::new();

    // OpenAI models
    map.insert("gpt-3.5-turbo", GPT_35_TURBO);
    map.insert("gpt-3.5-turbo-0125", GPT_35_TURBO);
    map.insert("gpt-4-turbo", GPT_4_TURBO);
    map.insert("gpt-4o-mini", GPT_4O_MINI);

    // Anthropic models
    map.insert("claude-3-haiku-20240307", CLAUDE_3_HAIKU);
    map.insert("claude-3-5-haiku-20241022", CLAUDE_35_HAIKU);
    map.insert("claude-3-sonnet-20240229", CLAUDE_3_SONNET);
    map.insert("claude-3-opus-20240229", CLAUDE_3_OPUS);

    map
}

/// Get pricing for a model.
///
/// Fine-tuned OpenAI models ("ft:base:org:name:id") are priced as their base
/// model; fine-tune surcharges are not tracked here.
pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    let map = PRICING_MAP.get_or_init(init_pricing);
    if let Some(p) = map.get(model_id) {
        return Some(*p);
    }
    if let Some(rest) = model_id.strip_prefix("ft:") {
        let base = rest.split(':').next().unwrap_or(rest);
        return map.get(base).copied();
    }
    None
}

/// Calculate chat cost.
pub fn chat_cost(model: &str, input_tokens: u32, output_tokens: u32) -> i64 {
    // Default to a mid-range model if unknown
    let default = ModelPricing::new("unknown", 1_000, 5_000);
    let pricing = get_pricing(model).unwrap_or(default);
    pricing.calculate_cost(input_tokens, output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_cost() {
        // 1K input + 1K output for Claude 3 Haiku
        // Input: 1000 * 250 = 250,000 nanos
        // Output: 1000 * 1250 = 1,250,000 nanos
        let cost = chat_cost("claude-3-haiku-20240307", 1_000, 1_000);
        assert_eq!(cost, 1_500_000);
    }

    #[test]
    fn test_fine_tune_priced_as_base() {
        let ft = get_pricing("ft:gpt-3.5-turbo-0125:acme:idea-generator:abc123").unwrap();
        let base = get_pricing("gpt-3.5-turbo-0125").unwrap();
        assert_eq!(ft.input_nanos_per_token, base.input_nanos_per_token);
        assert_eq!(ft.output_nanos_per_token, base.output_nanos_per_token);
    }

    #[test]
    fn test_unknown_model_uses_default() {
        let cost = chat_cost("mystery-model", 1_000, 1_000);
        assert_eq!(cost, 6_000_000);
    }
}
