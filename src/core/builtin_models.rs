//! Built-in model catalog
//!
//! The client targets a single OpenAI-compatible provider, so the model set
//! ships with the binary instead of being fetched. The hybrid-reasoning list
//! is an allow-list for the `enable_thinking` request field; sending that
//! field to any other model is rejected by the API.

/// Endpoint used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "SILICONFLOW_API_KEY";

/// Environment variable overriding the endpoint base URL.
pub const BASE_URL_ENV: &str = "SILICONFLOW_BASE_URL";

/// Model used when the user has not picked one.
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-ai/DeepSeek-V3.1";

/// Model every request is routed to while the latest turn carries an image.
pub const VISION_MODEL: &str = "zai-org/GLM-4.5V";

/// Model used for conversation title generation.
pub const TITLE_MODEL: &str = "deepseek-ai/DeepSeek-V3.1";

/// Models selectable for ordinary chat.
pub const CHAT_MODELS: [&str; 4] = [
    "deepseek-ai/DeepSeek-V3.1",
    "Qwen/Qwen3-235B-A22B-Thinking-2507",
    "zai-org/GLM-4.5",
    "Pro/deepseek-ai/DeepSeek-V3.1",
];

const HYBRID_REASONING_MODELS: [&str; 3] = [
    "deepseek-ai/DeepSeek-V3.1",
    "Pro/deepseek-ai/DeepSeek-V3.1",
    "zai-org/GLM-4.5V",
];

/// Whether `model` accepts the `enable_thinking` switch.
pub fn is_hybrid_reasoning_model(model: &str) -> bool {
    HYBRID_REASONING_MODELS.contains(&model)
}

/// Whether `model` is one of the selectable chat models.
pub fn is_chat_model(model: &str) -> bool {
    CHAT_MODELS.contains(&model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_selectable_and_hybrid() {
        assert!(is_chat_model(DEFAULT_CHAT_MODEL));
        assert!(is_hybrid_reasoning_model(DEFAULT_CHAT_MODEL));
    }

    #[test]
    fn vision_model_is_hybrid_but_not_selectable() {
        assert!(is_hybrid_reasoning_model(VISION_MODEL));
        assert!(!is_chat_model(VISION_MODEL));
    }

    #[test]
    fn thinking_only_models_are_not_hybrid() {
        assert!(is_chat_model("Qwen/Qwen3-235B-A22B-Thinking-2507"));
        assert!(!is_hybrid_reasoning_model(
            "Qwen/Qwen3-235B-A22B-Thinking-2507"
        ));
        assert!(!is_hybrid_reasoning_model("zai-org/GLM-4.5"));
    }

    #[test]
    fn unknown_model_matches_nothing() {
        assert!(!is_chat_model("acme/unknown"));
        assert!(!is_hybrid_reasoning_model("acme/unknown"));
    }
}
