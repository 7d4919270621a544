use serde::Deserialize;

/// Default model for the chat-completions backend. Overridable via config.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Fallback models tried in order when the default is unavailable.
pub const FALLBACK_MODELS: [&str; 2] = ["gpt-4o", "gpt-3.5-turbo-0125"];

/// Max completion tokens per synthesis request.
pub const SYNTHESIS_MAX_TOKENS: u32 = 4_000;

/// API usage information from the provider.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Merge two optional `Usage` values, summing their token counts.
pub(crate) fn merge_usage(primary: Option<Usage>, secondary: Option<Usage>) -> Option<Usage> {
    match (primary, secondary) {
        (Some(p), Some(s)) => Some(Usage {
            prompt_tokens: p.prompt_tokens + s.prompt_tokens,
            completion_tokens: p.completion_tokens + s.completion_tokens,
            total_tokens: p.total_tokens + s.total_tokens,
        }),
        (Some(p), None) => Some(p),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_usage_sums_token_counts() {
        let merged = merge_usage(
            Some(Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            }),
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        )
        .unwrap();
        assert_eq!(merged.prompt_tokens, 110);
        assert_eq!(merged.total_tokens, 165);
    }

    #[test]
    fn merge_usage_passes_through_single_side() {
        assert!(merge_usage(None, None).is_none());
        let merged = merge_usage(
            None,
            Some(Usage {
                prompt_tokens: 1,
                completion_tokens: 2,
                total_tokens: 3,
            }),
        )
        .unwrap();
        assert_eq!(merged.total_tokens, 3);
    }
}
