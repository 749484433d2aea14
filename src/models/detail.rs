use serde::Serialize;

use crate::models::payload::RawTokens;
use crate::utils::{mask_source, parse_timestamp_ms};

/// Model name attached to details whose model key was empty.
pub const UNKNOWN_MODEL: &str = "unknown";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TokenBreakdown {
    /// Explicit `total_tokens` wins; otherwise the four sub-fields are summed.
    pub fn total(&self) -> u64 {
        if let Some(t) = self.total_tokens {
            return t;
        }
        [
            self.input_tokens,
            self.output_tokens,
            self.reasoning_tokens,
            self.cached_tokens,
        ]
        .iter()
        .map(|v| v.unwrap_or(0))
        .fold(0u64, u64::saturating_add)
    }

    pub fn input(&self) -> u64 {
        self.input_tokens.unwrap_or(0)
    }

    pub fn output(&self) -> u64 {
        self.output_tokens.unwrap_or(0)
    }
}

impl From<RawTokens> for TokenBreakdown {
    fn from(raw: RawTokens) -> Self {
        TokenBreakdown {
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            reasoning_tokens: raw.reasoning_tokens,
            cached_tokens: raw.cached_tokens,
            total_tokens: raw.total_tokens,
        }
    }
}

/// One observed request, flattened out of the endpoint/model nesting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsageDetailRecord {
    pub timestamp: String,
    pub model_name: String,
    pub endpoint: String,
    pub tokens: TokenBreakdown,
    pub source: String,
    pub failed: bool,
}

impl UsageDetailRecord {
    /// Milliseconds since the epoch, or `None` when the timestamp does not parse.
    pub fn timestamp_ms(&self) -> Option<i64> {
        parse_timestamp_ms(&self.timestamp)
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens.total()
    }

    pub fn masked_source(&self) -> String {
        mask_source(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_total_wins_over_breakdown() {
        let t = TokenBreakdown {
            input_tokens: Some(10),
            output_tokens: Some(20),
            total_tokens: Some(7),
            ..Default::default()
        };
        assert_eq!(t.total(), 7);
    }

    #[test]
    fn partial_breakdown_is_summed() {
        let t = TokenBreakdown {
            input_tokens: Some(10),
            reasoning_tokens: Some(5),
            cached_tokens: Some(1),
            ..Default::default()
        };
        assert_eq!(t.total(), 16);
        assert_eq!(TokenBreakdown::default().total(), 0);
    }
}
