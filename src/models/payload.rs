//! Typed view of the `GET /usage` management response.
//!
//! The REST collaborator hands back loosely shaped JSON: any level may be
//! missing and numeric fields are occasionally strings or `null`. Decoding
//! goes through `serde_json::Value` so a wrong-typed field degrades to
//! `None`/empty instead of rejecting the whole payload.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level counters are the server's own; per-endpoint and per-model
/// counters are recomputed from the details and not decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsagePayload {
    pub total_requests: Option<u64>,
    pub success_count: Option<u64>,
    pub failure_count: Option<u64>,
    pub total_tokens: Option<u64>,
    pub apis: BTreeMap<String, ApiUsage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiUsage {
    pub models: BTreeMap<String, ModelUsage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelUsage {
    pub details: Vec<RawDetail>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetail {
    pub timestamp: Option<String>,
    pub source: Option<String>,
    pub failed: Option<bool>,
    pub tokens: RawTokens,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawTokens {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
    pub cached_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Non-negative integer from a JSON number; fractional values are truncated.
fn lenient_u64(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn object(v: Option<&Value>) -> Option<&Map<String, Value>> {
    v.and_then(|v| v.as_object())
}

impl UsagePayload {
    /// Decode either the wrapped response (`{"usage": {...}}`) or the bare
    /// usage object.
    pub fn from_response(value: &Value) -> Self {
        match value.get("usage") {
            Some(inner) if inner.is_object() => Self::from_value(inner),
            _ => Self::from_value(value),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let apis = object(value.get("apis"))
            .map(|m| {
                m.iter()
                    .map(|(endpoint, api)| (endpoint.clone(), ApiUsage::from_value(api)))
                    .collect()
            })
            .unwrap_or_default();
        UsagePayload {
            total_requests: lenient_u64(value.get("total_requests")),
            success_count: lenient_u64(value.get("success_count")),
            failure_count: lenient_u64(value.get("failure_count")),
            total_tokens: lenient_u64(value.get("total_tokens")),
            apis,
        }
    }
}

impl ApiUsage {
    pub fn from_value(value: &Value) -> Self {
        let models = object(value.get("models"))
            .map(|m| {
                m.iter()
                    .map(|(name, model)| (name.clone(), ModelUsage::from_value(model)))
                    .collect()
            })
            .unwrap_or_default();
        ApiUsage { models }
    }
}

impl ModelUsage {
    pub fn from_value(value: &Value) -> Self {
        let details = value
            .get("details")
            .and_then(|d| d.as_array())
            .map(|arr| {
                arr.iter()
                    .filter(|d| d.is_object())
                    .map(RawDetail::from_value)
                    .collect()
            })
            .unwrap_or_default();
        ModelUsage { details }
    }
}

impl RawDetail {
    pub fn from_value(value: &Value) -> Self {
        RawDetail {
            timestamp: value
                .get("timestamp")
                .and_then(|t| t.as_str())
                .map(str::to_owned),
            source: value
                .get("source")
                .and_then(|s| s.as_str())
                .map(str::to_owned),
            failed: value.get("failed").and_then(|f| f.as_bool()),
            tokens: value.get("tokens").map(RawTokens::from_value).unwrap_or_default(),
        }
    }
}

impl RawTokens {
    pub fn from_value(value: &Value) -> Self {
        RawTokens {
            input_tokens: lenient_u64(value.get("input_tokens")),
            output_tokens: lenient_u64(value.get("output_tokens")),
            reasoning_tokens: lenient_u64(value.get("reasoning_tokens")),
            cached_tokens: lenient_u64(value.get("cached_tokens")),
            total_tokens: lenient_u64(value.get("total_tokens")),
        }
    }
}

impl<'de> Deserialize<'de> for UsagePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(UsagePayload::from_response(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_and_bare_payloads_decode_the_same() {
        let bare = json!({"apis": {"/v1/chat": {"models": {"m": {"details": [{}]}}}}});
        let wrapped = json!({ "usage": bare.clone() });
        assert_eq!(
            UsagePayload::from_response(&bare),
            UsagePayload::from_response(&wrapped)
        );
    }

    #[test]
    fn wrong_typed_fields_degrade_to_empty() {
        let v = json!({
            "total_requests": "many",
            "apis": {
                "a": {"models": []},
                "b": {"models": {"m": {"details": "nope"}}},
                "c": {"models": {"m": {"details": [1, {"timestamp": 5, "tokens": {"input_tokens": -3, "output_tokens": 7.9}}]}}}
            }
        });
        let p: UsagePayload = serde_json::from_value(v).unwrap();
        assert_eq!(p.total_requests, None);
        assert!(p.apis["a"].models.is_empty());
        assert!(p.apis["b"].models["m"].details.is_empty());
        let details = &p.apis["c"].models["m"].details;
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].timestamp, None);
        assert_eq!(details[0].tokens.input_tokens, None);
        assert_eq!(details[0].tokens.output_tokens, Some(7));
    }

    #[test]
    fn non_object_root_is_empty() {
        assert_eq!(UsagePayload::from_response(&json!(null)), UsagePayload::default());
        assert_eq!(UsagePayload::from_response(&json!([1, 2])), UsagePayload::default());
    }
}
