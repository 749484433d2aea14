//! # Normalize Module
//!
//! Flattens the `apis → models → details[]` usage payload into one list of
//! [`UsageDetailRecord`]s, each tagged with its owning endpoint and model.
//!
//! Records with unparsable timestamps are kept here. Time-bucketed consumers
//! validate the timestamp themselves and skip such records.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use crate::models::{UNKNOWN_MODEL, UsageDetailRecord, UsagePayload};

pub fn collect_details(payload: &UsagePayload) -> Vec<UsageDetailRecord> {
    let mut out = Vec::new();
    let mut untimed = 0usize;
    for (endpoint, api) in &payload.apis {
        for (model, usage) in &api.models {
            let model_name = if model.trim().is_empty() {
                UNKNOWN_MODEL.to_string()
            } else {
                model.clone()
            };
            for raw in &usage.details {
                let record = UsageDetailRecord {
                    timestamp: raw.timestamp.clone().unwrap_or_default(),
                    model_name: model_name.clone(),
                    endpoint: endpoint.clone(),
                    tokens: raw.tokens.into(),
                    source: raw.source.clone().unwrap_or_default(),
                    failed: raw.failed.unwrap_or(false),
                };
                if record.timestamp_ms().is_none() {
                    untimed += 1;
                }
                out.push(record);
            }
        }
    }
    if untimed > 0 {
        debug!(
            untimed,
            total = out.len(),
            "usage details without a parseable timestamp"
        );
    }
    out
}

/// Normalize straight from the REST response body.
pub fn collect_details_from_value(value: &Value) -> Vec<UsageDetailRecord> {
    collect_details(&UsagePayload::from_response(value))
}

/// Distinct model names present in `records`, sorted ascending.
pub fn model_names(records: &[UsageDetailRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.model_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_and_tags_model_names() {
        let v = json!({"usage": {"apis": {
            "/v1/chat/completions": {"models": {
                "gpt-4o": {"details": [
                    {"timestamp": "2025-10-18T10:00:00Z", "source": "sk-1234567890", "failed": false,
                     "tokens": {"input_tokens": 10, "output_tokens": 5}},
                    {"timestamp": "2025-10-18T10:05:00Z", "failed": true}
                ]},
                "": {"details": [{"timestamp": "bad"}]}
            }},
            "/v1/messages": {"models": {"claude": {"details": [{"timestamp": "2025-10-18T11:00:00Z"}]}}}
        }}});
        let records = collect_details_from_value(&v);
        assert_eq!(records.len(), 4);
        let gpt: Vec<_> = records.iter().filter(|r| r.model_name == "gpt-4o").collect();
        assert_eq!(gpt.len(), 2);
        assert_eq!(gpt[0].endpoint, "/v1/chat/completions");
        assert_eq!(gpt[0].tokens.total(), 15);
        assert!(gpt[1].failed);
        assert_eq!(gpt[1].source, "");

        // untimed record is retained under the unknown sentinel
        let unknown = records.iter().find(|r| r.model_name == UNKNOWN_MODEL).unwrap();
        assert_eq!(unknown.timestamp_ms(), None);
    }

    #[test]
    fn absent_branches_yield_nothing() {
        assert!(collect_details_from_value(&json!({})).is_empty());
        assert!(collect_details_from_value(&json!({"usage": {"apis": null}})).is_empty());
        assert!(collect_details_from_value(&json!({"apis": {"x": {}}})).is_empty());
    }

    #[test]
    fn model_names_are_distinct_and_sorted() {
        let v = json!({"apis": {
            "a": {"models": {"zeta": {"details": [{}]}, "alpha": {"details": [{}, {}]}}},
            "b": {"models": {"alpha": {"details": [{}]}}}
        }});
        let names = model_names(&collect_details_from_value(&v));
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
