//! Totals for the summary cards and the endpoint/model tables.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cost::detail_cost;
use crate::models::{UsageDetailRecord, UsagePayload};
use crate::pricing::PriceTable;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub reasoning_tokens: u64,
    pub cached_tokens: u64,
}

impl UsageSummary {
    fn add(&mut self, r: &UsageDetailRecord) {
        self.total_requests += 1;
        if r.failed {
            self.failure_count += 1;
        } else {
            self.success_count += 1;
        }
        self.total_tokens = self.total_tokens.saturating_add(r.total_tokens());
        self.input_tokens = self.input_tokens.saturating_add(r.tokens.input());
        self.output_tokens = self.output_tokens.saturating_add(r.tokens.output());
        self.reasoning_tokens = self
            .reasoning_tokens
            .saturating_add(r.tokens.reasoning_tokens.unwrap_or(0));
        self.cached_tokens = self
            .cached_tokens
            .saturating_add(r.tokens.cached_tokens.unwrap_or(0));
    }

    /// Take the server's request counters when it reports them; they also
    /// cover requests whose details were pruned. Token sub-totals stay
    /// detail-derived.
    pub fn with_reported_totals(mut self, payload: &UsagePayload) -> Self {
        if let Some(total) = payload.total_requests {
            let split = match (payload.success_count, payload.failure_count) {
                (Some(ok), Some(failed)) => Some((ok, failed)),
                (Some(ok), None) => Some((ok, total.saturating_sub(ok))),
                (None, Some(failed)) => Some((total.saturating_sub(failed), failed)),
                (None, None) => None,
            };
            if let Some((ok, failed)) = split {
                self.total_requests = total;
                self.success_count = ok;
                self.failure_count = failed;
            }
        }
        if let Some(tokens) = payload.total_tokens {
            self.total_tokens = tokens;
        }
        self
    }

    pub fn success_rate(&self) -> Option<f64> {
        (self.total_requests > 0)
            .then(|| self.success_count as f64 * 100.0 / self.total_requests as f64)
    }
}

pub fn summarize(records: &[UsageDetailRecord]) -> UsageSummary {
    let mut s = UsageSummary::default();
    for r in records {
        s.add(r);
    }
    s
}

/// One row of the endpoint or model table. `cost` is `None` when no record
/// in the group was priced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub tokens: u64,
    pub cost: Option<f64>,
}

fn group_by<F>(records: &[UsageDetailRecord], prices: &PriceTable, key: F) -> Vec<GroupStats>
where
    F: Fn(&UsageDetailRecord) -> &str,
{
    let mut groups: BTreeMap<&str, (UsageSummary, Option<f64>)> = BTreeMap::new();
    for r in records {
        let (summary, cost) = groups.entry(key(r)).or_default();
        summary.add(r);
        if let Some(c) = detail_cost(r, prices) {
            *cost = Some(cost.unwrap_or(0.0) + c);
        }
    }
    let mut rows: Vec<GroupStats> = groups
        .into_iter()
        .map(|(name, (s, cost))| GroupStats {
            name: name.to_string(),
            requests: s.total_requests,
            success_count: s.success_count,
            failure_count: s.failure_count,
            tokens: s.total_tokens,
            cost,
        })
        .collect();
    rows.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Per-endpoint totals, busiest first.
pub fn endpoint_stats(records: &[UsageDetailRecord], prices: &PriceTable) -> Vec<GroupStats> {
    group_by(records, prices, |r| r.endpoint.as_str())
}

/// Per-model totals, busiest first.
pub fn model_stats(records: &[UsageDetailRecord], prices: &PriceTable) -> Vec<GroupStats> {
    group_by(records, prices, |r| r.model_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenBreakdown;
    use crate::pricing::ModelPrice;

    fn record(endpoint: &str, model: &str, input: u64, failed: bool) -> UsageDetailRecord {
        UsageDetailRecord {
            timestamp: "2025-10-18T10:00:00Z".to_string(),
            model_name: model.to_string(),
            endpoint: endpoint.to_string(),
            tokens: TokenBreakdown {
                input_tokens: Some(input),
                output_tokens: Some(0),
                reasoning_tokens: Some(2),
                ..Default::default()
            },
            source: String::new(),
            failed,
        }
    }

    #[test]
    fn summary_counts_success_and_failure() {
        let s = summarize(&[record("e", "a", 10, false), record("e", "a", 5, true)]);
        assert_eq!(s.total_requests, 2);
        assert_eq!(s.success_count, 1);
        assert_eq!(s.failure_count, 1);
        assert_eq!(s.total_tokens, 19);
        assert_eq!(s.reasoning_tokens, 4);
        assert_eq!(s.success_rate(), Some(50.0));
        assert_eq!(summarize(&[]).success_rate(), None);
    }

    #[test]
    fn reported_totals_cover_pruned_details() {
        let local = summarize(&[record("e", "a", 10, false), record("e", "a", 5, true)]);
        let payload = UsagePayload {
            total_requests: Some(10),
            failure_count: Some(3),
            total_tokens: Some(500),
            ..Default::default()
        };
        let s = local.clone().with_reported_totals(&payload);
        assert_eq!((s.total_requests, s.success_count, s.failure_count), (10, 7, 3));
        assert_eq!(s.total_tokens, 500);
        assert_eq!(s.reasoning_tokens, 4);

        // a bare total without a success/failure split is ignored
        let partial = UsagePayload {
            total_requests: Some(10),
            ..Default::default()
        };
        assert_eq!(local.clone().with_reported_totals(&partial), local);
    }

    #[test]
    fn endpoint_cost_is_none_when_unpriced() {
        let mut prices = PriceTable::new();
        prices.insert("a".into(), ModelPrice { prompt: 1.0, completion: 0.0 });
        let records = vec![
            record("/chat", "a", 1_000_000, false),
            record("/chat", "b", 1_000_000, false),
            record("/msg", "b", 1, false),
        ];
        let rows = endpoint_stats(&records, &prices);
        assert_eq!(rows[0].name, "/chat");
        assert_eq!(rows[0].requests, 2);
        assert!((rows[0].cost.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(rows[1].cost, None);

        let models = model_stats(&records, &prices);
        assert_eq!(models[0].name, "b");
        assert_eq!(models[0].cost, None);
    }
}
