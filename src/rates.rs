//! # Rates Module
//!
//! Live per-minute rates and the rolling minute-window series behind the
//! overview sparklines.
//!
//! Rates divide by the nominal window length rather than elapsed history, so
//! a session younger than the window under-reports.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::buckets::BucketSet;
use crate::cost::cost_series;
use crate::models::UsageDetailRecord;
use crate::pricing::PriceTable;
use crate::series::{Metric, Series, build_series_by_model, sum_series};
use crate::utils::MINUTE_MS;

pub const DEFAULT_RATE_WINDOW_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerMinuteRates {
    pub rpm: f64,
    pub tpm: f64,
    pub window_minutes: u32,
    pub request_count: u64,
    pub token_count: u64,
}

fn effective_window(window_minutes: u32) -> u32 {
    if window_minutes == 0 {
        DEFAULT_RATE_WINDOW_MINUTES
    } else {
        window_minutes
    }
}

/// Requests and tokens per minute over the last `window_minutes` (0 means
/// the default of 30). Only records at or after `now - window` count.
pub fn calculate_recent_per_minute_rates(
    window_minutes: u32,
    records: &[UsageDetailRecord],
    now: DateTime<Local>,
) -> PerMinuteRates {
    let window = effective_window(window_minutes);
    let window_start = now.timestamp_millis() - window as i64 * MINUTE_MS;
    let mut request_count = 0u64;
    let mut token_count = 0u64;
    for record in records {
        match record.timestamp_ms() {
            Some(ts) if ts >= window_start => {
                request_count += 1;
                token_count = token_count.saturating_add(record.total_tokens());
            }
            _ => {}
        }
    }
    PerMinuteRates {
        rpm: request_count as f64 / window as f64,
        tpm: token_count as f64 / window as f64,
        window_minutes: window,
        request_count,
        token_count,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentWindowSeries {
    pub labels: Vec<String>,
    pub requests: Series,
    pub tokens: Series,
    pub cost: Series,
    pub has_prices: bool,
}

/// Minute-by-minute requests, tokens and cost for the rolling window.
pub fn build_recent_window_series(
    window_minutes: u32,
    records: &[UsageDetailRecord],
    prices: &PriceTable,
    now: DateTime<Local>,
) -> RecentWindowSeries {
    let buckets = BucketSet::minutes(now, effective_window(window_minutes));
    let len = buckets.len();
    let requests = build_series_by_model(records, &buckets, Metric::Requests);
    let tokens = build_series_by_model(records, &buckets, Metric::Tokens);
    let has_prices = !prices.is_empty();
    let cost = if has_prices {
        cost_series(records, &buckets, prices)
    } else {
        vec![0.0; len]
    };
    RecentWindowSeries {
        labels: buckets.labels(),
        requests: sum_series(requests.by_model.values(), len),
        tokens: sum_series(tokens.by_model.values(), len),
        cost,
        has_prices,
    }
}
