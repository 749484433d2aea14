//! # Cost Module
//!
//! Joins detail records with the price table.
//!
//! A detail whose model has no price entry contributes nothing and is left
//! out of cost series entirely. `has_prices` travels with every result so a
//! renderer can tell "$0 because free" from "-- because unpriced". Values are
//! only rounded when formatted.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::buckets::{BucketSet, Period};
use crate::chart_lines::palette_color;
use crate::models::UsageDetailRecord;
use crate::pricing::PriceTable;
use crate::series::{Dataset, Series};

/// Cost of one detail, or `None` when its model is unpriced.
pub fn detail_cost(record: &UsageDetailRecord, prices: &PriceTable) -> Option<f64> {
    let price = prices.get(&record.model_name)?;
    Some(price.cost(record.tokens.input(), record.tokens.output()))
}

/// Whole-population cost, independent of timestamps.
pub fn total_cost(records: &[UsageDetailRecord], prices: &PriceTable) -> f64 {
    records.iter().filter_map(|r| detail_cost(r, prices)).sum()
}

/// Per-bucket cost sums.
pub fn cost_series(records: &[UsageDetailRecord], buckets: &BucketSet, prices: &PriceTable) -> Series {
    let mut series = vec![0.0; buckets.len()];
    for record in records {
        let Some(cost) = detail_cost(record, prices) else {
            continue;
        };
        if let Some(idx) = buckets.index_of_record(record) {
            series[idx] += cost;
        }
    }
    series
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostData {
    pub total_cost: f64,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub has_prices: bool,
}

pub fn calculate_cost_data(
    prices: &PriceTable,
    records: &[UsageDetailRecord],
    period: Period,
    now: DateTime<Local>,
) -> CostData {
    let buckets = BucketSet::for_period(period, now, records);
    // a day chart with no activity has no buckets and so no dataset
    let datasets = if buckets.is_empty() {
        Vec::new()
    } else {
        vec![Dataset {
            key: "cost".to_string(),
            label: "Cost".to_string(),
            data: cost_series(records, &buckets, prices),
            color: palette_color(0),
        }]
    };
    CostData {
        total_cost: total_cost(records, prices),
        labels: buckets.labels(),
        datasets,
        has_prices: !prices.is_empty(),
    }
}
