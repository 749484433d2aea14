//! # Series Module
//!
//! Routes detail records into a [`BucketSet`] per model name, accumulating
//! either request counts or token counts. The "all models" series is never
//! stored; it is the element-wise sum of the per-model series.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::buckets::{BucketSet, Period};
use crate::models::UsageDetailRecord;

pub type Series = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Requests,
    Tokens,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Requests => "requests",
            Metric::Tokens => "tokens",
        }
    }

    /// Contribution of one record under this metric.
    pub fn value_of(&self, record: &UsageDetailRecord) -> f64 {
        match self {
            Metric::Requests => 1.0,
            Metric::Tokens => record.total_tokens() as f64,
        }
    }
}

/// One plotted line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub key: String,
    pub label: String,
    pub data: Series,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSeries {
    pub labels: Vec<String>,
    pub by_model: BTreeMap<String, Series>,
}

impl ModelSeries {
    /// Element-wise sum across every stored model.
    pub fn all(&self) -> Series {
        sum_series(self.by_model.values(), self.labels.len())
    }

    /// Series for a model name; models without activity read as zeros.
    pub fn model(&self, name: &str) -> Series {
        self.by_model
            .get(name)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.labels.len()])
    }
}

pub fn sum_series<'a, I>(series: I, len: usize) -> Series
where
    I: IntoIterator<Item = &'a Series>,
{
    let mut total = vec![0.0; len];
    for s in series {
        for (slot, v) in total.iter_mut().zip(s.iter()) {
            *slot += v;
        }
    }
    total
}

pub fn build_series_by_model(
    records: &[UsageDetailRecord],
    buckets: &BucketSet,
    metric: Metric,
) -> ModelSeries {
    let len = buckets.len();
    let mut by_model: BTreeMap<String, Series> = BTreeMap::new();
    for record in records {
        let Some(idx) = buckets.index_of_record(record) else {
            continue;
        };
        let values = by_model
            .entry(record.model_name.clone())
            .or_insert_with(|| vec![0.0; len]);
        values[idx] += metric.value_of(record);
    }
    ModelSeries {
        labels: buckets.labels(),
        by_model,
    }
}

pub fn build_series_for_period(
    records: &[UsageDetailRecord],
    period: Period,
    metric: Metric,
    now: DateTime<Local>,
) -> ModelSeries {
    let buckets = BucketSet::for_period(period, now, records);
    build_series_by_model(records, &buckets, metric)
}
