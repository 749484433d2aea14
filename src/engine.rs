//! # Engine Module
//!
//! [`AnalyticsEngine`] owns the price store, the chart line selection and
//! the detail records of the latest refresh. Renderers hold it by reference
//! and call the pure computations through it.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::buckets::{BucketSet, Period};
use crate::chart_lines::{ChartLineSelection, LineSelection, palette_color};
use crate::cost::{CostData, calculate_cost_data};
use crate::models::{UsageDetailRecord, UsagePayload};
use crate::normalize::{collect_details, model_names};
use crate::pricing::PriceStore;
use crate::rates::{
    PerMinuteRates, RecentWindowSeries, build_recent_window_series,
    calculate_recent_per_minute_rates,
};
use crate::series::{ChartData, Dataset, Metric, build_series_by_model};
use crate::stats::{GroupStats, UsageSummary, endpoint_stats, model_stats, summarize};

pub const ALL_MODELS_LABEL: &str = "All models";

pub struct AnalyticsEngine {
    prices: PriceStore,
    lines: ChartLineSelection,
    records: Vec<UsageDetailRecord>,
    models: Vec<String>,
    summary: UsageSummary,
}

impl AnalyticsEngine {
    pub fn new(prices: PriceStore, lines: ChartLineSelection) -> Self {
        AnalyticsEngine {
            prices,
            lines,
            records: Vec::new(),
            models: Vec::new(),
            summary: UsageSummary::default(),
        }
    }

    /// Replace the detail set with a fresh snapshot and re-validate the
    /// chart lines against the models it contains.
    pub fn ingest(&mut self, payload: &UsagePayload) {
        self.records = collect_details(payload);
        self.models = model_names(&self.records);
        self.summary = summarize(&self.records).with_reported_totals(payload);
        self.lines.normalize(&self.models);
    }

    pub fn ingest_value(&mut self, value: &Value) {
        self.ingest(&UsagePayload::from_response(value));
    }

    pub fn records(&self) -> &[UsageDetailRecord] {
        &self.records
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn prices(&self) -> &PriceStore {
        &self.prices
    }

    pub fn prices_mut(&mut self) -> &mut PriceStore {
        &mut self.prices
    }

    pub fn lines(&self) -> &ChartLineSelection {
        &self.lines
    }

    /// Edits made here are re-validated on the next [`ingest`](Self::ingest);
    /// call [`refresh_lines`](Self::refresh_lines) to fill new slots sooner.
    pub fn lines_mut(&mut self) -> &mut ChartLineSelection {
        &mut self.lines
    }

    pub fn refresh_lines(&mut self) {
        self.lines.normalize(&self.models);
    }

    /// One dataset per active chart line.
    pub fn build_chart_data_for_metric(
        &self,
        period: Period,
        metric: Metric,
        now: DateTime<Local>,
    ) -> ChartData {
        let buckets = BucketSet::for_period(period, now, &self.records);
        let series = build_series_by_model(&self.records, &buckets, metric);
        let datasets = self
            .lines
            .active()
            .map(|(idx, selection)| {
                let (label, data) = match selection {
                    LineSelection::Model(name) => (name.clone(), series.model(name)),
                    _ => (ALL_MODELS_LABEL.to_string(), series.all()),
                };
                Dataset {
                    key: selection.as_str().to_string(),
                    label,
                    data,
                    color: palette_color(idx),
                }
            })
            .collect();
        ChartData {
            labels: series.labels,
            datasets,
        }
    }

    pub fn calculate_cost_data(&self, period: Period, now: DateTime<Local>) -> CostData {
        calculate_cost_data(self.prices.prices(), &self.records, period, now)
    }

    pub fn calculate_recent_per_minute_rates(
        &self,
        window_minutes: u32,
        now: DateTime<Local>,
    ) -> PerMinuteRates {
        calculate_recent_per_minute_rates(window_minutes, &self.records, now)
    }

    pub fn build_recent_window_series(
        &self,
        window_minutes: u32,
        now: DateTime<Local>,
    ) -> RecentWindowSeries {
        build_recent_window_series(window_minutes, &self.records, self.prices.prices(), now)
    }

    pub fn summary(&self) -> &UsageSummary {
        &self.summary
    }

    pub fn endpoint_stats(&self) -> Vec<GroupStats> {
        endpoint_stats(&self.records, self.prices.prices())
    }

    pub fn model_stats(&self) -> Vec<GroupStats> {
        model_stats(&self.records, self.prices.prices())
    }
}
