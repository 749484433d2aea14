//! # Buckets Module
//!
//! Fixed time slots that detail records are grouped into for charting.
//!
//! - `hour`: 24 contiguous one-hour slots, the last one holding the current
//!   local hour. Quiet hours stay in the set as zeros.
//! - `day`: one slot per local calendar day observed in the data, ascending.
//!   Days without activity are absent; a day range is unbounded so it is
//!   never zero-filled.
//! - minute window: `min(window, 720)` contiguous one-minute slots ending at
//!   "now", used by the rolling overview and sparklines.

use chrono::{DateTime, Local, Timelike};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::UsageDetailRecord;
use crate::utils::{DAY_MS, HOUR_MS, MINUTE_MS, local_day_label, local_day_start_ms, local_from_ms};

pub const HOURLY_BUCKET_COUNT: usize = 24;
pub const MAX_WINDOW_MINUTES: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour => "hour",
            Period::Day => "day",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub start_ms: i64,
    pub size_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    /// Equal-width slots from `start_ms`; timestamps past `last_ms` are dropped.
    Contiguous {
        start_ms: i64,
        last_ms: i64,
        width_ms: i64,
    },
    /// One slot per local calendar day, looked up by label.
    Calendar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSet {
    buckets: Vec<Bucket>,
    layout: Layout,
}

fn hour_label(ms: i64) -> String {
    local_from_ms(ms)
        .map(|dt| dt.format("%m-%d %H:00").to_string())
        .unwrap_or_default()
}

fn minute_label(ms: i64) -> String {
    local_from_ms(ms)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn contiguous(start_ms: i64, last_ms: i64, width_ms: i64, count: usize, label: fn(i64) -> String) -> BucketSet {
    let buckets = (0..count)
        .map(|i| {
            let start = start_ms + i as i64 * width_ms;
            Bucket {
                label: label(start),
                start_ms: start,
                size_ms: width_ms,
            }
        })
        .collect();
    BucketSet {
        buckets,
        layout: Layout::Contiguous {
            start_ms,
            last_ms,
            width_ms,
        },
    }
}

impl BucketSet {
    /// 24 hourly slots ending with the hour that contains `now`.
    pub fn hourly(now: DateTime<Local>) -> Self {
        let current_hour = now
            .with_minute(0)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(now)
            .timestamp_millis();
        let earliest = current_hour - (HOURLY_BUCKET_COUNT as i64 - 1) * HOUR_MS;
        contiguous(
            earliest,
            current_hour + HOUR_MS - 1,
            HOUR_MS,
            HOURLY_BUCKET_COUNT,
            hour_label,
        )
    }

    /// One slot per distinct local day among records with a valid timestamp.
    pub fn daily(records: &[UsageDetailRecord]) -> Self {
        let labels: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.timestamp_ms())
            .filter_map(local_day_label)
            .collect();
        let buckets = labels
            .into_iter()
            .map(|label| Bucket {
                start_ms: local_day_start_ms(&label).unwrap_or_default(),
                size_ms: DAY_MS,
                label,
            })
            .collect();
        BucketSet {
            buckets,
            layout: Layout::Calendar,
        }
    }

    /// `min(window_minutes, 720)` one-minute slots covering `[now - window, now]`.
    /// A zero window is treated as one minute.
    pub fn minutes(now: DateTime<Local>, window_minutes: u32) -> Self {
        let count = window_minutes.clamp(1, MAX_WINDOW_MINUTES) as usize;
        let now_ms = now.timestamp_millis();
        let start = now_ms - count as i64 * MINUTE_MS;
        contiguous(start, now_ms, MINUTE_MS, count, minute_label)
    }

    pub fn for_period(period: Period, now: DateTime<Local>, records: &[UsageDetailRecord]) -> Self {
        match period {
            Period::Hour => Self::hourly(now),
            Period::Day => Self::daily(records),
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Slot index for a timestamp, or `None` when it falls outside the set.
    pub fn index_of(&self, ts_ms: i64) -> Option<usize> {
        if self.buckets.is_empty() {
            return None;
        }
        match &self.layout {
            Layout::Contiguous {
                start_ms,
                last_ms,
                width_ms,
            } => {
                if ts_ms < *start_ms || ts_ms > *last_ms {
                    return None;
                }
                let idx = ((ts_ms - start_ms) / width_ms) as usize;
                Some(idx.min(self.buckets.len() - 1))
            }
            Layout::Calendar => {
                let label = local_day_label(ts_ms)?;
                self.buckets
                    .binary_search_by(|b| b.label.as_str().cmp(label.as_str()))
                    .ok()
            }
        }
    }

    pub fn index_of_record(&self, record: &UsageDetailRecord) -> Option<usize> {
        self.index_of(record.timestamp_ms()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn hourly_always_has_24_slots_ending_at_current_hour() {
        let now = Local::now();
        let set = BucketSet::hourly(now);
        assert_eq!(set.len(), HOURLY_BUCKET_COUNT);
        let last = set.buckets().last().unwrap();
        assert!(last.start_ms <= now.timestamp_millis());
        assert!(now.timestamp_millis() < last.start_ms + HOUR_MS);
        assert_eq!(set.index_of(now.timestamp_millis()), Some(23));
    }

    #[test]
    fn hourly_drops_out_of_range_timestamps() {
        let now = Local::now();
        let set = BucketSet::hourly(now);
        let first = set.buckets()[0].start_ms;
        assert_eq!(set.index_of(first), Some(0));
        assert_eq!(set.index_of(first - 1), None);
        assert_eq!(set.index_of((now + TimeDelta::hours(2)).timestamp_millis()), None);
    }

    #[test]
    fn minute_window_is_capped() {
        let now = Local::now();
        assert_eq!(BucketSet::minutes(now, 30).len(), 30);
        assert_eq!(BucketSet::minutes(now, 5000).len(), 720);
        assert_eq!(BucketSet::minutes(now, 0).len(), 1);
    }

    #[test]
    fn minute_window_includes_now_in_last_slot() {
        let now = Local::now();
        let set = BucketSet::minutes(now, 30);
        assert_eq!(set.index_of(now.timestamp_millis()), Some(29));
        assert_eq!(
            set.index_of((now - TimeDelta::minutes(30)).timestamp_millis()),
            Some(0)
        );
        assert_eq!(
            set.index_of((now - TimeDelta::minutes(31)).timestamp_millis()),
            None
        );
    }

    #[test]
    fn empty_daily_set_has_no_slots() {
        let set = BucketSet::daily(&[]);
        assert!(set.is_empty());
        assert_eq!(set.index_of(0), None);
    }
}
