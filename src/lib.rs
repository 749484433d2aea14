//! # Proxy Usage Stats
//!
//! Usage analytics and cost accounting for the usage payload served by a
//! proxy's management API (`GET /usage`).
//!
//! ## Overview
//!
//! The payload is flattened into per-request detail records, bucketed into
//! hourly, daily or per-minute series per model, and joined with a
//! user-maintained price table to produce:
//! - Request and token series for a configurable set of chart lines
//! - Live requests/tokens per minute over a rolling window
//! - Per-bucket, per-endpoint, per-model and total cost
//!
//! Every computation is a pure function of the records it is handed;
//! [`engine::AnalyticsEngine`] ties them to the persisted price table and the
//! chart line selection.
//!
//! ## Features
//!
//! - `colors` (default): Enables terminal color output via owo-colors

/// Time buckets for hourly, daily and minute-window charts
pub mod buckets;

/// Chart line slots bound to models or "all models"
pub mod chart_lines;

/// Command-line argument parsing and configuration
pub mod cli;

/// Cost accounting against the price table
pub mod cost;

/// Persistent key/value storage (SQLite, with in-memory fallback)
pub mod db;

/// Display formatting for text and JSON output
pub mod display;

/// Analytics engine tying records, prices and chart lines together
pub mod engine;

/// Usage payload and detail record types
pub mod models;

/// Payload flattening into detail records
pub mod normalize;

/// Persisted per-model price table
pub mod pricing;

/// Rolling-window rates and minute series
pub mod rates;

/// Per-model series aggregation
pub mod series;

/// Summary, endpoint and model totals
pub mod stats;

/// Utility functions for paths, formatting, and time
pub mod utils;
