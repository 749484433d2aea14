use anyhow::{Context, Result, bail};
use chrono::Local;
use std::path::Path;
use tracing::{debug, warn};

use proxy_usage_stats::chart_lines::{ChartLineSelection, LineSelection};
use proxy_usage_stats::cli::{Args, Command, PricesCommand};
use proxy_usage_stats::db::open_store;
use proxy_usage_stats::display::{
    ReportOptions, print_json_report, print_price_table, print_text_report,
};
use proxy_usage_stats::engine::AnalyticsEngine;
use proxy_usage_stats::pricing::PriceStore;
use proxy_usage_stats::utils::read_stdin;

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_payload(input: Option<&str>) -> Result<serde_json::Value> {
    let raw = match input {
        Some(path) => std::fs::read(path).with_context(|| format!("read {path}"))?,
        None => read_stdin()?,
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&raw).context("parse usage payload")
}

fn run_prices(cmd: &PricesCommand, prices: &mut PriceStore, json: bool) -> Result<()> {
    match cmd {
        PricesCommand::List => {}
        PricesCommand::Set {
            model,
            prompt,
            completion,
        } => {
            if !prices.set(model.trim(), *prompt, *completion) {
                bail!("invalid price for {model:?}: prices must be finite and non-negative");
            }
        }
        PricesCommand::Remove { model } => {
            if !prices.remove(model.trim()) {
                bail!("no price configured for {model:?}");
            }
        }
        PricesCommand::Clear => prices.clear(),
    }
    if !prices.is_persistent() {
        warn!("storage unavailable, prices are not persisted");
    }
    print_price_table(prices.prices(), json)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let store = open_store(args.db_path.as_deref().map(Path::new));
    let mut prices = PriceStore::load(store);
    debug!(models = prices.prices().len(), "price table loaded");

    if let Some(Command::Prices(cmd)) = &args.command {
        return run_prices(cmd, &mut prices, args.json);
    }

    let lines = if args.lines.is_empty() {
        ChartLineSelection::new(args.line_count, args.max_lines)
    } else {
        ChartLineSelection::with_selections(
            args.lines.iter().map(|s| LineSelection::parse(s)).collect(),
            args.max_lines,
        )
    };

    let payload = read_payload(args.input.as_deref())?;
    let mut engine = AnalyticsEngine::new(prices, lines);
    engine.ingest_value(&payload);
    debug!(
        records = engine.records().len(),
        models = engine.models().len(),
        "usage payload normalized"
    );

    let opts = ReportOptions {
        period: args.period.into(),
        metric: args.metric.into(),
        window_minutes: args.window_minutes,
        mask_sources: args.mask_sources,
        detail_limit: args.details,
    };
    let now = Local::now();
    if args.json {
        print_json_report(&engine, &opts, now)?;
    } else {
        print_text_report(&engine, &opts, now);
    }
    Ok(())
}
