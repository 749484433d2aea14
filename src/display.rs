use chrono::{DateTime, Local};
use serde_json::json;

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

// Provide a no-op color shim when "colors" feature is disabled
#[cfg(not(feature = "colors"))]
pub mod color_shim {
    use std::fmt::{self, Display, Formatter};

    #[derive(Clone)]
    pub struct Plain(pub String);

    impl Display for Plain {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    pub trait ColorizeShim {
        fn as_str(&self) -> &str;

        fn bright_black(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_white(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_cyan(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn red(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn yellow(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn green(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bold(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn dimmed(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
    }

    impl ColorizeShim for &str {
        fn as_str(&self) -> &str {
            self
        }
    }
    impl ColorizeShim for String {
        fn as_str(&self) -> &str {
            self.as_str()
        }
    }
    impl ColorizeShim for Plain {
        fn as_str(&self) -> &str {
            &self.0
        }
    }
}

#[cfg(not(feature = "colors"))]
use color_shim::ColorizeShim as OwoColorize;

use crate::buckets::Period;
use crate::engine::AnalyticsEngine;
use crate::pricing::PriceTable;
use crate::series::Metric;
use crate::stats::GroupStats;
use crate::utils::{format_cost, format_rate, format_tokens};

/// What a report covers.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub period: Period,
    pub metric: Metric,
    pub window_minutes: u32,
    pub mask_sources: bool,
    /// Most recent details to list; 0 lists none.
    pub detail_limit: usize,
}

fn colorize_success_rate(pct: f64) -> String {
    if pct < 80.0 {
        format!("{pct:.1}%").red().bold().to_string()
    } else if pct < 95.0 {
        format!("{pct:.1}%").yellow().to_string()
    } else {
        format!("{pct:.1}%").green().to_string()
    }
}

fn group_json(rows: &[GroupStats]) -> serde_json::Value {
    serde_json::Value::Array(
        rows.iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "requests": r.requests,
                    "success_count": r.success_count,
                    "failure_count": r.failure_count,
                    "tokens": r.tokens,
                    "cost": r.cost,
                    "cost_display": format_cost(r.cost),
                })
            })
            .collect(),
    )
}

fn recent_details_json(engine: &AnalyticsEngine, opts: &ReportOptions) -> serde_json::Value {
    let mut timed: Vec<_> = engine
        .records()
        .iter()
        .filter_map(|r| r.timestamp_ms().map(|ts| (ts, r)))
        .collect();
    timed.sort_by(|a, b| b.0.cmp(&a.0));
    serde_json::Value::Array(
        timed
            .into_iter()
            .take(opts.detail_limit)
            .map(|(_, r)| {
                let source = if opts.mask_sources {
                    r.masked_source()
                } else {
                    r.source.clone()
                };
                json!({
                    "timestamp": r.timestamp,
                    "model": r.model_name,
                    "endpoint": r.endpoint,
                    "source": source,
                    "failed": r.failed,
                    "tokens": r.tokens,
                    "total_tokens": r.total_tokens(),
                })
            })
            .collect(),
    )
}

/// Everything the usage view renders, as one JSON document.
pub fn build_json_report(
    engine: &AnalyticsEngine,
    opts: &ReportOptions,
    now: DateTime<Local>,
) -> serde_json::Value {
    let summary = engine.summary();
    let chart = engine.build_chart_data_for_metric(opts.period, opts.metric, now);
    let cost = engine.calculate_cost_data(opts.period, now);
    let rates = engine.calculate_recent_per_minute_rates(opts.window_minutes, now);
    let recent = engine.build_recent_window_series(opts.window_minutes, now);
    let total_cost_display = if cost.has_prices {
        format_cost(Some(cost.total_cost))
    } else {
        format_cost(None)
    };

    json!({
        "generated_at": now.to_rfc3339(),
        "period": opts.period.as_str(),
        "metric": opts.metric.as_str(),
        "summary": {
            "total_requests": summary.total_requests,
            "success_count": summary.success_count,
            "failure_count": summary.failure_count,
            "success_rate": summary.success_rate().map(|v| (v * 10.0).round() / 10.0),
            "total_tokens": summary.total_tokens,
            "input_tokens": summary.input_tokens,
            "output_tokens": summary.output_tokens,
            "reasoning_tokens": summary.reasoning_tokens,
            "cached_tokens": summary.cached_tokens,
        },
        "rates": rates,
        "chart": chart,
        "chart_lines": engine.lines(),
        "cost": {
            "total_cost": cost.total_cost,
            "total_cost_display": total_cost_display,
            "has_prices": cost.has_prices,
            "labels": cost.labels,
            "datasets": cost.datasets,
        },
        "recent_window": recent,
        "endpoints": group_json(&engine.endpoint_stats()),
        "models": group_json(&engine.model_stats()),
        "recent_details": recent_details_json(engine, opts),
    })
}

pub fn print_json_report(
    engine: &AnalyticsEngine,
    opts: &ReportOptions,
    now: DateTime<Local>,
) -> anyhow::Result<()> {
    let json = build_json_report(engine, opts, now);
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

fn print_group_table(title: &str, rows: &[GroupStats]) {
    if rows.is_empty() {
        return;
    }
    println!("{}", title.bold());
    for r in rows {
        println!(
            "  {:<40} {:>8} req  {:>4} fail  {:>8} tok  {:>10}",
            r.name,
            r.requests,
            r.failure_count,
            format_tokens(r.tokens),
            format_cost(r.cost)
        );
    }
}

pub fn print_text_report(engine: &AnalyticsEngine, opts: &ReportOptions, now: DateTime<Local>) {
    let summary = engine.summary();
    let rates = engine.calculate_recent_per_minute_rates(opts.window_minutes, now);
    let cost = engine.calculate_cost_data(opts.period, now);

    let rate_display = summary
        .success_rate()
        .map(colorize_success_rate)
        .unwrap_or_else(|| "--".dimmed().to_string());
    println!(
        "{} {} requests ({} ok, {} failed, {})  {} tokens",
        "Usage".bright_cyan().bold(),
        summary.total_requests,
        summary.success_count,
        summary.failure_count,
        rate_display,
        format_tokens(summary.total_tokens),
    );
    println!(
        "{} {} rpm  {} tpm  {}",
        "Rate".bright_cyan().bold(),
        format_rate(rates.rpm),
        format_rate(rates.tpm),
        format!("(last {} min)", rates.window_minutes).dimmed(),
    );
    let cost_display = if cost.has_prices {
        format_cost(Some(cost.total_cost))
    } else {
        format_cost(None)
    };
    println!("{} {}", "Cost".bright_cyan().bold(), cost_display.bright_white());

    let chart = engine.build_chart_data_for_metric(opts.period, opts.metric, now);
    if !chart.datasets.is_empty() {
        println!(
            "{} {} by {}",
            "Chart".bright_cyan().bold(),
            opts.metric.as_str(),
            opts.period.as_str()
        );
        for ds in &chart.datasets {
            let total: f64 = ds.data.iter().sum();
            let peak = ds.data.iter().cloned().fold(0.0, f64::max);
            println!(
                "  {:<40} total {:>10}  peak {:>8}",
                ds.label,
                format_tokens(total as u64),
                format_tokens(peak as u64)
            );
        }
    }

    print_group_table("Endpoints", &engine.endpoint_stats());
    print_group_table("Models", &engine.model_stats());

    if opts.detail_limit > 0 {
        if let serde_json::Value::Array(rows) = recent_details_json(engine, opts) {
            if !rows.is_empty() {
                println!("{}", "Recent requests".bold());
            }
            for row in rows {
                let status = if row["failed"].as_bool().unwrap_or(false) {
                    "fail".red().to_string()
                } else {
                    "ok".green().to_string()
                };
                println!(
                    "  {} {:<28} {:<16} {:>8} {}",
                    row["timestamp"].as_str().unwrap_or_default().bright_black(),
                    row["model"].as_str().unwrap_or_default(),
                    row["source"].as_str().unwrap_or_default(),
                    format_tokens(row["total_tokens"].as_u64().unwrap_or(0)),
                    status
                );
            }
        }
    }
}

pub fn print_price_table(prices: &PriceTable, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(prices)?);
        return Ok(());
    }
    if prices.is_empty() {
        println!("{}", "no prices configured".dimmed());
        return Ok(());
    }
    println!(
        "{}",
        format!("{:<40} {:>12} {:>12}", "model", "prompt/1M", "completion/1M").bold()
    );
    for (model, p) in prices {
        println!("{:<40} {:>12.4} {:>12.4}", model, p.prompt, p.completion);
    }
    Ok(())
}
