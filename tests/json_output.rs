use chrono::Local;
use serde_json::json;

use proxy_usage_stats::buckets::Period;
use proxy_usage_stats::chart_lines::ChartLineSelection;
use proxy_usage_stats::display::{ReportOptions, build_json_report};
use proxy_usage_stats::engine::AnalyticsEngine;
use proxy_usage_stats::pricing::PriceStore;
use proxy_usage_stats::series::Metric;

fn options(mask: bool) -> ReportOptions {
    ReportOptions {
        period: Period::Hour,
        metric: Metric::Tokens,
        window_minutes: 30,
        mask_sources: mask,
        detail_limit: 5,
    }
}

#[test]
fn json_report_shape() {
    let now = Local::now();
    let mut engine = AnalyticsEngine::new(PriceStore::in_memory(), ChartLineSelection::default());
    engine.prices_mut().set("gpt-4o", 2.0, 6.0);
    engine.ingest_value(&json!({"usage": {"apis": {"/v1/chat/completions": {"models": {
        "gpt-4o": {"details": [{
            "timestamp": now.to_rfc3339(),
            "source": "sk-live-abcdefghijkl",
            "failed": false,
            "tokens": {"input_tokens": 500000, "output_tokens": 100000}
        }]}
    }}}}}));

    let v = build_json_report(&engine, &options(true), now);
    for key in [
        "generated_at",
        "period",
        "metric",
        "summary",
        "rates",
        "chart",
        "chart_lines",
        "cost",
        "recent_window",
        "endpoints",
        "models",
        "recent_details",
    ] {
        assert!(v.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(v["period"], "hour");
    assert_eq!(v["metric"], "tokens");
    assert_eq!(v["summary"]["total_requests"], 1);
    assert_eq!(v["chart"]["labels"].as_array().unwrap().len(), 24);
    assert_eq!(v["chart_lines"]["selections"][0], "gpt-4o");
    assert_eq!(v["cost"]["has_prices"], true);
    assert_eq!(v["cost"]["total_cost_display"], "$1.6000");
    assert_eq!(v["endpoints"][0]["name"], "/v1/chat/completions");
    assert_eq!(v["recent_details"][0]["source"], "sk-l***ijkl");
    assert_eq!(v["recent_window"]["labels"].as_array().unwrap().len(), 30);
}

#[test]
fn json_report_on_empty_payload() {
    let now = Local::now();
    let mut engine = AnalyticsEngine::new(PriceStore::in_memory(), ChartLineSelection::default());
    engine.ingest_value(&serde_json::Value::Null);
    let v = build_json_report(&engine, &options(false), now);
    assert_eq!(v["summary"]["total_requests"], 0);
    assert_eq!(v["summary"]["success_rate"], serde_json::Value::Null);
    assert_eq!(v["cost"]["total_cost_display"], "--");
    assert!(v["chart"]["datasets"].as_array().unwrap().is_empty());
    assert_eq!(v["chart_lines"]["selections"], json!(["none", "none", "none"]));
}
