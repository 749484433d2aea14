use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use std::env;
use std::io::Read;
use std::path::PathBuf;

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Resolve the SQLite file holding persisted preferences.
///
/// `PROXY_USAGE_DB_PATH` wins; otherwise the platform data directory is used.
pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("PROXY_USAGE_DB_PATH") {
        let custom = custom.trim();
        if !custom.is_empty() {
            return Some(PathBuf::from(custom));
        }
    }
    directories::ProjectDirs::from("", "", "proxy-usage-stats")
        .map(|d| d.data_dir().join("usage.db"))
}

pub fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

fn local_from_naive(naive: &NaiveDateTime) -> Option<DateTime<Local>> {
    match Local.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(a, b) => Some(a.min(b)),
        LocalResult::None => None,
    }
}

/// Parse an ISO-8601 timestamp into epoch milliseconds.
///
/// Offsets are honored; date-times without an offset are read in local time
/// and bare dates as UTC midnight, matching how browsers parse them.
pub fn parse_timestamp_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local_from_naive(&naive).map(|dt| dt.timestamp_millis());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

pub fn local_from_ms(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

/// Calendar day of `ms` in the viewer's local time, as `YYYY-MM-DD`.
pub fn local_day_label(ms: i64) -> Option<String> {
    local_from_ms(ms).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Local midnight starting the day named by `label`.
pub fn local_day_start_ms(label: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(label, "%Y-%m-%d").ok()?;
    local_from_naive(&date.and_hms_opt(0, 0, 0)?).map(|dt| dt.timestamp_millis())
}

/// Hide the middle of credential-like sources: `sk-a***wxyz`.
pub fn mask_source(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

/// `$x.xxxx`, or `--` when nothing was priced.
pub fn format_cost(v: Option<f64>) -> String {
    match v {
        Some(c) if c.is_finite() => format!("${c:.4}"),
        _ => "--".to_string(),
    }
}

pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.1}B", n as f64 / 1e9)
    } else if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}

pub fn format_rate(v: f64) -> String {
    if v >= 100.0 {
        format!("{v:.0}")
    } else if v >= 10.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_offsets_and_zulu() {
        assert_eq!(
            parse_timestamp_ms("2025-10-18T10:00:00Z"),
            Some(1_760_781_600_000)
        );
        assert_eq!(
            parse_timestamp_ms("2025-10-18T12:00:00+02:00"),
            Some(1_760_781_600_000)
        );
        assert_eq!(parse_timestamp_ms("2025-10-18"), Some(1_760_745_600_000));
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp_ms(""), None);
        assert_eq!(parse_timestamp_ms("yesterday"), None);
        assert_eq!(parse_timestamp_ms("2025-13-40T00:00:00Z"), None);
    }

    #[test]
    fn day_label_round_trips_through_start() {
        let label = local_day_label(1_760_781_600_000).unwrap();
        let start = local_day_start_ms(&label).unwrap();
        assert!(start <= 1_760_781_600_000);
        assert_eq!(local_day_label(start).unwrap(), label);
    }

    #[test]
    fn masks_sources() {
        assert_eq!(mask_source(""), "");
        assert_eq!(mask_source("short"), "***");
        assert_eq!(mask_source("sk-abcdefghijklmnop"), "sk-a***mnop");
    }

    #[test]
    fn formats_costs_and_tokens() {
        assert_eq!(format_cost(Some(1.6)), "$1.6000");
        assert_eq!(format_cost(None), "--");
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_500), "1.5K");
        assert_eq!(format_tokens(2_000_000), "2.0M");
    }

    #[test]
    #[serial]
    fn db_path_honors_env_override() {
        // SAFETY: Test runs serially, no concurrent env access
        unsafe { env::set_var("PROXY_USAGE_DB_PATH", "/tmp/custom-usage.db") };
        assert_eq!(default_db_path(), Some(PathBuf::from("/tmp/custom-usage.db")));
        unsafe { env::remove_var("PROXY_USAGE_DB_PATH") };
    }
}
