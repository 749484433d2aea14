//! # Pricing Module
//!
//! User-maintained per-model price table.
//!
//! ## Pricing Structure
//!
//! Each model has a prompt and a completion price, both in currency units per
//! 1,000,000 tokens. Entries are keyed by the exact model name.
//!
//! The table is stored as JSON under [`PRICES_KEY`]. Older installs kept it
//! under [`LEGACY_PRICES_KEY`] in per-1,000-token units; the first load
//! rescales those entries and removes the legacy key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::db::{KeyValueStore, MemoryStore};

pub const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;
pub const PRICES_KEY: &str = "model_prices_v2";
pub const LEGACY_PRICES_KEY: &str = "model_prices";
/// Per-1K-token prices become per-1M-token prices.
const LEGACY_SCALE: f64 = 1000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub prompt: f64,
    pub completion: f64,
}

impl ModelPrice {
    pub fn new(prompt: f64, completion: f64) -> Option<Self> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        (ok(prompt) && ok(completion)).then_some(ModelPrice { prompt, completion })
    }

    /// Cost of one request's prompt/completion token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / TOKENS_PER_PRICE_UNIT) * self.prompt
            + (output_tokens as f64 / TOKENS_PER_PRICE_UNIT) * self.completion
    }

    fn scaled(&self, factor: f64) -> Option<Self> {
        ModelPrice::new(self.prompt * factor, self.completion * factor)
    }
}

pub type PriceTable = BTreeMap<String, ModelPrice>;

fn price_field(v: Option<&Value>) -> Option<Option<f64>> {
    match v {
        None | Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => n.as_f64().map(Some),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(Some),
        Some(_) => None,
    }
}

fn parse_entry(v: &Value) -> Option<ModelPrice> {
    let obj = v.as_object()?;
    let prompt = price_field(obj.get("prompt"))?;
    let completion = price_field(obj.get("completion"))?;
    if prompt.is_none() && completion.is_none() {
        return None;
    }
    ModelPrice::new(prompt.unwrap_or(0.0), completion.unwrap_or(0.0))
}

/// Decode a stored table, dropping entries that are not finite and non-negative.
pub fn parse_price_table(raw: &str) -> PriceTable {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("stored price table is not valid JSON: {e}");
            return PriceTable::new();
        }
    };
    let Some(obj) = value.as_object() else {
        return PriceTable::new();
    };
    let mut table = PriceTable::new();
    for (model, entry) in obj {
        if model.is_empty() {
            continue;
        }
        match parse_entry(entry) {
            Some(price) => {
                table.insert(model.clone(), price);
            }
            None => debug!(model = %model, "dropping malformed price entry"),
        }
    }
    table
}

pub struct PriceStore {
    store: Box<dyn KeyValueStore>,
    prices: PriceTable,
}

impl PriceStore {
    /// Load the table, migrating the legacy per-1K key on first use.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let mut ps = PriceStore {
            store,
            prices: PriceTable::new(),
        };
        let migrated = ps.migrate_legacy();
        ps.prices = match migrated {
            Some(table) => table,
            None => ps.read_current(),
        };
        ps
    }

    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    fn read_current(&self) -> PriceTable {
        match self.store.get(PRICES_KEY) {
            Ok(Some(raw)) => parse_price_table(&raw),
            Ok(None) => PriceTable::new(),
            Err(e) => {
                warn!("failed to read price table: {e:#}");
                PriceTable::new()
            }
        }
    }

    /// Returns the merged table when a legacy key was found.
    fn migrate_legacy(&mut self) -> Option<PriceTable> {
        let legacy = match self.store.get(LEGACY_PRICES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read legacy price table: {e:#}");
                return None;
            }
        };
        let mut merged: PriceTable = parse_price_table(&legacy)
            .into_iter()
            .filter_map(|(model, price)| price.scaled(LEGACY_SCALE).map(|p| (model, p)))
            .collect();
        // entries already written in the current unit win
        merged.extend(self.read_current());
        let migrated = merged.len();
        self.prices = merged;
        if let Err(e) = self.persist() {
            warn!("price migration could not be written: {e:#}");
        } else if let Err(e) = self.store.remove(LEGACY_PRICES_KEY) {
            warn!("legacy price key could not be removed: {e:#}");
        } else {
            debug!(migrated, "migrated legacy per-1K price table");
        }
        Some(std::mem::take(&mut self.prices))
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        let raw = serde_json::to_string(&self.prices)?;
        self.store.set(PRICES_KEY, &raw)
    }

    fn persist_or_warn(&mut self) {
        if let Err(e) = self.persist() {
            warn!("failed to persist price table: {e:#}");
        }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn get(&self, model: &str) -> Option<ModelPrice> {
        self.prices.get(model).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    /// Insert or replace a price under the exact model name. Returns `false`
    /// for a blank model name or a negative/non-finite price.
    pub fn set(&mut self, model: &str, prompt: f64, completion: f64) -> bool {
        let Some(price) = ModelPrice::new(prompt, completion) else {
            return false;
        };
        if model.trim().is_empty() {
            return false;
        }
        self.prices.insert(model.to_string(), price);
        self.persist_or_warn();
        true
    }

    pub fn remove(&mut self, model: &str) -> bool {
        let removed = self.prices.remove(model).is_some();
        if removed {
            self.persist_or_warn();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.prices.clear();
        self.persist_or_warn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, &str)]) -> Box<MemoryStore> {
        let mut s = MemoryStore::new();
        for (k, v) in entries {
            s.set(k, v).unwrap();
        }
        Box::new(s)
    }

    #[test]
    fn test_cost_per_million() {
        let p = ModelPrice::new(2.0, 6.0).unwrap();
        assert!((p.cost(500_000, 100_000) - 1.6).abs() < 1e-12);
        assert_eq!(ModelPrice::new(0.0, 0.0).unwrap().cost(1_000_000, 1_000_000), 0.0);
    }

    #[test]
    fn test_rejects_invalid_prices() {
        assert!(ModelPrice::new(-1.0, 0.0).is_none());
        assert!(ModelPrice::new(f64::NAN, 0.0).is_none());
        assert!(ModelPrice::new(1.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let t = parse_price_table(
            r#"{"ok": {"prompt": 1, "completion": 2},
                "str": {"prompt": "3", "completion": "4"},
                "half": {"prompt": 5},
                "neg": {"prompt": -1, "completion": 2},
                "obj": {"prompt": {}, "completion": 1},
                "empty": {},
                "num": 7}"#,
        );
        assert_eq!(t.len(), 3);
        assert_eq!(t["str"], ModelPrice { prompt: 3.0, completion: 4.0 });
        assert_eq!(t["half"], ModelPrice { prompt: 5.0, completion: 0.0 });
        assert!(parse_price_table("not json").is_empty());
        assert!(parse_price_table("[1,2]").is_empty());
    }

    #[test]
    fn test_legacy_migration() {
        let ps = PriceStore::load(store_with(&[(
            LEGACY_PRICES_KEY,
            r#"{"gpt-4o": {"prompt": 0.002, "completion": 0.006}}"#,
        )]));
        let p = ps.get("gpt-4o").unwrap();
        assert!((p.prompt - 2.0).abs() < 1e-9);
        assert!((p.completion - 6.0).abs() < 1e-9);
        assert_eq!(ps.store.get(LEGACY_PRICES_KEY).unwrap(), None);
        assert!(ps.store.get(PRICES_KEY).unwrap().is_some());
    }

    #[test]
    fn test_current_entries_win_over_legacy() {
        let ps = PriceStore::load(store_with(&[
            (LEGACY_PRICES_KEY, r#"{"a": {"prompt": 0.001, "completion": 0.001}, "b": {"prompt": 0.003, "completion": 0}}"#),
            (PRICES_KEY, r#"{"a": {"prompt": 10, "completion": 20}}"#),
        ]));
        assert_eq!(ps.get("a"), Some(ModelPrice { prompt: 10.0, completion: 20.0 }));
        assert!((ps.get("b").unwrap().prompt - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_remove_clear() {
        let mut ps = PriceStore::in_memory();
        assert!(ps.set("m", 1.0, 2.0));
        assert!(!ps.set("m", -1.0, 2.0));
        assert!(!ps.set("  ", 1.0, 2.0));
        assert_eq!(ps.get("m"), Some(ModelPrice { prompt: 1.0, completion: 2.0 }));
        assert!(ps.remove("m"));
        assert!(!ps.remove("m"));

        // keys are exact: what is set is what get/remove must name
        assert!(ps.set(" padded ", 1.0, 1.0));
        assert_eq!(ps.get("padded"), None);
        assert!(ps.get(" padded ").is_some());
        assert!(!ps.remove("padded"));
        assert!(ps.remove(" padded "));
        ps.set("x", 0.0, 0.0);
        assert!(!ps.is_empty());
        ps.clear();
        assert!(ps.is_empty());
    }
}
