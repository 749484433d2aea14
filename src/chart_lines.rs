//! # Chart Lines Module
//!
//! Which series the usage chart plots. Each visible slot is bound to a model
//! name, the synthetic "all models" series, or a transient placeholder that
//! is filled in on the next normalization pass.

use serde::{Serialize, Serializer};
use std::collections::HashSet;

pub const ALL_MODELS: &str = "all";
pub const NO_MODEL: &str = "none";
pub const DEFAULT_MAX_LINES: usize = 9;
pub const DEFAULT_VISIBLE_LINES: usize = 3;

const PALETTE: [&str; 9] = [
    "#3b82f6", "#22c55e", "#f97316", "#a855f7", "#ef4444", "#14b8a6", "#eab308", "#ec4899",
    "#64748b",
];

/// Stable color for a slot index.
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LineSelection {
    All,
    Placeholder,
    Model(String),
}

impl LineSelection {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | NO_MODEL => LineSelection::Placeholder,
            ALL_MODELS => LineSelection::All,
            other => LineSelection::Model(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LineSelection::All => ALL_MODELS,
            LineSelection::Placeholder => NO_MODEL,
            LineSelection::Model(m) => m,
        }
    }
}

impl Serialize for LineSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartLineSelection {
    max_count: usize,
    selections: Vec<LineSelection>,
    initialized: bool,
}

impl Default for ChartLineSelection {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBLE_LINES, DEFAULT_MAX_LINES)
    }
}

impl ChartLineSelection {
    /// `visible` is clamped to `[1, max]`; `max` is at least 1.
    pub fn new(visible: usize, max: usize) -> Self {
        let max_count = max.max(1);
        ChartLineSelection {
            max_count,
            selections: vec![LineSelection::Placeholder; visible.clamp(1, max_count)],
            initialized: false,
        }
    }

    /// Start from explicit selections, e.g. from command-line flags.
    pub fn with_selections(selections: Vec<LineSelection>, max: usize) -> Self {
        let mut s = Self::new(selections.len(), max);
        for (slot, value) in s.selections.iter_mut().zip(selections) {
            *slot = value;
        }
        s
    }

    pub fn visible_count(&self) -> usize {
        self.selections.len()
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn selections(&self) -> &[LineSelection] {
        &self.selections
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Grow (padding with placeholders) or shrink to `count`, clamped to
    /// `[1, max]`. Returns the resulting visible count.
    pub fn set_visible_count(&mut self, count: usize) -> usize {
        let count = count.clamp(1, self.max_count);
        self.selections.resize(count, LineSelection::Placeholder);
        count
    }

    /// Remove slot `index`, shifting later slots down. Refused when it is the
    /// last remaining slot or out of range.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.selections.len() <= 1 || index >= self.selections.len() {
            return false;
        }
        self.selections.remove(index);
        true
    }

    pub fn set(&mut self, index: usize, value: LineSelection) -> bool {
        match self.selections.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Re-validate against the models present in the latest data.
    ///
    /// Placeholders take the next unused model (or "all" once the list is
    /// exhausted). Before the first population, unknown names are treated
    /// the same way; afterwards they fall back to "all" so valid manual
    /// choices are never reshuffled. An empty model list leaves the slots
    /// untouched.
    pub fn normalize(&mut self, available: &[String]) {
        if available.is_empty() {
            return;
        }
        let valid: HashSet<&str> = available.iter().map(String::as_str).collect();
        let is_valid = |s: &LineSelection| match s {
            LineSelection::All => true,
            LineSelection::Model(m) => valid.contains(m.as_str()),
            LineSelection::Placeholder => false,
        };

        if self.initialized {
            for slot in self.selections.iter_mut() {
                if let LineSelection::Model(m) = slot
                    && !valid.contains(m.as_str())
                {
                    *slot = LineSelection::All;
                }
            }
        } else {
            for slot in self.selections.iter_mut() {
                if !is_valid(slot) {
                    *slot = LineSelection::Placeholder;
                }
            }
        }

        let mut used: HashSet<String> = self
            .selections
            .iter()
            .filter_map(|s| match s {
                LineSelection::Model(m) => Some(m.clone()),
                _ => None,
            })
            .collect();
        let mut candidates = available.iter();
        for slot in self.selections.iter_mut() {
            if *slot != LineSelection::Placeholder {
                continue;
            }
            let next = candidates.by_ref().find(|m| !used.contains(m.as_str()));
            *slot = match next {
                Some(m) => {
                    used.insert(m.clone());
                    LineSelection::Model(m.clone())
                }
                None => LineSelection::All,
            };
        }
        self.initialized = true;
    }

    /// Slots that should be rendered, with their slot index.
    pub fn active(&self) -> impl Iterator<Item = (usize, &LineSelection)> {
        self.selections
            .iter()
            .enumerate()
            .filter(|(_, s)| **s != LineSelection::Placeholder)
    }
}
