//! Append-only audit trail of applied corrections.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::strategy::StrategyId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub column: Option<String>,
    /// Row index within a column pass, when known.
    pub row: Option<usize>,
    pub original: String,
    pub corrected: String,
    pub source: StrategyId,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl ChangeLogEntry {
    pub fn new(
        column: Option<&str>,
        row: Option<usize>,
        original: &str,
        corrected: &str,
        source: StrategyId,
        confidence: f64,
    ) -> Self {
        Self {
            column: column.map(str::to_string),
            row,
            original: original.to_string(),
            corrected: corrected.to_string(),
            source,
            confidence,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChangeLog {
    entries: Mutex<Vec<ChangeLogEntry>>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: ChangeLogEntry) {
        self.entries.lock().push(entry);
    }

    pub fn extend(&self, entries: impl IntoIterator<Item = ChangeLogEntry>) {
        self.entries.lock().extend(entries);
    }

    /// Snapshot of every entry in arrival order.
    pub fn export(&self) -> Vec<ChangeLogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.entries.lock())?)
    }

    /// `{column: {original: corrected}}`, later entries winning. Entries without a
    /// column are grouped under `""`.
    pub fn corrections_by_column(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.group(|e| (e.original.clone(), e.corrected.clone()))
    }

    /// `{column: {corrected: original}}`, for reverting applied corrections.
    pub fn reversal_by_column(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.group(|e| (e.corrected.clone(), e.original.clone()))
    }

    fn group<F>(&self, pair: F) -> BTreeMap<String, BTreeMap<String, String>>
    where
        F: Fn(&ChangeLogEntry) -> (String, String),
    {
        let mut out: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for entry in self.entries.lock().iter() {
            let (from, to) = pair(entry);
            out.entry(entry.column.clone().unwrap_or_default())
                .or_default()
                .insert(from, to);
        }
        out
    }
}
