//! Accumulated validation errors, reported at the end of a run.

use std::collections::BTreeMap;
use std::fmt::Write;

use log::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    message: String,
    count: usize,
}

/// Errors by sheet name, then row key, then message.
///
/// Repeated messages are counted rather than duplicated. Nothing recorded
/// here blocks output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationLog {
    sheets: BTreeMap<String, BTreeMap<String, Vec<Entry>>>,
}

impl ValidationLog {
    /// Records `message` against `key` of `sheet`.
    pub fn record(&mut self, sheet: &str, key: &str, message: impl Into<String>) {
        let message = message.into();
        let entries = self.sheets.entry(sheet.to_string()).or_default().entry(key.to_string()).or_default();
        match entries.iter_mut().find(|e| e.message == message) {
            Some(entry) => entry.count += 1,
            None => entries.push(Entry { message, count: 1 }),
        }
    }

    /// Messages recorded for one key, in recording order.
    #[must_use]
    pub fn messages(&self, sheet: &str, key: &str) -> Vec<&str> {
        self.sheets
            .get(sheet)
            .and_then(|keys| keys.get(key))
            .map(|entries| entries.iter().map(|e| e.message.as_str()).collect())
            .unwrap_or_default()
    }

    /// Keys with at least one message in `sheet`.
    #[must_use]
    pub fn keys(&self, sheet: &str) -> Vec<&str> {
        self.sheets.get(sheet).map(|keys| keys.keys().map(String::as_str).collect()).unwrap_or_default()
    }

    /// Number of distinct messages across all sheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.values().flat_map(BTreeMap::values).map(Vec::len).sum()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Folds another log into this one.
    pub fn extend(&mut self, other: &Self) {
        for (sheet, keys) in &other.sheets {
            for (key, entries) in keys {
                for entry in entries {
                    for _ in 0..entry.count {
                        self.record(sheet, key, entry.message.clone());
                    }
                }
            }
        }
    }

    /// Indented text report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (sheet, keys) in &self.sheets {
            let _ = writeln!(out, "{sheet}");
            for (key, entries) in keys {
                let _ = writeln!(out, "  {key}");
                for entry in entries {
                    if entry.count > 1 {
                        let _ = writeln!(out, "    {} ({} times)", entry.message, entry.count);
                    } else {
                        let _ = writeln!(out, "    {}", entry.message);
                    }
                }
            }
        }
        out
    }

    /// Logs the report as a single warning block.
    pub fn log(&self) {
        if self.is_empty() {
            return;
        }
        warn!("Validation errors:\n{}", self.report().trim_end());
    }
}
