use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// A raw submission and the priority it is admitted with.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub submission: Value,
    pub priority: i64,
}

/// One element of a submissions file.
#[derive(Deserialize)]
#[serde(untagged)]
enum FileEntry {
    Prioritized(Prioritized),
    Raw(Value),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Prioritized {
    submission: Value,
    #[serde(default)]
    priority: i64,
}

/// Parse a command line item as JSON, falling back to a plain string.
pub fn parse_item(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn from_items(items: &[String], priority: i64) -> Vec<Entry> {
    items
        .iter()
        .map(|item| Entry {
            submission: parse_item(item),
            priority,
        })
        .collect()
}

/// Read a submissions file. A top-level array holds one entry per element;
/// any other value is a single entry with priority 0.
pub fn from_file(path: &Path) -> Result<Vec<Entry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submissions: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse submissions: {}", path.display()))?;
    from_value(value)
}

fn from_value(value: Value) -> Result<Vec<Entry>> {
    let elements = match value {
        Value::Array(elements) => elements,
        other => vec![other],
    };

    elements
        .into_iter()
        .map(|element| -> Result<Entry> {
            let entry = match serde_json::from_value::<FileEntry>(element)? {
                FileEntry::Prioritized(p) => Entry {
                    submission: p.submission,
                    priority: p.priority,
                },
                FileEntry::Raw(submission) => Entry {
                    submission,
                    priority: 0,
                },
            };
            Ok(entry)
        })
        .collect()
}
