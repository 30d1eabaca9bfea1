//! Domain models

use std::collections::BTreeMap;

pub mod campaign;
pub mod credential;
pub mod deployment;
pub mod job;
pub mod template;

/// One batch row: field name -> value
pub type RowData = BTreeMap<String, String>;

/// Row keys accepted for the target slug, in priority order
pub const SLUG_KEYS: [&str; 5] = ["sub_domain", "subDomain", "subdomain", "SubDomain", "slug"];

/// First non-blank value among `keys`, trimmed
pub fn pick<'a>(row: &'a RowData, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Normalise a user-chosen slug to a DNS/path-safe label.
///
/// Lowercases, turns whitespace and underscores into `-`, drops anything else
/// outside `[a-z0-9-]` and collapses repeated dashes. Returns `None` when
/// nothing usable is left or the result exceeds 63 characters.
pub fn slugify(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars().flat_map(|c| c.to_lowercase()) {
        let mapped = match ch {
            'a'..='z' | '0'..='9' => Some(ch),
            '-' | '_' | ' ' | '\t' => Some('-'),
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '-' && (out.is_empty() || out.ends_with('-')) {
                continue;
            }
            out.push(c);
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() || out.len() > 63 {
        None
    } else {
        Some(out)
    }
}

/// Convert a JSON row (as submitted) into string fields
pub fn row_from_json(row: &BTreeMap<String, serde_json::Value>) -> RowData {
    row.iter()
        .filter_map(|(k, v)| {
            let value = match v {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((k.clone(), value))
        })
        .collect()
}
