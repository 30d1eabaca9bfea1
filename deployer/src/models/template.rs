//! Template models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RowData;

/// How a template's prompt is combined with a row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStrategy {
    /// Fixed row fields are enumerated into the user instruction
    #[default]
    Structured,

    /// `{field}` placeholders inside the prompt are hydrated with row values
    Freeform,
}

impl PromptStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStrategy::Structured => "structured",
            PromptStrategy::Freeform => "freeform",
        }
    }
}

/// A generation template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,

    /// System prompt (structured) or prompt body with placeholders (freeform)
    pub prompt: String,

    /// Row fields that must be present and non-blank, in display order
    #[serde(default)]
    pub required_fields: Vec<String>,

    #[serde(default)]
    pub strategy: PromptStrategy,

    pub created_at: DateTime<Utc>,
}

impl Template {
    /// Required fields that are absent or blank in `row`
    pub fn missing_fields(&self, row: &RowData) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.required_fields
            .iter()
            .filter(|field| seen.insert(field.as_str()))
            .filter(|field| {
                row.get(field.as_str())
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }
}
