//! Content generation: prompt building, text backend call and post-processing

pub mod client;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::errors::SitecastError;
use crate::models::template::{PromptStrategy, Template};
use crate::models::RowData;

/// Row fields enumerated into the user instruction of structured templates
pub const STRUCTURED_FIELDS: [&str; 8] = [
    "name",
    "description",
    "price",
    "image_url",
    "affiliate_url",
    "logo_url",
    "sub_domain",
    "meta_keywords",
];

const REQUIREMENTS: &str = "IMPORTANT REQUIREMENTS:\n\
- Output ONLY a complete, valid HTML document (no markdown, no code fences, no explanations).\n\
- Use TailwindCSS via CDN in <head> (https://cdn.tailwindcss.com).\n\
- Use Tailwind utility classes throughout.\n\
- Include a clear call-to-action linking to the affiliate URL.\n\
- Do not include <script> tags except the Tailwind CDN script.\n";

const FREEFORM_SYSTEM: &str = "You are an expert web developer. Produce a single, complete, \
valid HTML document for the request below. Output only the HTML, with no markdown, \
code fences or explanations.";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*([A-Za-z0-9_]+)\s*\}").expect("Invalid regex pattern"));

static FENCE_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```html\s*").expect("Invalid regex pattern"));

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*").expect("Invalid regex pattern"));

/// A chat-style text completion backend
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, SitecastError>;
}

/// Turns a template and a row into an HTML artifact
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn TextBackend>,
}

impl Generator {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    /// Generate the artifact for one row. The header snippet is not included.
    pub async fn generate(&self, template: &Template, row: &RowData) -> Result<String, SitecastError> {
        let (system, user) = build_prompt(template, row);
        debug!(
            "Generating artifact with template '{}' ({})",
            template.id,
            template.strategy.as_str()
        );

        let raw = self.backend.complete(&system, &user).await?;
        let artifact = strip_code_fences(&raw);
        if artifact.is_empty() {
            return Err(SitecastError::GenerationError(
                "text backend returned empty content".to_string(),
            ));
        }
        Ok(artifact)
    }
}

/// Build the (system, user) prompt pair for a row
pub fn build_prompt(template: &Template, row: &RowData) -> (String, String) {
    match template.strategy {
        PromptStrategy::Structured => {
            let system = format!("{}\n\n{}", template.prompt.trim_end(), REQUIREMENTS);
            let user = STRUCTURED_FIELDS
                .iter()
                .map(|field| {
                    let value = row.get(*field).map(|v| v.trim()).unwrap_or("");
                    format!("{}: {}", field, value)
                })
                .collect::<Vec<_>>()
                .join("\n");
            (system, user)
        }
        PromptStrategy::Freeform => (FREEFORM_SYSTEM.to_string(), hydrate(&template.prompt, row)),
    }
}

/// Replace `{field}` tokens with row values; unknown tokens are cleared
pub fn hydrate(prompt: &str, row: &RowData) -> String {
    PLACEHOLDER
        .replace_all(prompt, |caps: &regex::Captures| {
            row.get(&caps[1]).map(|v| v.trim().to_string()).unwrap_or_default()
        })
        .into_owned()
}

/// Drop markdown code fences around a generated document
pub fn strip_code_fences(text: &str) -> String {
    let text = FENCE_HTML.replace_all(text, "");
    FENCE.replace_all(&text, "").trim().to_string()
}

/// Insert `snippet` right before the first `</head>`.
///
/// Documents without `</head>` and blank snippets are returned unchanged.
pub fn inject_header(document: &str, snippet: &str) -> String {
    let snippet = snippet.trim();
    if snippet.is_empty() {
        return document.to_string();
    }
    match document.find("</head>") {
        Some(at) => {
            let mut out = String::with_capacity(document.len() + snippet.len() + 1);
            out.push_str(&document[..at]);
            out.push_str(snippet);
            out.push('\n');
            out.push_str(&document[at..]);
            out
        }
        None => document.to_string(),
    }
}
