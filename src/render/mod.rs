//! Rendering of a run's final value into its declared presentation format.
//!
//! The renderer is a pure projection: it never mutates the value, never
//! performs I/O and never panics on malformed data. Shape defects in the
//! output configuration (`table`/`card` without mappings) surface as
//! [`ConfigError`]; holes in the data render as an explicit placeholder.

mod format;
mod markdown;

pub use format::MISSING_PLACEHOLDER;

use crate::ast::Value;
use crate::error::ConfigError;
use crate::tool::{FieldMapping, OutputConfig, OutputFormat};
use markdown::escape_html;
use serde::{Deserialize, Serialize};

/// A rendered result, tagged by its presentation format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum RenderedOutput {
    Text { content: String },
    Json { content: String },
    Markdown { html: String },
    Table { columns: Vec<String>, rows: Vec<Vec<String>> },
    Card { items: Vec<CardItem> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardItem {
    pub label: String,
    pub value: String,
}

/// Maps the final value into the declared output format. Absent config
/// defaults to `text`.
pub fn render(result: &Value, config: Option<&OutputConfig>) -> Result<RenderedOutput, ConfigError> {
    let Some(config) = config else {
        return Ok(render_text(result));
    };

    match config.format {
        OutputFormat::Text => Ok(render_text(result)),

        OutputFormat::Json => Ok(RenderedOutput::Json {
            content: serde_json::to_string_pretty(&result.to_json()).unwrap_or_default(),
        }),

        OutputFormat::Markdown => Ok(RenderedOutput::Markdown {
            html: render_markdown_output(result, config),
        }),

        OutputFormat::Table => {
            let mappings = required_mappings(config)?;
            let rows = match result {
                Value::Array(items) => items.iter().map(|item| table_row(item, mappings)).collect(),
                single => vec![table_row(single, mappings)],
            };
            Ok(RenderedOutput::Table {
                columns: mappings.iter().map(|m| m.label.clone()).collect(),
                rows,
            })
        }

        OutputFormat::Card => {
            let mappings = required_mappings(config)?;
            let items = mappings
                .iter()
                .map(|mapping| CardItem {
                    label: mapping.label.clone(),
                    value: mapped_value(result, mapping),
                })
                .collect();
            Ok(RenderedOutput::Card { items })
        }
    }
}

fn render_text(result: &Value) -> RenderedOutput {
    let content = match result {
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        }
        scalar => scalar.to_display_string(),
    };
    RenderedOutput::Text { content }
}

/// Markdown over a plain value renders the value's text; declared sections
/// over an object result render as `<h2>` groups of mapped fields.
fn render_markdown_output(result: &Value, config: &OutputConfig) -> String {
    let sections = config.sections.as_deref().unwrap_or_default();
    if sections.is_empty() || !matches!(result, Value::Object(_)) {
        return markdown::render_markdown(&result.to_display_string());
    }

    let mappings = config.field_mappings.as_deref().unwrap_or_default();
    let mut html = Vec::new();
    for section in sections {
        html.push(format!("<h2>{}</h2>", escape_html(&section.title)));
        for field_id in &section.field_ids {
            let mapping = mappings.iter().find(|m| &m.field_id == field_id);
            let label = mapping.map(|m| m.label.as_str()).unwrap_or(field_id);
            let value = match mapping {
                Some(mapping) => mapped_value(result, mapping),
                None => lookup(result, field_id)
                    .map(|v| v.to_display_string())
                    .unwrap_or_else(|| MISSING_PLACEHOLDER.to_string()),
            };
            html.push(format!(
                "<p><strong>{}:</strong> {}</p>",
                escape_html(label),
                escape_html(&value)
            ));
        }
    }
    html.join("\n")
}

fn required_mappings(config: &OutputConfig) -> Result<&[FieldMapping], ConfigError> {
    match config.field_mappings.as_deref() {
        Some(mappings) if !mappings.is_empty() => Ok(mappings),
        _ => Err(ConfigError::MissingFieldMappings {
            format: config.format.to_string(),
        }),
    }
}

fn table_row(item: &Value, mappings: &[FieldMapping]) -> Vec<String> {
    mappings
        .iter()
        .map(|mapping| mapped_value(item, mapping))
        .collect()
}

fn mapped_value(source: &Value, mapping: &FieldMapping) -> String {
    match lookup(source, &mapping.field_id) {
        Some(value) => format::coerce(value, mapping.format),
        None => MISSING_PLACEHOLDER.to_string(),
    }
}

fn lookup<'a>(source: &'a Value, key: &str) -> Option<&'a Value> {
    match source {
        Value::Object(map) => map.get(key),
        _ => None,
    }
}
