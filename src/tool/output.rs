use serde::{Deserialize, Serialize};
use std::fmt;

/// How a tool presents its final value.
///
/// `table` and `card` require a non-empty `field_mappings` list; this is
/// checked when the tool compiles and again by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    // No `skip_serializing_if` here: this struct is embedded in the compiled
    // artifact, and bincode cannot decode skipped fields.
    #[serde(default)]
    pub field_mappings: Option<Vec<FieldMapping>>,
    #[serde(default)]
    pub sections: Option<Vec<OutputSection>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
    Table,
    Card,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Table => "table",
            OutputFormat::Card => "card",
        };
        write!(f, "{}", name)
    }
}

/// Projects one result key into a labeled, formatted display element.
/// Declared order is column/row order and is preserved through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub field_id: String,
    pub label: String,
    #[serde(default)]
    pub format: DisplayFormat,
}

/// Display coercion applied to a mapped value. Coercion never fails; a value
/// that does not fit its declared format falls back to its plain string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    Currency,
    Date,
    Percentage,
    Number,
    Boolean,
    #[default]
    Text,
}

/// A titled group of mapped fields, honored by the `markdown` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSection {
    pub title: String,
    #[serde(default)]
    pub field_ids: Vec<String>,
}
