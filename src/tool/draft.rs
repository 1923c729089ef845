use super::{FormField, LogicStep, OutputConfig};
use serde::{Deserialize, Serialize};

/// The persisted definition of a tool: input form, logic pipeline and output
/// view.
///
/// The engine consumes an immutable snapshot of this structure at execution
/// time; authoring, persistence and the publishing workflow live elsewhere.
/// All arrays preserve their declared order through serialization; ordering
/// is semantically meaningful (display order, case-match priority, column
/// order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDraft {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: ToolStatus,
    #[serde(default)]
    pub input_config: Vec<FormField>,
    #[serde(default)]
    pub logic_config: Vec<LogicStep>,
    #[serde(default)]
    pub output_config: OutputConfig,
}

/// Author-driven lifecycle; the engine never advances it, it only requires
/// `Published` on the end-user run path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    #[default]
    Draft,
    Testing,
    Published,
}
