use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One unit of a tool's logic pipeline.
///
/// Steps execute in declared order unless a `condition` or `switch` redirects
/// control. Each completed step writes exactly one context entry keyed by its
/// own `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicStep {
    pub id: String,
    #[serde(flatten)]
    pub config: StepConfig,
}

/// The per-type configuration payload. A proper sum type: a step can only
/// carry the fields its own type defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum StepConfig {
    Calculation(CalculationConfig),
    Condition(ConditionConfig),
    Switch(SwitchConfig),
    Transform(TransformConfig),
    ApiCall(ApiCallConfig),
    AiAnalysis(AiAnalysisConfig),
}

impl StepConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepConfig::Calculation(_) => "calculation",
            StepConfig::Condition(_) => "condition",
            StepConfig::Switch(_) => "switch",
            StepConfig::Transform(_) => "transform",
            StepConfig::ApiCall(_) => "api_call",
            StepConfig::AiAnalysis(_) => "ai_analysis",
        }
    }
}

/// Evaluates `formula` over the declared variable bindings and stores the
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationConfig {
    pub formula: String,
    #[serde(default)]
    pub variables: Vec<VariableBinding>,
}

/// Binds a local variable name to a context entry (a form field's value or an
/// earlier step's result).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,
    #[serde(flatten)]
    pub source: BindingSource,
}

/// Where a bound value comes from. Field and step ids share the context
/// namespace, but the authoring format distinguishes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSource {
    Field {
        #[serde(rename = "fieldId")]
        field_id: String,
    },
    Step {
        #[serde(rename = "stepId")]
        step_id: String,
    },
}

impl BindingSource {
    /// The context key this source resolves to.
    pub fn key(&self) -> &str {
        match self {
            BindingSource::Field { field_id } => field_id,
            BindingSource::Step { step_id } => step_id,
        }
    }
}

/// Routes control on a boolean expression. An unset branch falls through to
/// the next sequential step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_step_id: Option<String>,
}

/// Routes control on a selector value. Cases match in declared order; the
/// first match wins. With no match and no default the step is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    pub selector: String,
    pub cases: Vec<SwitchCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_step_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchCase {
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
}

/// A pure, deterministic data operation over one bound context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(flatten)]
    pub input: BindingSource,
    pub operation: TransformOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    Uppercase,
    Lowercase,
    Trim,
    Round {
        #[serde(default)]
        decimals: u32,
    },
    /// Maps each element of a list through a formula binding `item` and
    /// `index`.
    Map { formula: String },
    /// Keeps the elements of a list for which the predicate holds; binds
    /// `item` and `index`.
    Filter { predicate: String },
}

/// One outbound HTTP request. Method, URL, headers and body accept `{name}`
/// placeholders resolved from the execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallConfig {
    pub method: HttpMethod,
    pub url: String,
    /// BTreeMap keeps header serialization deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_api_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

/// Delegates to the external inference collaborator with a context-built
/// prompt. Same failure contract as `api_call`, with a larger default timeout
/// to accommodate inference latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysisConfig {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_ai_timeout_ms() -> u64 {
    30_000
}
