use crate::ast::Value;
use thiserror::Error;

/// Errors produced while parsing or evaluating a formula.
///
/// Parse-time variants (`Syntax`, `DisallowedToken`, `NestingTooDeep`) surface
/// when a tool is compiled; the rest surface during a run and are attributed
/// to the originating step by the executor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("disallowed token '{0}' in formula")]
    DisallowedToken(String),

    #[error("variable '{0}' is not bound in the current scope")]
    UnknownVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("formula nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize },

    #[error(
        "type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("operation '{operation}' produced a non-finite number")]
    NonFinite { operation: String },
}

/// Definition shape defects around output configuration. An authoring-time
/// concern: shown verbatim through `test_tool`, masked for end users of a
/// published tool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("output format '{format}' requires at least one field mapping")]
    MissingFieldMappings { format: String },

    #[error("select field '{0}' must declare a non-empty options list")]
    OptionsRequired(String),

    #[error("field '{0}' declares options but is not a select field")]
    OptionsNotAllowed(String),
}

/// Errors that can occur while compiling a `ToolDraft` into a `CompiledTool`.
///
/// These are save-time defects in the authored definition. A draft that
/// compiles cleanly cannot loop forever or route to unknown ids at run time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("duplicate field id '{0}' in input config")]
    DuplicateFieldId(String),

    #[error("duplicate step id '{0}' in logic config")]
    DuplicateStepId(String),

    #[error("step id '{0}' collides with a form field id")]
    StepIdCollidesWithField(String),

    #[error("step '{step_id}' routes to unknown step '{target}'")]
    UnknownTarget { step_id: String, target: String },

    #[error("step '{step_id}' binds '{name}' to unknown source '{source_name}'")]
    UnknownBinding {
        step_id: String,
        name: String,
        source_name: String,
    },

    #[error("invalid formula in step '{step_id}': {source}")]
    Formula {
        step_id: String,
        #[source]
        source: EvaluationError,
    },

    #[error(
        "formula in step '{step_id}' references '{name}', which is neither a field, a step, nor a declared variable"
    )]
    UnboundName { step_id: String, name: String },

    #[error("control flow cycle detected through step '{0}'")]
    CyclicFlow(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A single defect found while validating submitted input against the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub problem: InputProblem,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputProblem {
    #[error("required but missing")]
    Missing,

    #[error("expected a {expected}")]
    WrongType { expected: &'static str },

    #[error("'{value}' is not one of the declared options")]
    UnknownOption { value: String },

    #[error("not a valid {expected}")]
    InvalidFormat { expected: &'static str },
}

/// Input validation failure, naming every offending field. Raised before any
/// step runs.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid input: {}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// The ids of all fields that failed validation.
    pub fn field_names(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.problem))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failure attributed to a single step during a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("step '{step_id}' failed to evaluate: {source}")]
    Evaluation {
        step_id: String,
        #[source]
        source: EvaluationError,
    },

    #[error("step '{step_id}' transform failed: {message}")]
    Transform { step_id: String, message: String },

    #[error("step '{step_id}' request failed{}: {message}", format_status(.status))]
    Http {
        step_id: String,
        status: Option<u16>,
        message: String,
    },

    #[error("step '{step_id}' timed out after {limit_ms}ms")]
    Timeout { step_id: String, limit_ms: u64 },

    #[error("step '{step_id}' inference failed: {message}")]
    Inference { step_id: String, message: String },

    #[error("run exceeded the limit of {limit} step executions")]
    StepLimitExceeded { limit: usize },
}

impl StepError {
    /// The id of the failing step, when the error is attributable to one.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            StepError::Evaluation { step_id, .. }
            | StepError::Transform { step_id, .. }
            | StepError::Http { step_id, .. }
            | StepError::Timeout { step_id, .. }
            | StepError::Inference { step_id, .. } => Some(step_id),
            StepError::StepLimitExceeded { .. } => None,
        }
    }
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

/// Errors that can occur when converting a custom authoring format into a
/// `ToolDraft`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("invalid tool definition: {0}")]
    Invalid(String),
}

/// Failure reported by an inference provider.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct InferenceError(pub String);

/// Failures from the tool snapshot store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("tool '{0}' not found")]
    NotFound(String),

    #[error("tool '{0}' is not published")]
    NotPublished(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors loading or saving a compiled artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("could not encode compiled tool: {0}")]
    Encode(String),

    #[error("could not decode compiled tool: {0}")]
    Decode(String),

    #[error("artifact i/o failed for '{path}': {message}")]
    Io { path: String, message: String },
}

/// Top-level failure of a published-tool run.
#[derive(Error, Debug, Clone)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compile(CompileError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Step(#[from] StepError),

    /// Replaces `ConfigError`-class failures on the published path so
    /// authoring detail never reaches an end user.
    #[error("tool is misconfigured; contact the tool author")]
    Misconfigured,
}

impl From<CompileError> for RunError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Config(_) => RunError::Misconfigured,
            other => RunError::Compile(other),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(_: ConfigError) -> Self {
        RunError::Misconfigured
    }
}
