//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types from the dougu crate. Import this
//! module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use dougu::prelude::*;
//!
//! # async fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/tool.json")?;
//! let draft: ToolDraft = serde_json::from_str(&json)?;
//!
//! let tool = ToolCompiler::new(draft).compile()?;
//! let engine = Engine::new();
//! let seed = validate_input(&tool.fields, &serde_json::json!({}))?;
//! let report = engine.execute(&tool, ExecutionContext::seeded(seed)).await;
//!
//! println!("{}", ReportFormatter::format(&report));
//! # Ok(())
//! # }
//! ```

// Compilation and execution
pub use crate::compile::{CompiledTool, ToolCompiler};
pub use crate::engine::{
    Engine, EngineLimits, ExecutionContext, InferenceProvider, InferenceRequest, NoInference,
    ReportFormatter, RunReport, RunStatus, StepStatus,
};

// Definition model
pub use crate::tool::{
    FieldType, FormField, IntoToolDraft, LogicStep, OutputConfig, OutputFormat, StepConfig,
    ToolDraft, ToolStatus,
};

// Rendering
pub use crate::render::{render, RenderedOutput};

// Harness
pub use crate::runner::{validate_input, MemoryToolStore, TestRunResult, ToolRunner, ToolStore};

// Expression layer
pub use crate::ast::{Expr, Value};
pub use crate::formula::Formula;

// Error types
pub use crate::error::{CompileError, ConfigError, EvaluationError, StepError, ValidationError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
