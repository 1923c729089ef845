//! # Dougu - Tool Pipeline Compilation and Execution Engine
//!
//! **Dougu** interprets user-authored "tools": a typed input form, a pipeline
//! of logic steps and an output view. Definitions are data, never code: the
//! engine safely evaluates arithmetic/boolean formulas against a per-run
//! variable scope, branches on conditions and switches, performs bounded
//! external calls and renders the final value into a declared presentation
//! format. There is no way for a definition to reach host code; formulas
//! parse into a closed, tagged AST and everything else is plain data.
//!
//! ## Core Workflow
//!
//! The engine operates on a canonical [`ToolDraft`](tool::ToolDraft) model
//! and splits work into a compile-once / run-many pipeline:
//!
//! 1.  **Load Your Definition**: Parse your persisted tool format into a
//!     `ToolDraft` (it is plain serde JSON), or implement
//!     [`IntoToolDraft`](tool::IntoToolDraft) for your own authoring structs.
//! 2.  **Compile**: [`ToolCompiler`](compile::ToolCompiler) validates the
//!     definition at save time: ids, shape invariants, formula grammar and
//!     an acyclic control-flow graph. The result is an immutable
//!     [`CompiledTool`](compile::CompiledTool).
//! 3.  **Execute**: [`Engine`](engine::Engine) runs the compiled pipeline
//!     over a per-run [`ExecutionContext`](engine::ExecutionContext). Runs
//!     are independent tasks and may execute concurrently.
//! 4.  **Render**: [`render`](render::render) maps the run's final value
//!     into text, JSON, safe markdown, a table or a card.
//!
//! The [`ToolRunner`](runner::ToolRunner) harness wires all four together
//! behind the `test_tool` / `run_published` surfaces.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dougu::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // 1. A tool definition: one number field, one calculation step.
//!     let draft: ToolDraft = serde_json::from_str(
//!         r#"{
//!             "id": "tip",
//!             "name": "Tip Calculator",
//!             "inputConfig": [
//!                 {"id": "subtotal", "type": "number", "label": "Subtotal", "required": true},
//!                 {"id": "tipPercentage", "type": "number", "label": "Tip %", "required": true}
//!             ],
//!             "logicConfig": [
//!                 {"id": "tip_amount", "type": "calculation", "config": {
//!                     "formula": "subtotal * tipPercentage / 100",
//!                     "variables": [
//!                         {"name": "subtotal", "fieldId": "subtotal"},
//!                         {"name": "tipPercentage", "fieldId": "tipPercentage"}
//!                     ]
//!                 }}
//!             ],
//!             "outputConfig": {"format": "text"}
//!         }"#,
//!     )?;
//!
//!     // 2. Compile once; this is where bad definitions are rejected.
//!     let tool = ToolCompiler::new(draft).compile()?;
//!
//!     // 3. Run against submitted input.
//!     let runner = ToolRunner::new(Engine::new(), MemoryToolStore::new());
//!     let input = serde_json::json!({"subtotal": 3, "tipPercentage": 10});
//!     let run = runner.run_compiled(&tool, &input).await?;
//!
//!     // 4. The rendered output.
//!     println!("{:?}", run.output);
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod compile;
pub mod engine;
pub mod error;
pub mod formula;
pub mod prelude;
pub mod render;
pub mod runner;
pub mod tool;
