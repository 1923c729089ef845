//! The test/run harness: input validation, context seeding, execute and
//! render orchestration, and the structured responses both caller surfaces
//! return.
//!
//! Two surfaces with different error contracts share one execution path:
//! `test_tool` is for authors and reports every failure verbatim;
//! `run_published` is for end users and masks authoring detail behind an
//! opaque message. Each invocation owns its context; nothing is shared
//! across concurrent calls.

mod validate;

pub use validate::validate_input;

use crate::compile::{CompiledTool, ToolCompiler};
use crate::engine::{Engine, ExecutionContext, RunReport};
use crate::error::{RunError, StoreError};
use crate::render::{render, RenderedOutput};
use crate::tool::{ToolDraft, ToolStatus};
use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Instant;

/// Read-only access to persisted tool snapshots. The store is the
/// persistence seam; the engine never writes through it.
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// Any snapshot by id, regardless of lifecycle status.
    async fn fetch_draft(&self, draft_id: &str) -> Result<ToolDraft, StoreError>;

    /// A published snapshot by id; drafts and testing tools are not
    /// servable on the end-user path.
    async fn fetch_published(&self, tool_id: &str) -> Result<ToolDraft, StoreError>;
}

/// In-memory store for tests and the CLI.
#[derive(Default)]
pub struct MemoryToolStore {
    tools: RwLock<AHashMap<String, ToolDraft>>,
}

impl MemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, draft: ToolDraft) {
        self.tools
            .write()
            .expect("store lock poisoned")
            .insert(draft.id.clone(), draft);
    }
}

#[async_trait]
impl ToolStore for MemoryToolStore {
    async fn fetch_draft(&self, draft_id: &str) -> Result<ToolDraft, StoreError> {
        self.tools
            .read()
            .expect("store lock poisoned")
            .get(draft_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(draft_id.to_string()))
    }

    async fn fetch_published(&self, tool_id: &str) -> Result<ToolDraft, StoreError> {
        let draft = self.fetch_draft(tool_id).await?;
        if draft.status == ToolStatus::Published {
            Ok(draft)
        } else {
            Err(StoreError::NotPublished(tool_id.to_string()))
        }
    }
}

/// Response of the author-facing test surface. Serializes to the JSON shape
/// `{success, result?, error?, executionTimeMs}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RenderedOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Response of the end-user run surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRun {
    pub outputs: RenderedOutput,
    pub duration_ms: u64,
}

/// Rendered output plus the full report, for callers holding a precompiled
/// tool.
#[derive(Debug, Clone)]
pub struct CompiledRun {
    pub output: RenderedOutput,
    pub report: RunReport,
}

pub struct ToolRunner<S> {
    engine: Engine,
    store: S,
}

impl<S: ToolStore> ToolRunner<S> {
    pub fn new(engine: Engine, store: S) -> Self {
        Self { engine, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a draft against test data for its author.
    ///
    /// Compiles fresh so definition defects (including output configuration
    /// errors) surface verbatim. Never panics and never returns a raw
    /// failure: every outcome is a structured result.
    pub async fn test_tool(&self, draft_id: &str, test_data: &serde_json::Value) -> TestRunResult {
        let started = Instant::now();
        match self.test_inner(draft_id, test_data).await {
            Ok(output) => TestRunResult {
                success: true,
                result: Some(output),
                error: None,
                execution_time_ms: elapsed_ms(&started),
            },
            Err(message) => TestRunResult {
                success: false,
                result: None,
                error: Some(message),
                execution_time_ms: elapsed_ms(&started),
            },
        }
    }

    async fn test_inner(
        &self,
        draft_id: &str,
        test_data: &serde_json::Value,
    ) -> Result<RenderedOutput, String> {
        let draft = self
            .store
            .fetch_draft(draft_id)
            .await
            .map_err(|e| e.to_string())?;
        let tool = ToolCompiler::new(draft)
            .compile()
            .map_err(|e| e.to_string())?;
        let seed = validate_input(&tool.fields, test_data).map_err(|e| e.to_string())?;
        let report = self
            .engine
            .execute(&tool, ExecutionContext::seeded(seed))
            .await;
        if let Some(error) = report.error {
            return Err(error.to_string());
        }
        render(&report.result, Some(&tool.output)).map_err(|e| e.to_string())
    }

    /// Runs a published tool for an end user. Authoring-time configuration
    /// defects are masked; validation and step failures pass through so the
    /// user can correct their input.
    pub async fn run_published(
        &self,
        tool_id: &str,
        input: &serde_json::Value,
    ) -> Result<PublishedRun, RunError> {
        let started = Instant::now();
        let draft = self.store.fetch_published(tool_id).await?;
        let tool = ToolCompiler::new(draft).compile()?;
        let run = self.run_compiled(&tool, input).await?;
        Ok(PublishedRun {
            outputs: run.output,
            duration_ms: elapsed_ms(&started),
        })
    }

    /// The zero-store path: one compiled tool, any number of concurrent
    /// runs.
    pub async fn run_compiled(
        &self,
        tool: &CompiledTool,
        input: &serde_json::Value,
    ) -> Result<CompiledRun, RunError> {
        let seed = validate_input(&tool.fields, input)?;
        let report = self
            .engine
            .execute(tool, ExecutionContext::seeded(seed))
            .await;
        if let Some(error) = report.error.clone() {
            return Err(RunError::Step(error));
        }
        let output = render(&report.result, Some(&tool.output))?;
        Ok(CompiledRun { output, report })
    }
}

fn elapsed_ms(started: &Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
