//! Run-time execution of a [`CompiledTool`] over a per-run
//! [`ExecutionContext`].
//!
//! One execution is one task: pure steps run synchronously, `api_call` and
//! `ai_analysis` suspend the task under a bounded wait. The engine itself
//! holds only immutable configuration and shared clients, so any number of
//! runs may execute concurrently; cancelling a run is dropping its future,
//! which aborts the in-flight request without touching other runs.

mod context;
mod http;
mod inference;
mod report;
mod template;
mod transform;

pub use context::ExecutionContext;
pub use inference::{InferenceProvider, InferenceRequest, NoInference};
pub use report::ReportFormatter;

use crate::ast::Value;
use crate::compile::{CompiledStep, CompiledTool, StepKind};
use crate::error::{EvaluationError, StepError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-run resource bounds. Together with the formula nesting limit this
/// keeps CPU per task bounded no matter what a definition does.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    /// Maximum number of step executions in one run.
    pub max_steps: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self { max_steps: 256 }
    }
}

/// Per-step state machine: `pending → running → {completed | failed | skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub id: String,
    pub status: StepStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Everything a run produced: per-step outcomes, the accumulated context,
/// the final value and the failure (if any) that halted it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub failed_step: Option<String>,
    pub error: Option<StepError>,
    pub steps: Vec<StepReport>,
    pub result: Value,
    pub context: ExecutionContext,
    pub duration: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

pub struct Engine {
    client: reqwest::Client,
    inference: Arc<dyn InferenceProvider>,
    limits: EngineLimits,
}

pub struct EngineBuilder {
    client: Option<reqwest::Client>,
    inference: Arc<dyn InferenceProvider>,
    limits: EngineLimits,
}

impl EngineBuilder {
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_inference(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.inference = provider;
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            client: self.client.unwrap_or_default(),
            inference: self.inference,
            limits: self.limits,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// How control leaves a completed step.
enum Route {
    Sequential,
    Jump(usize),
}

/// Result of running one step: the value it wrote (if any), where control
/// goes next, and which declared-but-unchosen branch targets are shadowed.
enum Outcome {
    Completed {
        value: Option<Value>,
        route: Route,
        shadowed: Vec<usize>,
    },
    /// A switch with no matching case and no default: the step itself is
    /// skipped and control falls through.
    SkippedSelf,
}

impl Engine {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            client: None,
            inference: Arc::new(NoInference),
            limits: EngineLimits::default(),
        }
    }

    /// Executes the pipeline over a seeded context.
    ///
    /// Steps run in arena order unless a condition or switch redirects.
    /// A redirect selects among declared alternatives: the chosen target
    /// executes, the unchosen ones are marked skipped and sequential advance
    /// hops over them, so only the taken branch is ever evaluated. The first
    /// unrecovered failure halts the run with the partial context attached.
    pub async fn execute(&self, tool: &CompiledTool, mut context: ExecutionContext) -> RunReport {
        let started = Instant::now();
        let mut reports: Vec<StepReport> = tool
            .steps
            .iter()
            .map(|step| StepReport {
                id: step.id.clone(),
                status: StepStatus::Pending,
                duration: Duration::ZERO,
                error: None,
            })
            .collect();

        let mut cursor = if tool.steps.is_empty() { None } else { Some(0) };
        let mut executed = 0usize;
        let mut failure: Option<StepError> = None;
        let mut last_result: Option<Value> = None;

        while let Some(index) = cursor {
            if executed == self.limits.max_steps {
                failure = Some(StepError::StepLimitExceeded {
                    limit: self.limits.max_steps,
                });
                break;
            }
            executed += 1;

            let step = &tool.steps[index];
            reports[index].status = StepStatus::Running;
            tracing::debug!(step = %step.id, "step running");
            let step_started = Instant::now();

            match self.run_step(step, index, &context).await {
                Ok(Outcome::Completed {
                    value,
                    route,
                    shadowed,
                }) => {
                    reports[index].duration = step_started.elapsed();
                    reports[index].status = StepStatus::Completed;
                    for target in shadowed {
                        if reports[target].status == StepStatus::Pending {
                            tracing::debug!(step = %reports[target].id, "branch not taken");
                            reports[target].status = StepStatus::Skipped;
                        }
                    }
                    if let Some(value) = value {
                        context.insert(step.id.clone(), value.clone());
                        last_result = Some(value);
                    }
                    cursor = match route {
                        Route::Jump(target) => Some(target),
                        Route::Sequential => advance(&reports, index + 1),
                    };
                }
                Ok(Outcome::SkippedSelf) => {
                    reports[index].duration = step_started.elapsed();
                    reports[index].status = StepStatus::Skipped;
                    tracing::debug!(step = %step.id, "no case matched");
                    cursor = advance(&reports, index + 1);
                }
                Err(error) => {
                    reports[index].duration = step_started.elapsed();
                    reports[index].status = StepStatus::Failed;
                    reports[index].error = Some(error.to_string());
                    tracing::warn!(step = %step.id, error = %error, "step failed");
                    if step.kind.continues_on_error() {
                        // Absorbed: an explicit null marker, run continues.
                        context.insert(step.id.clone(), Value::Null);
                        cursor = advance(&reports, index + 1);
                    } else {
                        failure = Some(error);
                        break;
                    }
                }
            }
        }

        let duration = started.elapsed();
        let status = if failure.is_some() {
            RunStatus::Failed
        } else {
            // Steps never reached on a completed run were branched around.
            for report in &mut reports {
                if report.status == StepStatus::Pending {
                    report.status = StepStatus::Skipped;
                }
            }
            RunStatus::Completed
        };
        let failed_step = failure.as_ref().and_then(|e| e.step_id().map(String::from));

        tracing::info!(
            tool = %tool.id,
            ?status,
            steps = executed,
            ?duration,
            "run finished"
        );

        RunReport {
            status,
            failed_step,
            error: failure,
            result: last_result.unwrap_or_else(|| context.to_object()),
            steps: reports,
            context,
            duration,
        }
    }

    async fn run_step(
        &self,
        step: &CompiledStep,
        index: usize,
        context: &ExecutionContext,
    ) -> Result<Outcome, StepError> {
        let step_id = &step.id;

        match &step.kind {
            StepKind::Calculation { formula, bindings } => {
                let mut scope = crate::formula::Scope::default();
                for binding in bindings {
                    let value = context.get(&binding.key).cloned().ok_or_else(|| {
                        evaluation(step_id, EvaluationError::UnknownVariable(binding.key.clone()))
                    })?;
                    scope.insert(binding.name.clone(), value);
                }
                let value = formula.evaluate(&scope).map_err(|e| evaluation(step_id, e))?;
                Ok(sequential(Some(value)))
            }

            StepKind::Condition {
                predicate,
                then_next,
                else_next,
            } => {
                let verdict = match predicate
                    .evaluate(context.scope())
                    .map_err(|e| evaluation(step_id, e))?
                {
                    Value::Bool(b) => b,
                    other => {
                        return Err(evaluation(
                            step_id,
                            EvaluationError::TypeMismatch {
                                operation: "condition".to_string(),
                                expected: "bool".to_string(),
                                found: other,
                            },
                        ));
                    }
                };
                let (chosen, other) = if verdict {
                    (*then_next, *else_next)
                } else {
                    (*else_next, *then_next)
                };
                let route = chosen.map(Route::Jump).unwrap_or(Route::Sequential);
                let effective = chosen.unwrap_or(index + 1);
                let shadowed = other.into_iter().filter(|t| *t != effective).collect();
                Ok(Outcome::Completed {
                    value: Some(Value::Bool(verdict)),
                    route,
                    shadowed,
                })
            }

            StepKind::Switch {
                selector,
                cases,
                default_next,
            } => {
                let selected = selector
                    .evaluate(context.scope())
                    .map_err(|e| evaluation(step_id, e))?;
                let matched = cases
                    .iter()
                    .position(|case| case.value.loosely_equals(&selected));

                let chosen = match matched {
                    Some(position) => Some(cases[position].next),
                    None => default_next.map(|target| Some(target)),
                };
                let Some(chosen) = chosen else {
                    return Ok(Outcome::SkippedSelf);
                };

                let route = chosen.map(Route::Jump).unwrap_or(Route::Sequential);
                let effective = chosen.unwrap_or(index + 1);
                let mut shadowed: Vec<usize> = Vec::new();
                for (position, case) in cases.iter().enumerate() {
                    if Some(position) == matched {
                        continue;
                    }
                    if let Some(target) = case.next {
                        if target != effective && !shadowed.contains(&target) {
                            shadowed.push(target);
                        }
                    }
                }
                if matched.is_some() {
                    if let Some(target) = default_next {
                        if *target != effective && !shadowed.contains(target) {
                            shadowed.push(*target);
                        }
                    }
                }

                Ok(Outcome::Completed {
                    value: Some(selected),
                    route,
                    shadowed,
                })
            }

            StepKind::Transform { input_key, op } => {
                let input = context.get(input_key).ok_or_else(|| StepError::Transform {
                    step_id: step_id.clone(),
                    message: format!("input '{}' is not in context", input_key),
                })?;
                let value = transform::apply(op, input, context.scope()).map_err(|e| {
                    StepError::Transform {
                        step_id: step_id.clone(),
                        message: e.to_string(),
                    }
                })?;
                Ok(sequential(Some(value)))
            }

            StepKind::ApiCall(call) => {
                let value =
                    http::execute_call(&self.client, step_id, call, context.scope()).await?;
                Ok(sequential(Some(value)))
            }

            StepKind::AiAnalysis(analysis) => {
                let prompt = template::substitute(&analysis.prompt, context.scope())
                    .map_err(|e| evaluation(step_id, e))?;
                let system = analysis
                    .system
                    .as_deref()
                    .map(|s| template::substitute(s, context.scope()))
                    .transpose()
                    .map_err(|e| evaluation(step_id, e))?;

                let request = InferenceRequest { prompt, system };
                let bound = Duration::from_millis(analysis.timeout_ms);
                let reply = match tokio::time::timeout(bound, self.inference.infer(request)).await {
                    Ok(Ok(text)) => text,
                    Ok(Err(err)) => {
                        return Err(StepError::Inference {
                            step_id: step_id.clone(),
                            message: err.0,
                        });
                    }
                    Err(_) => {
                        return Err(StepError::Timeout {
                            step_id: step_id.clone(),
                            limit_ms: analysis.timeout_ms,
                        });
                    }
                };
                Ok(sequential(Some(http::parse_body(reply))))
            }
        }
    }
}

/// First non-skipped step at or after `from`, or `None` when the run is done.
fn advance(reports: &[StepReport], from: usize) -> Option<usize> {
    let mut next = from;
    while next < reports.len() && reports[next].status == StepStatus::Skipped {
        next += 1;
    }
    (next < reports.len()).then_some(next)
}

fn sequential(value: Option<Value>) -> Outcome {
    Outcome::Completed {
        value,
        route: Route::Sequential,
        shadowed: Vec::new(),
    }
}

fn evaluation(step_id: &str, source: EvaluationError) -> StepError {
    StepError::Evaluation {
        step_id: step_id.to_string(),
        source,
    }
}
