//! Save-time compilation of a [`ToolDraft`] into an executable [`CompiledTool`].
//!
//! A draft is validated and lowered exactly once: ids are checked for
//! uniqueness, shape invariants are enforced, every formula parses to its AST,
//! binding and `next` targets resolve to arena indices, and the unrolled
//! control-flow graph is proven acyclic. The resulting `CompiledTool` is
//! immutable and can serve any number of concurrent runs.

mod artifact;
mod graph;

use crate::ast::Value;
use crate::error::{CompileError, ConfigError};
use crate::formula::{Formula, MAX_NESTING_DEPTH};
use crate::tool::{
    FieldType, FormField, HttpMethod, OutputConfig, OutputFormat, StepConfig, ToolDraft,
    ToolStatus, TransformOp,
};
use ahash::AHashMap;
use graph::FlowGraph;
use serde::{Deserialize, Serialize};

/// A tool definition after save-time validation and lowering.
///
/// Formulas are parsed, branch targets are arena indices and the flow is
/// known to terminate. Runs borrow this immutably, so one compiled tool can
/// serve concurrent executions without locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTool {
    pub id: String,
    pub name: String,
    pub status: ToolStatus,
    pub fields: Vec<CompiledField>,
    pub steps: Vec<CompiledStep>,
    pub output: OutputConfig,
}

impl CompiledTool {
    /// Position of a step in the arena by id.
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }
}

/// The validation-relevant view of a form field. The declared default is
/// already converted to a runtime [`Value`] and `options` is reduced to the
/// accepted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledField {
    pub id: String,
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub default: Option<Value>,
    pub options: Vec<String>,
}

/// One arena entry of the compiled pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledStep {
    pub id: String,
    pub kind: StepKind,
}

/// The lowered per-type payload. Branch targets are arena indices; `None`
/// means "fall through to the next sequential step".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepKind {
    Calculation {
        formula: Formula,
        bindings: Vec<Binding>,
    },
    Condition {
        predicate: Formula,
        then_next: Option<usize>,
        else_next: Option<usize>,
    },
    Switch {
        selector: Formula,
        cases: Vec<CompiledCase>,
        default_next: Option<usize>,
    },
    Transform {
        input_key: String,
        op: CompiledTransform,
    },
    ApiCall(CompiledApiCall),
    AiAnalysis(CompiledAiAnalysis),
}

impl StepKind {
    /// Whether a failure of this step is absorbed into context instead of
    /// halting the run. Only the I/O step types can opt in.
    pub fn continues_on_error(&self) -> bool {
        match self {
            StepKind::ApiCall(call) => call.continue_on_error,
            StepKind::AiAnalysis(analysis) => analysis.continue_on_error,
            _ => false,
        }
    }
}

/// A local variable of a calculation, resolved to its context key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledCase {
    pub value: Value,
    pub next: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledTransform {
    Uppercase,
    Lowercase,
    Trim,
    Round { decimals: u32 },
    Map { formula: Formula },
    Filter { predicate: Formula },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledApiCall {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout_ms: u64,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledAiAnalysis {
    pub prompt: String,
    pub system: Option<String>,
    pub timeout_ms: u64,
    pub continue_on_error: bool,
}

pub struct ToolCompiler {
    draft: ToolDraft,
    max_formula_depth: usize,
    ast_cache: AHashMap<String, Formula>,
}

pub struct ToolCompilerBuilder {
    draft: ToolDraft,
    max_formula_depth: usize,
}

impl ToolCompilerBuilder {
    pub fn new(draft: ToolDraft) -> Self {
        Self {
            draft,
            max_formula_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Overrides the formula nesting-depth limit.
    pub fn with_max_formula_depth(mut self, max_depth: usize) -> Self {
        self.max_formula_depth = max_depth;
        self
    }

    pub fn build(self) -> ToolCompiler {
        ToolCompiler {
            draft: self.draft,
            max_formula_depth: self.max_formula_depth,
            ast_cache: AHashMap::new(),
        }
    }
}

impl ToolCompiler {
    pub fn new(draft: ToolDraft) -> Self {
        Self::builder(draft).build()
    }

    pub fn builder(draft: ToolDraft) -> ToolCompilerBuilder {
        ToolCompilerBuilder::new(draft)
    }

    pub fn compile(mut self) -> Result<CompiledTool, CompileError> {
        let fields = self.compile_fields()?;
        check_output(&self.draft.output_config)?;

        let mut index_of: AHashMap<String, usize> = AHashMap::new();
        for (index, step) in self.draft.logic_config.iter().enumerate() {
            if fields.iter().any(|f| f.id == step.id) {
                return Err(CompileError::StepIdCollidesWithField(step.id.clone()));
            }
            if index_of.insert(step.id.clone(), index).is_some() {
                return Err(CompileError::DuplicateStepId(step.id.clone()));
            }
        }

        // Field ids and step ids share the context namespace; anything a
        // predicate or template names must resolve to one of them.
        let mut known: Vec<String> = fields.iter().map(|f| f.id.clone()).collect();
        known.extend(index_of.keys().cloned());

        let mut graph = FlowGraph::new(self.draft.logic_config.len());
        let mut steps = Vec::with_capacity(self.draft.logic_config.len());
        let logic = self.draft.logic_config.clone();
        for (index, step) in logic.iter().enumerate() {
            let kind = self.compile_step(step, index, &index_of, &known, &mut graph)?;
            steps.push(CompiledStep {
                id: step.id.clone(),
                kind,
            });
        }

        if let Some(on_cycle) = graph.find_cycle() {
            return Err(CompileError::CyclicFlow(steps[on_cycle].id.clone()));
        }

        Ok(CompiledTool {
            id: self.draft.id,
            name: self.draft.name,
            status: self.draft.status,
            fields,
            steps,
            output: self.draft.output_config,
        })
    }

    fn compile_fields(&self) -> Result<Vec<CompiledField>, CompileError> {
        let mut fields: Vec<CompiledField> = Vec::with_capacity(self.draft.input_config.len());
        for field in &self.draft.input_config {
            if fields.iter().any(|f| f.id == field.id) {
                return Err(CompileError::DuplicateFieldId(field.id.clone()));
            }
            fields.push(compile_field(field)?);
        }
        Ok(fields)
    }

    fn compile_step(
        &mut self,
        step: &crate::tool::LogicStep,
        index: usize,
        index_of: &AHashMap<String, usize>,
        known: &[String],
        graph: &mut FlowGraph,
    ) -> Result<StepKind, CompileError> {
        let step_id = &step.id;
        let sequential = index + 1;

        match &step.config {
            StepConfig::Calculation(config) => {
                let mut bindings = Vec::with_capacity(config.variables.len());
                for variable in &config.variables {
                    let key = variable.source.key();
                    if !known.iter().any(|name| name == key) {
                        return Err(CompileError::UnknownBinding {
                            step_id: step_id.clone(),
                            name: variable.name.clone(),
                            source_name: key.to_string(),
                        });
                    }
                    bindings.push(Binding {
                        name: variable.name.clone(),
                        key: key.to_string(),
                    });
                }
                let formula = self.parse_formula(step_id, &config.formula)?;
                let local: Vec<String> = bindings.iter().map(|b| b.name.clone()).collect();
                check_scope(step_id, &formula, &local)?;
                graph.add_edge(index, sequential);
                Ok(StepKind::Calculation { formula, bindings })
            }

            StepConfig::Condition(config) => {
                let predicate = self.parse_formula(step_id, &config.expression)?;
                check_scope(step_id, &predicate, known)?;
                let then_next = self.resolve_target(step_id, config.then_step_id.as_deref(), index_of)?;
                let else_next = self.resolve_target(step_id, config.else_step_id.as_deref(), index_of)?;
                graph.add_edge(index, then_next.unwrap_or(sequential));
                graph.add_edge(index, else_next.unwrap_or(sequential));
                Ok(StepKind::Condition {
                    predicate,
                    then_next,
                    else_next,
                })
            }

            StepConfig::Switch(config) => {
                let selector = self.parse_formula(step_id, &config.selector)?;
                check_scope(step_id, &selector, known)?;
                let mut cases = Vec::with_capacity(config.cases.len());
                for case in &config.cases {
                    let next = self.resolve_target(step_id, case.next_step_id.as_deref(), index_of)?;
                    graph.add_edge(index, next.unwrap_or(sequential));
                    cases.push(CompiledCase {
                        value: Value::from_json(case.value.clone()),
                        next,
                    });
                }
                let default_next =
                    self.resolve_target(step_id, config.default_step_id.as_deref(), index_of)?;
                // No match routes to the default, or falls through skipped.
                graph.add_edge(index, default_next.unwrap_or(sequential));
                Ok(StepKind::Switch {
                    selector,
                    cases,
                    default_next,
                })
            }

            StepConfig::Transform(config) => {
                let input_key = config.input.key().to_string();
                if !known.iter().any(|name| name == &input_key) {
                    return Err(CompileError::UnknownBinding {
                        step_id: step_id.clone(),
                        name: "input".to_string(),
                        source_name: input_key,
                    });
                }
                let op = match &config.operation {
                    TransformOp::Uppercase => CompiledTransform::Uppercase,
                    TransformOp::Lowercase => CompiledTransform::Lowercase,
                    TransformOp::Trim => CompiledTransform::Trim,
                    TransformOp::Round { decimals } => CompiledTransform::Round {
                        decimals: *decimals,
                    },
                    TransformOp::Map { formula } => {
                        let formula = self.parse_formula(step_id, formula)?;
                        check_scope(step_id, &formula, &element_scope(known))?;
                        CompiledTransform::Map { formula }
                    }
                    TransformOp::Filter { predicate } => {
                        let predicate = self.parse_formula(step_id, predicate)?;
                        check_scope(step_id, &predicate, &element_scope(known))?;
                        CompiledTransform::Filter { predicate }
                    }
                };
                graph.add_edge(index, sequential);
                Ok(StepKind::Transform { input_key, op })
            }

            StepConfig::ApiCall(config) => {
                graph.add_edge(index, sequential);
                Ok(StepKind::ApiCall(CompiledApiCall {
                    method: config.method,
                    url: config.url.clone(),
                    headers: config
                        .headers
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                    body: config.body.clone(),
                    timeout_ms: config.timeout_ms,
                    continue_on_error: config.continue_on_error,
                }))
            }

            StepConfig::AiAnalysis(config) => {
                graph.add_edge(index, sequential);
                Ok(StepKind::AiAnalysis(CompiledAiAnalysis {
                    prompt: config.prompt.clone(),
                    system: config.system.clone(),
                    timeout_ms: config.timeout_ms,
                    continue_on_error: config.continue_on_error,
                }))
            }
        }
    }

    /// Parses a formula through the per-source cache, so a source string
    /// shared by several steps is parsed once per compilation.
    fn parse_formula(&mut self, step_id: &str, source: &str) -> Result<Formula, CompileError> {
        if let Some(cached) = self.ast_cache.get(source) {
            return Ok(cached.clone());
        }
        let formula = Formula::parse_with_depth(source, self.max_formula_depth).map_err(|err| {
            CompileError::Formula {
                step_id: step_id.to_string(),
                source: err,
            }
        })?;
        self.ast_cache.insert(source.to_string(), formula.clone());
        Ok(formula)
    }

    fn resolve_target(
        &self,
        step_id: &str,
        target: Option<&str>,
        index_of: &AHashMap<String, usize>,
    ) -> Result<Option<usize>, CompileError> {
        match target {
            None => Ok(None),
            Some(id) => index_of
                .get(id)
                .copied()
                .map(Some)
                .ok_or_else(|| CompileError::UnknownTarget {
                    step_id: step_id.to_string(),
                    target: id.to_string(),
                }),
        }
    }
}

fn compile_field(field: &FormField) -> Result<CompiledField, CompileError> {
    let options = match (&field.field_type, &field.options) {
        (FieldType::Select, Some(options)) if !options.is_empty() => {
            options.iter().map(|o| o.value.clone()).collect()
        }
        (FieldType::Select, _) => {
            return Err(ConfigError::OptionsRequired(field.id.clone()).into());
        }
        (_, Some(_)) => {
            return Err(ConfigError::OptionsNotAllowed(field.id.clone()).into());
        }
        (_, None) => Vec::new(),
    };
    Ok(CompiledField {
        id: field.id.clone(),
        field_type: field.field_type,
        label: field.label.clone(),
        required: field.required,
        default: field.default_value.clone().map(Value::from_json),
        options,
    })
}

/// `table` and `card` are mapping-driven layouts; declaring one without
/// mappings is an authoring defect caught here, before the tool ever runs.
fn check_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if matches!(output.format, OutputFormat::Table | OutputFormat::Card) {
        let has_mappings = output
            .field_mappings
            .as_ref()
            .is_some_and(|mappings| !mappings.is_empty());
        if !has_mappings {
            return Err(ConfigError::MissingFieldMappings {
                format: output.format.to_string(),
            });
        }
    }
    Ok(())
}

fn check_scope(step_id: &str, formula: &Formula, allowed: &[String]) -> Result<(), CompileError> {
    for name in formula.variables() {
        if !allowed.iter().any(|known| known == &name) {
            return Err(CompileError::UnboundName {
                step_id: step_id.to_string(),
                name,
            });
        }
    }
    Ok(())
}

/// List transforms additionally bind the current element and its position.
fn element_scope(known: &[String]) -> Vec<String> {
    let mut scope = known.to_vec();
    scope.push("item".to_string());
    scope.push("index".to_string());
    scope
}
