//! Common test utilities for building tool definitions and inputs.
use async_trait::async_trait;
use dougu::error::InferenceError;
use dougu::prelude::*;
use dougu::tool::{
    ApiCallConfig, BindingSource, CalculationConfig, ConditionConfig, HttpMethod, SelectOption,
    SwitchCase, SwitchConfig, VariableBinding,
};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[allow(dead_code)]
pub fn number_field(id: &str, label: &str, required: bool) -> FormField {
    FormField {
        id: id.to_string(),
        field_type: FieldType::Number,
        label: label.to_string(),
        placeholder: None,
        required,
        default_value: None,
        options: None,
    }
}

#[allow(dead_code)]
pub fn text_field(id: &str, label: &str, required: bool) -> FormField {
    FormField {
        id: id.to_string(),
        field_type: FieldType::Text,
        label: label.to_string(),
        placeholder: None,
        required,
        default_value: None,
        options: None,
    }
}

#[allow(dead_code)]
pub fn select_field(id: &str, label: &str, options: &[(&str, &str)]) -> FormField {
    FormField {
        id: id.to_string(),
        field_type: FieldType::Select,
        label: label.to_string(),
        placeholder: None,
        required: true,
        default_value: None,
        options: Some(
            options
                .iter()
                .map(|(label, value)| SelectOption {
                    label: label.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        ),
    }
}

#[allow(dead_code)]
pub fn bind_field(name: &str, field_id: &str) -> VariableBinding {
    VariableBinding {
        name: name.to_string(),
        source: BindingSource::Field {
            field_id: field_id.to_string(),
        },
    }
}

#[allow(dead_code)]
pub fn bind_step(name: &str, step_id: &str) -> VariableBinding {
    VariableBinding {
        name: name.to_string(),
        source: BindingSource::Step {
            step_id: step_id.to_string(),
        },
    }
}

#[allow(dead_code)]
pub fn calculation(id: &str, formula: &str, variables: Vec<VariableBinding>) -> LogicStep {
    LogicStep {
        id: id.to_string(),
        config: StepConfig::Calculation(CalculationConfig {
            formula: formula.to_string(),
            variables,
        }),
    }
}

#[allow(dead_code)]
pub fn condition(
    id: &str,
    expression: &str,
    then_id: Option<&str>,
    else_id: Option<&str>,
) -> LogicStep {
    LogicStep {
        id: id.to_string(),
        config: StepConfig::Condition(ConditionConfig {
            expression: expression.to_string(),
            then_step_id: then_id.map(String::from),
            else_step_id: else_id.map(String::from),
        }),
    }
}

#[allow(dead_code)]
pub fn switch(
    id: &str,
    selector: &str,
    cases: &[(serde_json::Value, Option<&str>)],
    default_id: Option<&str>,
) -> LogicStep {
    LogicStep {
        id: id.to_string(),
        config: StepConfig::Switch(SwitchConfig {
            selector: selector.to_string(),
            cases: cases
                .iter()
                .map(|(value, next)| SwitchCase {
                    value: value.clone(),
                    next_step_id: next.map(String::from),
                })
                .collect(),
            default_step_id: default_id.map(String::from),
        }),
    }
}

#[allow(dead_code)]
pub fn api_call(id: &str, url: &str, timeout_ms: u64, continue_on_error: bool) -> LogicStep {
    LogicStep {
        id: id.to_string(),
        config: StepConfig::ApiCall(ApiCallConfig {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms,
            continue_on_error,
        }),
    }
}

#[allow(dead_code)]
pub fn draft(id: &str, fields: Vec<FormField>, steps: Vec<LogicStep>) -> ToolDraft {
    ToolDraft {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        category: String::new(),
        status: ToolStatus::Draft,
        input_config: fields,
        logic_config: steps,
        output_config: OutputConfig::default(),
    }
}

/// Two number fields, one calculation: `subtotal * tipPercentage / 100`.
#[allow(dead_code)]
pub fn tip_draft() -> ToolDraft {
    draft(
        "tip",
        vec![
            number_field("subtotal", "Subtotal", true),
            number_field("tipPercentage", "Tip %", true),
        ],
        vec![calculation(
            "tip_amount",
            "subtotal * tipPercentage / 100",
            vec![
                bind_field("subtotal", "subtotal"),
                bind_field("tipPercentage", "tipPercentage"),
            ],
        )],
    )
}

/// A condition over `amount` routing to a `premium` or a `standard` step.
#[allow(dead_code)]
pub fn branch_draft() -> ToolDraft {
    draft(
        "tiering",
        vec![number_field("amount", "Amount", true)],
        vec![
            condition(
                "tier_check",
                "amount > 100",
                Some("premium"),
                Some("standard"),
            ),
            calculation("premium", "'premium'", vec![]),
            calculation("standard", "'standard'", vec![]),
        ],
    )
}

#[allow(dead_code)]
pub fn compile(definition: ToolDraft) -> CompiledTool {
    ToolCompiler::new(definition)
        .compile()
        .expect("definition should compile")
}

#[allow(dead_code)]
pub async fn run(tool: &CompiledTool, engine: &Engine, input: serde_json::Value) -> RunReport {
    let seed = validate_input(&tool.fields, &input).expect("input should validate");
    engine.execute(tool, ExecutionContext::seeded(seed)).await
}

/// Inference mock that counts invocations and replies with a fixed text.
pub struct CountingProvider {
    calls: AtomicUsize,
    reply: String,
}

impl CountingProvider {
    #[allow(dead_code)]
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        })
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceProvider for CountingProvider {
    async fn infer(
        &self,
        _request: InferenceRequest,
    ) -> std::result::Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Binds a local listener that accepts connections and never responds, for
/// timeout tests.
#[allow(dead_code)]
pub fn never_responding_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            if let Ok(stream) = stream {
                held.push(stream);
            }
        }
    });
    format!("http://{}/slow", addr)
}
