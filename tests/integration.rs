//! End-to-end tests through the harness: compile, validate, execute, render
//! and the two caller surfaces.
mod common;
use common::*;
use dougu::compile::CompiledTool;
use dougu::error::{CompileError, ConfigError, RunError, StoreError};
use dougu::prelude::*;
use dougu::tool::{DisplayFormat, FieldMapping, OutputSection};
use pretty_assertions::assert_eq;

fn runner_with(drafts: Vec<ToolDraft>) -> ToolRunner<MemoryToolStore> {
    let store = MemoryToolStore::new();
    for draft in drafts {
        store.insert(draft);
    }
    ToolRunner::new(Engine::new(), store)
}

#[tokio::test]
async fn test_tool_returns_a_structured_success() {
    let runner = runner_with(vec![tip_draft()]);
    let result = runner
        .test_tool("tip", &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await;

    assert!(result.success);
    assert_eq!(result.error, None);
    assert_eq!(
        result.result,
        Some(RenderedOutput::Text {
            content: "0.3".to_string()
        })
    );
}

#[tokio::test]
async fn test_tool_response_serializes_camel_case() {
    let runner = runner_with(vec![tip_draft()]);
    let result = runner
        .test_tool("tip", &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await;

    let json = serde_json::to_value(&result).expect("serializes");
    assert!(json.get("executionTimeMs").is_some());
    assert_eq!(json.get("success"), Some(&serde_json::json!(true)));
}

#[tokio::test]
async fn missing_required_fields_are_all_named_and_nothing_runs() {
    let provider = CountingProvider::new("unused");
    let store = MemoryToolStore::new();
    let mut definition = tip_draft();
    definition.logic_config.insert(
        0,
        LogicStep {
            id: "precheck".to_string(),
            config: StepConfig::AiAnalysis(dougu::tool::AiAnalysisConfig {
                prompt: "hello".to_string(),
                system: None,
                timeout_ms: 1_000,
                continue_on_error: false,
            }),
        },
    );
    store.insert(definition);
    let engine = Engine::builder().with_inference(provider.clone()).build();
    let runner = ToolRunner::new(engine, store);

    let result = runner.test_tool("tip", &serde_json::json!({})).await;

    assert!(!result.success);
    let error = result.error.expect("validation error");
    assert!(error.contains("subtotal"));
    assert!(error.contains("tipPercentage"));
    // Validation short-circuits before the executor ever runs.
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn wrong_types_are_rejected_per_field() {
    let runner = runner_with(vec![tip_draft()]);
    let result = runner
        .test_tool(
            "tip",
            &serde_json::json!({"subtotal": "abc", "tipPercentage": 10}),
        )
        .await;

    assert!(!result.success);
    assert!(result.error.expect("type error").contains("subtotal"));
}

#[tokio::test]
async fn authors_see_configuration_errors_verbatim() {
    let mut definition = tip_draft();
    definition.output_config.format = OutputFormat::Table; // no mappings declared
    let runner = runner_with(vec![definition]);

    let result = runner
        .test_tool("tip", &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await;

    assert!(!result.success);
    assert!(result
        .error
        .expect("config error")
        .contains("requires at least one field mapping"));
}

#[tokio::test]
async fn published_runs_mask_configuration_errors() {
    let mut definition = tip_draft();
    definition.status = ToolStatus::Published;
    definition.output_config.format = OutputFormat::Table;
    let runner = runner_with(vec![definition]);

    let outcome = runner
        .run_published("tip", &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await;

    match outcome {
        Err(RunError::Misconfigured) => {
            let message = RunError::Misconfigured.to_string();
            assert!(!message.contains("field mapping"), "authoring detail leaked");
        }
        other => panic!("expected masked config error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn unpublished_tools_are_not_servable() {
    let runner = runner_with(vec![tip_draft()]); // status stays Draft
    let outcome = runner
        .run_published("tip", &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await;
    assert!(matches!(
        outcome,
        Err(RunError::Store(StoreError::NotPublished(_)))
    ));
}

#[tokio::test]
async fn run_published_returns_outputs_and_duration() {
    let mut definition = tip_draft();
    definition.status = ToolStatus::Published;
    let runner = runner_with(vec![definition]);

    let outcome = runner
        .run_published("tip", &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await
        .expect("published run succeeds");

    assert_eq!(
        outcome.outputs,
        RenderedOutput::Text {
            content: "0.3".to_string()
        }
    );
}

#[tokio::test]
async fn select_values_must_match_declared_options() {
    let definition = draft(
        "plan_picker",
        vec![select_field("plan", "Plan", &[("Basic", "basic"), ("Pro", "pro")])],
        vec![],
    );
    let runner = runner_with(vec![definition]);

    let result = runner
        .test_tool("plan_picker", &serde_json::json!({"plan": "enterprise"}))
        .await;
    assert!(!result.success);
    assert!(result.error.expect("option error").contains("enterprise"));
}

#[test]
fn compile_rejects_duplicate_and_colliding_ids() {
    let duplicated = draft(
        "dup",
        vec![
            number_field("x", "X", true),
            number_field("x", "X again", true),
        ],
        vec![],
    );
    assert!(matches!(
        ToolCompiler::new(duplicated).compile(),
        Err(CompileError::DuplicateFieldId(id)) if id == "x"
    ));

    let colliding = draft(
        "collide",
        vec![number_field("x", "X", true)],
        vec![calculation("x", "1", vec![])],
    );
    assert!(matches!(
        ToolCompiler::new(colliding).compile(),
        Err(CompileError::StepIdCollidesWithField(id)) if id == "x"
    ));
}

#[test]
fn compile_rejects_unknown_targets_and_cycles() {
    let dangling = draft(
        "dangling",
        vec![number_field("x", "X", true)],
        vec![condition("check", "x > 0", Some("nowhere"), None)],
    );
    assert!(matches!(
        ToolCompiler::new(dangling).compile(),
        Err(CompileError::UnknownTarget { target, .. }) if target == "nowhere"
    ));

    let looping = draft(
        "looping",
        vec![number_field("x", "X", true)],
        vec![
            condition("first", "x > 0", Some("second"), None),
            condition("second", "x > 1", Some("first"), None),
        ],
    );
    assert!(matches!(
        ToolCompiler::new(looping).compile(),
        Err(CompileError::CyclicFlow(_))
    ));
}

#[test]
fn compile_rejects_select_without_options() {
    let mut field = number_field("choice", "Choice", true);
    field.field_type = FieldType::Select;
    let definition = draft("bad_select", vec![field], vec![]);
    assert!(matches!(
        ToolCompiler::new(definition).compile(),
        Err(CompileError::Config(ConfigError::OptionsRequired(_)))
    ));
}

#[test]
fn compile_rejects_formula_referencing_unknown_names() {
    let definition = draft(
        "unbound",
        vec![number_field("x", "X", true)],
        vec![calculation("calc", "x + y", vec![bind_field("x", "x")])],
    );
    assert!(matches!(
        ToolCompiler::new(definition).compile(),
        Err(CompileError::UnboundName { name, .. }) if name == "y"
    ));
}

#[test]
fn draft_round_trip_preserves_order() {
    let mut definition = draft(
        "full",
        vec![
            select_field("plan", "Plan", &[("Pro", "pro"), ("Basic", "basic")]),
            number_field("seats", "Seats", true),
        ],
        vec![
            switch(
                "route",
                "plan",
                &[
                    (serde_json::json!("pro"), Some("pro_price")),
                    (serde_json::json!("basic"), Some("basic_price")),
                ],
                None,
            ),
            calculation("pro_price", "seats * 25", vec![bind_field("seats", "seats")]),
            calculation("basic_price", "seats * 5", vec![bind_field("seats", "seats")]),
        ],
    );
    definition.output_config = OutputConfig {
        format: OutputFormat::Card,
        field_mappings: Some(vec![
            FieldMapping {
                field_id: "pro_price".to_string(),
                label: "Pro".to_string(),
                format: DisplayFormat::Currency,
            },
            FieldMapping {
                field_id: "basic_price".to_string(),
                label: "Basic".to_string(),
                format: DisplayFormat::Currency,
            },
        ]),
        sections: Some(vec![OutputSection {
            title: "Pricing".to_string(),
            field_ids: vec!["pro_price".to_string(), "basic_price".to_string()],
        }]),
    };

    let json = serde_json::to_string(&definition).expect("serializes");
    let restored: ToolDraft = serde_json::from_str(&json).expect("deserializes");

    // Field, step, option, case and mapping order all survive the trip.
    assert_eq!(restored, definition);
}

#[test]
fn compiled_artifact_round_trips_through_bincode() {
    let tool = compile(tip_draft());
    let bytes = tool.to_bytes().expect("encodes");
    let restored = CompiledTool::from_bytes(&bytes).expect("decodes");
    assert_eq!(restored, tool);
}

#[test]
fn compiled_artifact_round_trips_through_a_file() {
    let tool = compile(branch_draft());
    let path = std::env::temp_dir().join("dougu_artifact_test.bin");
    let path = path.to_string_lossy().to_string();

    tool.save(&path).expect("saves");
    let restored = CompiledTool::from_file(&path).expect("loads");
    assert_eq!(restored, tool);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn run_compiled_is_the_zero_store_path() {
    let tool = compile(tip_draft());
    let runner = ToolRunner::new(Engine::new(), MemoryToolStore::new());

    let run = runner
        .run_compiled(&tool, &serde_json::json!({"subtotal": 3, "tipPercentage": 10}))
        .await
        .expect("compiled run succeeds");

    assert_eq!(
        run.output,
        RenderedOutput::Text {
            content: "0.3".to_string()
        }
    );
    assert!(run.report.is_success());
}

#[tokio::test]
async fn unknown_input_keys_are_ignored() {
    let runner = runner_with(vec![tip_draft()]);
    let result = runner
        .test_tool(
            "tip",
            &serde_json::json!({
                "subtotal": 3,
                "tipPercentage": 10,
                "tip_amount": "spoofed"
            }),
        )
        .await;

    // The spoofed key never reaches the context, so the step writes cleanly.
    assert!(result.success);
    assert_eq!(
        result.result,
        Some(RenderedOutput::Text {
            content: "0.3".to_string()
        })
    );
}
