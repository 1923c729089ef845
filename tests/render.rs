//! Output renderer tests: format dispatch, display coercion, safety.
use dougu::ast::Value;
use dougu::error::ConfigError;
use dougu::render::{render, RenderedOutput, MISSING_PLACEHOLDER};
use dougu::tool::{
    DisplayFormat, FieldMapping, OutputConfig, OutputFormat, OutputSection,
};
use ahash::AHashMap;
use pretty_assertions::assert_eq;

fn object(entries: &[(&str, Value)]) -> Value {
    let map: AHashMap<String, Value> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Value::Object(map)
}

fn mapping(field_id: &str, label: &str, format: DisplayFormat) -> FieldMapping {
    FieldMapping {
        field_id: field_id.to_string(),
        label: label.to_string(),
        format,
    }
}

fn config(format: OutputFormat, mappings: Option<Vec<FieldMapping>>) -> OutputConfig {
    OutputConfig {
        format,
        field_mappings: mappings,
        sections: None,
    }
}

#[test]
fn absent_config_defaults_to_text() {
    let rendered = render(&Value::Number(0.3), None).unwrap();
    assert_eq!(
        rendered,
        RenderedOutput::Text {
            content: "0.3".to_string()
        }
    );
}

#[test]
fn text_pretty_prints_composites() {
    let rendered = render(&object(&[("total", Value::Number(12.0))]), None).unwrap();
    match rendered {
        RenderedOutput::Text { content } => {
            assert!(content.contains("\"total\": 12"));
            assert!(content.contains('\n'), "composites are pretty-printed");
        }
        other => panic!("expected text, got {:?}", other),
    }
}

#[test]
fn json_is_two_space_indented() {
    let result = object(&[("total", Value::Number(12.0))]);
    let rendered = render(&result, Some(&config(OutputFormat::Json, None))).unwrap();
    match rendered {
        RenderedOutput::Json { content } => {
            assert!(content.starts_with("{\n  \""));
        }
        other => panic!("expected json, got {:?}", other),
    }
}

#[test]
fn markdown_escapes_before_substituting() {
    let result = Value::String("# Hi <script>alert('x')</script> **now**".to_string());
    let rendered = render(
        &result,
        Some(&config(OutputFormat::Markdown, None)),
    )
    .unwrap();
    match rendered {
        RenderedOutput::Markdown { html } => {
            assert!(html.starts_with("<h1>"));
            assert!(html.contains("<strong>now</strong>"));
            assert!(!html.contains("<script>"));
            assert!(html.contains("&lt;script&gt;"));
        }
        other => panic!("expected markdown, got {:?}", other),
    }
}

#[test]
fn markdown_sections_group_mapped_fields() {
    let result = object(&[
        ("total", Value::Number(1200.0)),
        ("paid", Value::Bool(true)),
    ]);
    let output = OutputConfig {
        format: OutputFormat::Markdown,
        field_mappings: Some(vec![
            mapping("total", "Total", DisplayFormat::Currency),
            mapping("paid", "Paid", DisplayFormat::Boolean),
        ]),
        sections: Some(vec![OutputSection {
            title: "Billing".to_string(),
            field_ids: vec!["total".to_string(), "paid".to_string()],
        }]),
    };
    let rendered = render(&result, Some(&output)).unwrap();
    match rendered {
        RenderedOutput::Markdown { html } => {
            assert!(html.contains("<h2>Billing</h2>"));
            assert!(html.contains("$1,200.00"));
            assert!(html.contains("Yes"));
        }
        other => panic!("expected markdown, got {:?}", other),
    }
}

#[test]
fn table_renders_a_row_per_list_element() {
    let result = Value::Array(vec![
        object(&[
            ("name", Value::String("Widget".to_string())),
            ("price", Value::Number(9.5)),
        ]),
        object(&[("name", Value::String("Gadget".to_string()))]),
    ]);
    let output = config(
        OutputFormat::Table,
        Some(vec![
            mapping("name", "Name", DisplayFormat::Text),
            mapping("price", "Price", DisplayFormat::Currency),
        ]),
    );
    let rendered = render(&result, Some(&output)).unwrap();
    assert_eq!(
        rendered,
        RenderedOutput::Table {
            columns: vec!["Name".to_string(), "Price".to_string()],
            rows: vec![
                vec!["Widget".to_string(), "$9.50".to_string()],
                // Missing key renders the placeholder, never errors.
                vec!["Gadget".to_string(), MISSING_PLACEHOLDER.to_string()],
            ],
        }
    );
}

#[test]
fn scalar_result_becomes_a_single_table_row() {
    let output = config(
        OutputFormat::Table,
        Some(vec![mapping("value", "Value", DisplayFormat::Number)]),
    );
    let rendered = render(&Value::Number(3.0), Some(&output)).unwrap();
    assert_eq!(
        rendered,
        RenderedOutput::Table {
            columns: vec!["Value".to_string()],
            rows: vec![vec![MISSING_PLACEHOLDER.to_string()]],
        }
    );
}

#[test]
fn card_renders_one_labeled_item_per_mapping() {
    let result = object(&[
        ("total", Value::Number(1234.5)),
        ("due", Value::String("2024-03-09".to_string())),
    ]);
    let output = config(
        OutputFormat::Card,
        Some(vec![
            mapping("total", "Total", DisplayFormat::Currency),
            mapping("due", "Due", DisplayFormat::Date),
            mapping("note", "Note", DisplayFormat::Text),
        ]),
    );
    let rendered = render(&result, Some(&output)).unwrap();
    match rendered {
        RenderedOutput::Card { items } => {
            assert_eq!(items.len(), 3);
            assert_eq!(items[0].value, "$1,234.50");
            assert_eq!(items[1].value, "Mar 9, 2024");
            assert_eq!(items[2].value, MISSING_PLACEHOLDER);
        }
        other => panic!("expected card, got {:?}", other),
    }
}

#[test]
fn table_without_mappings_is_a_config_error() {
    let rendered = render(&Value::Number(1.0), Some(&config(OutputFormat::Table, None)));
    assert_eq!(
        rendered,
        Err(ConfigError::MissingFieldMappings {
            format: "table".to_string()
        })
    );
}

#[test]
fn card_with_empty_mappings_is_a_config_error() {
    let rendered = render(
        &Value::Number(1.0),
        Some(&config(OutputFormat::Card, Some(vec![]))),
    );
    assert_eq!(
        rendered,
        Err(ConfigError::MissingFieldMappings {
            format: "card".to_string()
        })
    );
}
