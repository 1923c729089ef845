use crate::ast::Value;
use crate::compile::CompiledField;
use crate::error::{FieldIssue, InputProblem, ValidationError};
use crate::tool::FieldType;
use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref TEL: Regex = Regex::new(r"^\+?[0-9][0-9 \-().]{5,}$").unwrap();
    static ref URL: Regex = Regex::new(r"^https?://\S+$").unwrap();
}

/// Validates submitted input against the declared form fields.
///
/// Every field is checked and every defect is collected, so one failure
/// names all offending fields at once. Unknown keys in the input are
/// ignored; they never reach the execution context. On success, the seed
/// preserves field declaration order.
pub fn validate_input(
    fields: &[CompiledField],
    input: &serde_json::Value,
) -> Result<Vec<(String, Value)>, ValidationError> {
    let empty = serde_json::Map::new();
    let values = input.as_object().unwrap_or(&empty);

    let mut seed = Vec::with_capacity(fields.len());
    let mut issues = Vec::new();

    for field in fields {
        let submitted = values.get(&field.id).filter(|v| !v.is_null());
        match submitted {
            Some(raw) => match coerce(field, raw) {
                Ok(value) => seed.push((field.id.clone(), value)),
                Err(problem) => issues.push(FieldIssue {
                    field: field.id.clone(),
                    problem,
                }),
            },
            None => {
                if let Some(default) = &field.default {
                    seed.push((field.id.clone(), default.clone()));
                } else if field.required {
                    issues.push(FieldIssue {
                        field: field.id.clone(),
                        problem: InputProblem::Missing,
                    });
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(seed)
    } else {
        Err(ValidationError { issues })
    }
}

fn coerce(field: &CompiledField, raw: &serde_json::Value) -> Result<Value, InputProblem> {
    match field.field_type {
        FieldType::Number => match raw {
            serde_json::Value::Number(n) => Ok(Value::Number(n.as_f64().unwrap_or(0.0))),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number)
                .ok_or(InputProblem::WrongType { expected: "number" }),
            _ => Err(InputProblem::WrongType { expected: "number" }),
        },

        FieldType::Boolean => match raw {
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::String(s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(InputProblem::WrongType { expected: "boolean" }),
            },
            _ => Err(InputProblem::WrongType { expected: "boolean" }),
        },

        FieldType::Text | FieldType::Textarea => scalar_text(raw),

        FieldType::Select => {
            let value = expect_string(raw)?;
            if field.options.iter().any(|option| option == &value) {
                Ok(Value::String(value))
            } else {
                Err(InputProblem::UnknownOption { value })
            }
        }

        FieldType::Email => shaped(raw, &EMAIL, "email address"),
        FieldType::Tel => shaped(raw, &TEL, "phone number"),
        FieldType::Url => shaped(raw, &URL, "url"),

        FieldType::Date => {
            let value = expect_string(raw)?;
            let parses = NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_ok()
                || DateTime::parse_from_rfc3339(&value).is_ok();
            if parses {
                Ok(Value::String(value))
            } else {
                Err(InputProblem::InvalidFormat { expected: "date" })
            }
        }
    }
}

/// Text fields take any scalar and keep its textual form.
fn scalar_text(raw: &serde_json::Value) -> Result<Value, InputProblem> {
    match raw {
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Number(n) => Ok(Value::String(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err(InputProblem::WrongType { expected: "string" }),
    }
}

fn expect_string(raw: &serde_json::Value) -> Result<String, InputProblem> {
    raw.as_str()
        .map(String::from)
        .ok_or(InputProblem::WrongType { expected: "string" })
}

fn shaped(
    raw: &serde_json::Value,
    shape: &Regex,
    expected: &'static str,
) -> Result<Value, InputProblem> {
    let value = expect_string(raw)?;
    if shape.is_match(value.trim()) {
        Ok(Value::String(value))
    } else {
        Err(InputProblem::InvalidFormat { expected })
    }
}
