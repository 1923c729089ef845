use crate::ast::Value;
use crate::compile::CompiledTransform;
use crate::error::EvaluationError;
use crate::formula::Scope;

/// Applies a pure transform to one context value. No I/O, no effects: the
/// same input and scope always produce the same output.
pub(super) fn apply(
    op: &CompiledTransform,
    input: &Value,
    scope: &Scope,
) -> Result<Value, EvaluationError> {
    match op {
        CompiledTransform::Uppercase => Ok(Value::String(expect_str(input, "uppercase")?.to_uppercase())),
        CompiledTransform::Lowercase => Ok(Value::String(expect_str(input, "lowercase")?.to_lowercase())),
        CompiledTransform::Trim => Ok(Value::String(expect_str(input, "trim")?.trim().to_string())),

        CompiledTransform::Round { decimals } => {
            let number = input.as_number().ok_or_else(|| type_mismatch("round", "number", input))?;
            let factor = 10f64.powi((*decimals).min(12) as i32);
            Ok(Value::Number((number * factor).round() / factor))
        }

        CompiledTransform::Map { formula } => {
            let items = expect_array(input, "map")?;
            let mut element_scope = scope.clone();
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                element_scope.insert("item".to_string(), item.clone());
                element_scope.insert("index".to_string(), Value::Number(index as f64));
                mapped.push(formula.evaluate(&element_scope)?);
            }
            Ok(Value::Array(mapped))
        }

        CompiledTransform::Filter { predicate } => {
            let items = expect_array(input, "filter")?;
            let mut element_scope = scope.clone();
            let mut kept = Vec::new();
            for (index, item) in items.iter().enumerate() {
                element_scope.insert("item".to_string(), item.clone());
                element_scope.insert("index".to_string(), Value::Number(index as f64));
                let verdict = predicate.evaluate(&element_scope)?;
                match verdict {
                    Value::Bool(true) => kept.push(item.clone()),
                    Value::Bool(false) => {}
                    other => return Err(type_mismatch("filter", "bool", &other)),
                }
            }
            Ok(Value::Array(kept))
        }
    }
}

fn expect_str<'a>(value: &'a Value, operation: &str) -> Result<&'a str, EvaluationError> {
    value
        .as_str()
        .ok_or_else(|| type_mismatch(operation, "string", value))
}

fn expect_array<'a>(value: &'a Value, operation: &str) -> Result<&'a [Value], EvaluationError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(type_mismatch(operation, "array", other)),
    }
}

fn type_mismatch(operation: &str, expected: &str, found: &Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operation: operation.to_string(),
        expected: expected.to_string(),
        found: found.clone(),
    }
}
