use crate::ast::Value;
use crate::error::EvaluationError;
use crate::formula::Scope;

/// Substitutes `{name}` placeholders from the scope into a template string.
///
/// Only `{` immediately followed by an identifier and a closing `}` is a
/// placeholder; everything else (JSON braces in request bodies, for
/// instance) passes through untouched. An unknown placeholder fails the
/// step instead of sending garbage upstream.
pub(super) fn substitute(template: &str, scope: &Scope) -> Result<String, EvaluationError> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some((name, end)) = scan_placeholder(&chars, i + 1) {
                let value = scope
                    .get(&name)
                    .ok_or(EvaluationError::UnknownVariable(name))?;
                out.push_str(&render_value(value));
                i = end + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    Ok(out)
}

/// Scans an identifier terminated by `}` starting at `start`. Returns the
/// name and the index of the closing brace.
fn scan_placeholder(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut end = start;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    if end > start && chars.get(end) == Some(&'}') {
        Some((chars[start..end].iter().collect(), end))
    } else {
        None
    }
}

/// Scalars substitute as plain text, composites as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(&value.to_json()).unwrap_or_default()
        }
        scalar => scalar.to_display_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        let mut scope = Scope::default();
        scope.insert("city".to_string(), Value::String("Berlin".to_string()));
        scope.insert("amount".to_string(), Value::Number(42.0));
        scope
    }

    #[test]
    fn substitutes_scalars() {
        let result = substitute("https://api.test/{city}?n={amount}", &scope()).unwrap();
        assert_eq!(result, "https://api.test/Berlin?n=42");
    }

    #[test]
    fn json_braces_pass_through() {
        let result = substitute(r#"{"q": "{city}"}"#, &scope()).unwrap();
        assert_eq!(result, r#"{"q": "Berlin"}"#);
    }

    #[test]
    fn unknown_placeholder_fails() {
        assert_eq!(
            substitute("{missing}", &scope()),
            Err(EvaluationError::UnknownVariable("missing".to_string()))
        );
    }
}
