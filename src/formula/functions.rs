use crate::ast::{Function, Value};
use crate::error::EvaluationError;

impl Function {
    /// Accepted argument count as `(min, max)`; `None` means unbounded.
    pub(crate) fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Function::Min | Function::Max => (2, None),
            Function::Round => (1, Some(2)),
            Function::Abs | Function::Floor | Function::Ceil | Function::Len => (1, Some(1)),
            Function::Concat => (1, None),
        }
    }

    /// Applies the function to already-evaluated arguments. All functions are
    /// pure; arity was checked at parse time.
    pub(crate) fn apply(&self, args: &[Value]) -> Result<Value, EvaluationError> {
        match self {
            Function::Min => {
                let numbers = self.numeric_args(args)?;
                Ok(Value::Number(numbers.into_iter().fold(f64::MAX, f64::min)))
            }
            Function::Max => {
                let numbers = self.numeric_args(args)?;
                Ok(Value::Number(numbers.into_iter().fold(f64::MIN, f64::max)))
            }
            Function::Round => {
                let value = self.numeric(&args[0])?;
                let digits = match args.get(1) {
                    Some(arg) => self.numeric(arg)?.trunc().clamp(0.0, 12.0) as i32,
                    None => 0,
                };
                let factor = 10f64.powi(digits);
                Ok(Value::Number((value * factor).round() / factor))
            }
            Function::Abs => Ok(Value::Number(self.numeric(&args[0])?.abs())),
            Function::Floor => Ok(Value::Number(self.numeric(&args[0])?.floor())),
            Function::Ceil => Ok(Value::Number(self.numeric(&args[0])?.ceil())),
            Function::Concat => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&arg.to_display_string());
                }
                Ok(Value::String(out))
            }
            Function::Len => match &args[0] {
                Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::Array(items) => Ok(Value::Number(items.len() as f64)),
                Value::Object(map) => Ok(Value::Number(map.len() as f64)),
                other => Err(EvaluationError::TypeMismatch {
                    operation: self.name().to_string(),
                    expected: "string, array or object".to_string(),
                    found: other.clone(),
                }),
            },
        }
    }

    fn numeric(&self, value: &Value) -> Result<f64, EvaluationError> {
        value
            .as_number()
            .ok_or_else(|| EvaluationError::TypeMismatch {
                operation: self.name().to_string(),
                expected: "number".to_string(),
                found: value.clone(),
            })
    }

    fn numeric_args(&self, args: &[Value]) -> Result<Vec<f64>, EvaluationError> {
        args.iter().map(|arg| self.numeric(arg)).collect()
    }
}
