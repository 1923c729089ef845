use crate::ast::{BinaryOp, Expr, UnaryOp, Value};
use crate::error::EvaluationError;
use ahash::AHashMap;

/// The variable bindings an expression is evaluated against.
pub type Scope = AHashMap<String, Value>;

/// Evaluates an expression tree against a scope.
///
/// Structural recursion over the tagged AST; there is no other execution
/// mechanism. Numeric strings coerce for arithmetic and ordering, `&&`/`||`
/// short-circuit on booleans, and division or modulo by zero fails instead of
/// producing NaN or infinity.
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Variable(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownVariable(name.clone())),

        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!expect_bool(&value, "!")?)),
                UnaryOp::Neg => Ok(Value::Number(-expect_number(&value, "-")?)),
            }
        }

        Expr::Binary { op, left, right } => eval_binary(*op, left, right, scope),

        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            function.apply(&values)
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    scope: &Scope,
) -> Result<Value, EvaluationError> {
    // Short-circuit operators evaluate their right side only when needed.
    match op {
        BinaryOp::And => {
            let lhs = evaluate(left, scope)?;
            if !expect_bool(&lhs, "&&")? {
                return Ok(Value::Bool(false));
            }
            let rhs = evaluate(right, scope)?;
            return Ok(Value::Bool(expect_bool(&rhs, "&&")?));
        }
        BinaryOp::Or => {
            let lhs = evaluate(left, scope)?;
            if expect_bool(&lhs, "||")? {
                return Ok(Value::Bool(true));
            }
            let rhs = evaluate(right, scope)?;
            return Ok(Value::Bool(expect_bool(&rhs, "||")?));
        }
        _ => {}
    }

    let lhs = evaluate(left, scope)?;
    let rhs = evaluate(right, scope)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs.loosely_equals(&rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!lhs.loosely_equals(&rhs))),

        BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
            let symbol = op.symbol();
            let a = expect_number(&lhs, symbol)?;
            let b = expect_number(&rhs, symbol)?;
            let outcome = match op {
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                BinaryOp::Lt => a < b,
                _ => a <= b,
            };
            Ok(Value::Bool(outcome))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Pow => {
            let symbol = op.symbol();
            let a = expect_number(&lhs, symbol)?;
            let b = expect_number(&rhs, symbol)?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a.powf(b),
            };
            finite(result, symbol)
        }

        BinaryOp::Div | BinaryOp::Rem => {
            let symbol = op.symbol();
            let a = expect_number(&lhs, symbol)?;
            let b = expect_number(&rhs, symbol)?;
            if b == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            let result = if op == BinaryOp::Div { a / b } else { a % b };
            finite(result, symbol)
        }

        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn finite(result: f64, operation: &str) -> Result<Value, EvaluationError> {
    if result.is_finite() {
        Ok(Value::Number(result))
    } else {
        Err(EvaluationError::NonFinite {
            operation: operation.to_string(),
        })
    }
}

fn expect_number(value: &Value, operation: &str) -> Result<f64, EvaluationError> {
    value
        .as_number()
        .ok_or_else(|| EvaluationError::TypeMismatch {
            operation: operation.to_string(),
            expected: "number".to_string(),
            found: value.clone(),
        })
}

fn expect_bool(value: &Value, operation: &str) -> Result<bool, EvaluationError> {
    value
        .as_bool()
        .ok_or_else(|| EvaluationError::TypeMismatch {
            operation: operation.to_string(),
            expected: "bool".to_string(),
            found: value.clone(),
        })
}
