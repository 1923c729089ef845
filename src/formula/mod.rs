//! Formula parsing and safe evaluation.
//!
//! A formula is a single expression over the variables in scope: arithmetic,
//! comparisons, boolean logic, parentheses, literals and a closed whitelist of
//! pure functions (`min`, `max`, `round`, `abs`, `floor`, `ceil`, `concat`,
//! `len`). Formulas are parsed into an immutable [`Expr`](crate::ast::Expr)
//! exactly once (the compiler stores the parsed form in each step) and the
//! evaluator is plain structural recursion, so user-authored text can never
//! reach host code.

mod eval;
mod functions;
mod parser;
mod token;

pub use eval::{evaluate, Scope};

use crate::ast::{Expr, Value};
use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Maximum expression nesting depth accepted by the parser. Bounds both parse
/// and evaluation cost for any single formula.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A parsed formula: the original source plus its AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    source: String,
    ast: Expr,
}

impl Formula {
    /// Parses a formula string. All grammar and whitelist enforcement happens
    /// here; a `Formula` that exists is safe to evaluate.
    pub fn parse(source: &str) -> Result<Self, EvaluationError> {
        Self::parse_with_depth(source, MAX_NESTING_DEPTH)
    }

    /// Parses with an explicit nesting-depth limit instead of
    /// [`MAX_NESTING_DEPTH`].
    pub fn parse_with_depth(source: &str, max_depth: usize) -> Result<Self, EvaluationError> {
        let ast = parser::parse(source, max_depth)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn evaluate(&self, scope: &Scope) -> Result<Value, EvaluationError> {
        eval::evaluate(&self.ast, scope)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Every identifier the formula resolves against its scope.
    pub fn variables(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        self.ast.collect_variables(&mut names);
        names
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
