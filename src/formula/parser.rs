use super::token::{tokenize, Spanned, Token};
use crate::ast::{BinaryOp, Expr, Function, UnaryOp, Value};
use crate::error::EvaluationError;

/// Parses a formula into an [`Expr`].
///
/// Recursive descent with one function per precedence level. Nesting depth is
/// bounded by `max_depth` (defaulting to [`MAX_NESTING_DEPTH`]), counted at
/// the points where the grammar actually nests (parentheses, call arguments,
/// unary operands, power right-hand sides), so deeply parenthesized input
/// cannot blow the stack at parse or eval time.
pub(super) fn parse(source: &str, max_depth: usize) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(source)?;
    let end = source.chars().count();
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
        max_depth,
    };
    let expr = parser.expression(0)?;
    if let Some(spanned) = parser.peek() {
        return Err(EvaluationError::Syntax {
            position: spanned.pos,
            message: "unexpected trailing input after expression".to_string(),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    /// Consumes the next token if it matches, reporting whether it did.
    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn current_position(&self) -> usize {
        self.peek().map(|s| s.pos).unwrap_or(self.end)
    }

    fn guard_depth(&self, depth: usize) -> Result<(), EvaluationError> {
        if depth > self.max_depth {
            Err(EvaluationError::NestingTooDeep {
                max: self.max_depth,
            })
        } else {
            Ok(())
        }
    }

    fn expression(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        self.or(depth)
    }

    fn or(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.and(depth)?;
        while self.eat(&Token::OrOr) {
            let right = self.and(depth)?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.equality(depth)?;
        while self.eat(&Token::AndAnd) {
            let right = self.equality(depth)?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.comparison(depth)?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let right = self.comparison(depth)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.additive(depth)?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                _ => break,
            };
            self.pos += 1;
            let right = self.additive(depth)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn additive(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.multiplicative(depth)?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative(depth)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn multiplicative(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.power(depth)?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.power(depth)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // Right-associative: 2 ^ 3 ^ 2 is 2 ^ (3 ^ 2).
    fn power(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let base = self.unary(depth)?;
        if self.eat(&Token::Caret) {
            self.guard_depth(depth + 1)?;
            let exponent = self.power(depth + 1)?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn unary(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        if self.eat(&Token::Bang) {
            self.guard_depth(depth + 1)?;
            let operand = self.unary(depth + 1)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Minus) {
            self.guard_depth(depth + 1)?;
            let operand = self.unary(depth + 1)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.primary(depth)
    }

    fn primary(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        self.guard_depth(depth)?;
        let position = self.current_position();
        let Some(spanned) = self.advance() else {
            return Err(EvaluationError::Syntax {
                position,
                message: "unexpected end of formula".to_string(),
            });
        };

        match spanned.token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Bool(b) => Ok(Expr::Literal(Value::Bool(b))),
            Token::LParen => {
                let inner = self.expression(depth + 1)?;
                if !self.eat(&Token::RParen) {
                    return Err(EvaluationError::Syntax {
                        position: self.current_position(),
                        message: "expected ')'".to_string(),
                    });
                }
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek().map(|s| &s.token) == Some(&Token::LParen) {
                    self.pos += 1;
                    self.call(&name, spanned.pos, depth + 1)
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            other => Err(EvaluationError::Syntax {
                position: spanned.pos,
                message: format!("unexpected token '{:?}'", other),
            }),
        }
    }

    /// Parses a call's argument list. The callee must be on the function
    /// whitelist and the argument count is checked here, so a bad call never
    /// survives to evaluation.
    fn call(&mut self, name: &str, position: usize, depth: usize) -> Result<Expr, EvaluationError> {
        let function = Function::from_name(name)
            .ok_or_else(|| EvaluationError::DisallowedToken(format!("{}(", name)))?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expression(depth)?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                return Err(EvaluationError::Syntax {
                    position: self.current_position(),
                    message: "expected ',' or ')' in argument list".to_string(),
                });
            }
        }

        let (min, max) = function.arity();
        let ok = args.len() >= min && max.map_or(true, |m| args.len() <= m);
        if !ok {
            let expected = match max {
                Some(m) if m == min => format!("{}", min),
                Some(m) => format!("{} to {}", min, m),
                None => format!("at least {}", min),
            };
            return Err(EvaluationError::Syntax {
                position,
                message: format!(
                    "{} expects {} argument(s), found {}",
                    function.name(),
                    expected,
                    args.len()
                ),
            });
        }

        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
