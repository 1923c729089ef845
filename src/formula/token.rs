use crate::error::EvaluationError;

/// Lexical tokens of the formula grammar.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    EqEq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Words that would suggest statement-level semantics the grammar does not
/// have. Rejected eagerly so a formula like `while x > 0` fails as a
/// disallowed token instead of a confusing unknown-variable error.
const RESERVED: &[&str] = &[
    "let", "var", "const", "fn", "function", "for", "while", "loop", "do", "if", "else",
    "return", "new", "eval", "import", "this",
];

/// Scans a formula into tokens. Anything outside the closed grammar
/// (assignment, member access, brackets, statement keywords) is a
/// [`EvaluationError::DisallowedToken`].
pub(super) fn tokenize(source: &str) -> Result<Vec<Spanned>, EvaluationError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let pos = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len()
                && chars[i] == '.'
                && i + 1 < chars.len()
                && chars[i + 1].is_ascii_digit()
            {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let number = text.parse::<f64>().map_err(|_| EvaluationError::Syntax {
                position: pos,
                message: format!("malformed number '{}'", text),
            })?;
            tokens.push(Spanned {
                token: Token::Number(number),
                pos,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            let mut text = String::new();
            let mut closed = false;
            while i < chars.len() {
                match chars[i] {
                    '\\' if i + 1 < chars.len() => {
                        let escaped = chars[i + 1];
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        i += 2;
                    }
                    ch if ch == quote => {
                        closed = true;
                        i += 1;
                        break;
                    }
                    ch => {
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            if !closed {
                return Err(EvaluationError::Syntax {
                    position: pos,
                    message: "unterminated string literal".to_string(),
                });
            }
            tokens.push(Spanned {
                token: Token::Str(text),
                pos,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let token = match word.as_str() {
                "true" => Token::Bool(true),
                "false" => Token::Bool(false),
                w if RESERVED.contains(&w) => {
                    return Err(EvaluationError::DisallowedToken(word));
                }
                _ => Token::Ident(word),
            };
            tokens.push(Spanned { token, pos });
            continue;
        }

        let next = chars.get(i + 1).copied();

        let (token, width) = match c {
            '&' if next == Some('&') => (Token::AndAnd, 2),
            '|' if next == Some('|') => (Token::OrOr, 2),
            '=' if next == Some('=') => (Token::EqEq, 2),
            '!' if next == Some('=') => (Token::NotEq, 2),
            '>' if next == Some('=') => (Token::Ge, 2),
            '<' if next == Some('=') => (Token::Le, 2),
            '>' => (Token::Gt, 1),
            '<' => (Token::Lt, 1),
            '!' => (Token::Bang, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '^' => (Token::Caret, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            ',' => (Token::Comma, 1),
            // Assignment, member access, lone boolean operators and every
            // other punctuation class are outside the grammar.
            other => {
                return Err(EvaluationError::DisallowedToken(other.to_string()));
            }
        };
        tokens.push(Spanned { token, pos });
        i += width;
    }

    Ok(tokens)
}
