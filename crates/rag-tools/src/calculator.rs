//! calculator tool: arithmetic expression evaluation.
//!
//! Recursive-descent evaluator. Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := number | '(' expr ')' | ident | ident '(' expr ')'
//! ```
//!
//! Identifiers: `pi`, `sqrt(x)`, `abs(x)`.

use async_trait::async_trait;
use serde_json::{json, Map};
use thiserror::Error;

use rag_types::{ToolParams, CALCULATOR};

use crate::error::ToolError;
use crate::tool::{required_str, Tool, ToolOutput};

/// Expression evaluation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("result is not a finite number")]
    NonFinite,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Nesting limit for parentheses, function calls and unary operators.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    LParen,
    RParen,
    Ident(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Op(c) => write!(f, "{}", c),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Ident(s) => f.write_str(s),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || is_digit_group(&chars, i))
                {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().filter(|c| **c != ',').collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '×' => {
                tokens.push(Token::Op('*'));
                i += 1;
            }
            '÷' => {
                tokens.push(Token::Op('/'));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Ident(
                    chars[start..i].iter().collect::<String>().to_lowercase(),
                ));
            }
            other => return Err(CalcError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

/// A comma between digits with exactly three digits after it ("1,250").
fn is_digit_group(chars: &[char], i: usize) -> bool {
    chars[i] == ','
        && i > 0
        && chars[i - 1].is_ascii_digit()
        && chars.len() >= i + 4
        && chars[i + 1..i + 4].iter().all(|c| c.is_ascii_digit())
        && chars.get(i + 4).map_or(true, |c| !c.is_ascii_digit())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    /// Every recursive path passes through here, so nesting is counted once
    /// per level.
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_NESTING {
            return Err(CalcError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => self.identifier(&name),
            Some(token) => Err(CalcError::UnexpectedToken(token.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn identifier(&mut self, name: &str) -> Result<f64, CalcError> {
        match name {
            "pi" => Ok(std::f64::consts::PI),
            "sqrt" | "abs" => {
                match self.next() {
                    Some(Token::LParen) => {}
                    Some(token) => return Err(CalcError::UnexpectedToken(token.to_string())),
                    None => return Err(CalcError::UnexpectedEnd),
                }
                let arg = self.expr()?;
                self.expect_rparen()?;
                Ok(if name == "sqrt" { arg.sqrt() } else { arg.abs() })
            }
            other => Err(CalcError::UnknownIdentifier(other.to_string())),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), CalcError> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            Some(token) => Err(CalcError::UnexpectedToken(token.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if let Some(token) = parser.peek() {
        return Err(CalcError::UnexpectedToken(token.to_string()));
    }
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

/// Render a result without a trailing ".0" for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rounded = format!("{:.6}", value);
        rounded.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Arithmetic evaluator exposed as a tool.
///
/// Params: `expression` (required).
#[derive(Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        CALCULATOR
    }

    fn description(&self) -> &str {
        "Evaluate arithmetic expressions"
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolOutput, ToolError> {
        let expression = required_str(params, "expression")?;
        let result = evaluate(expression)?;

        let mut data = Map::new();
        data.insert("expression".to_string(), json!(expression));
        data.insert("result".to_string(), json!(result));
        data.insert("formatted".to_string(), json!(format_number(result)));
        Ok(ToolOutput::ok(data))
    }
}
