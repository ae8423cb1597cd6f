//! Dynamic evaluation of interpolation expressions.
//!
//! This is the fallback for `{{ ... }}` expressions that are not plain
//! property chains. The expression text comes from translation files, so
//! whoever controls those files controls what runs here. Swap in
//! [`DisabledEvaluator`] to allow property chains only.

use crate::i18n::{EvalError, Params};
use serde_json::{Number, Value};

/// Capability evaluating expression text with the params as variable scope.
pub trait DynamicEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, params: &Params) -> Result<Value, EvalError>;
}

/// Rejects every expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEvaluator;

impl DynamicEvaluator for DisabledEvaluator {
    fn evaluate(&self, _expression: &str, _params: &Params) -> Result<Value, EvalError> {
        Err(EvalError::Disabled)
    }
}

/// Small expression language over JSON values.
///
/// Supports number/string/boolean/null literals, identifiers and dotted
/// paths (`this` is the params object), parentheses, `!`, unary `-`,
/// `* / % + -`, comparisons, `== !=`, `&& ||` and `?:`. There are no
/// function calls, assignments or indexing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEvaluator;

impl DynamicEvaluator for BasicEvaluator {
    fn evaluate(&self, expression: &str, params: &Params) -> Result<Value, EvalError> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser { tokens, pos: 0 };
        let ast = parser.ternary()?;
        if let Some(token) = parser.peek() {
            return Err(syntax(token.offset, "unexpected trailing input"));
        }
        eval(&ast, params)
    }
}

// ==================== Tokens ====================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    offset: usize,
}

/// Longest operators first so `<=` wins over `<`.
static OPERATORS: [&str; 21] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!",
    "?", ":", "(", ")", ".",
];

fn syntax(offset: usize, message: &str) -> EvalError {
    EvalError::Syntax {
        offset,
        message: message.to_string(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut end = offset;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &input[offset..end];
            let n = text
                .parse::<f64>()
                .map_err(|_| syntax(offset, "invalid number"))?;
            tokens.push(Token {
                tok: Tok::Num(n),
                offset,
            });
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, ch)) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    ch if ch == c => {
                        closed = true;
                        break;
                    }
                    ch => text.push(ch),
                }
            }
            if !closed {
                return Err(syntax(offset, "unterminated string"));
            }
            tokens.push(Token {
                tok: Tok::Str(text),
                offset,
            });
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut end = offset;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' || d == '$' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                tok: Tok::Ident(input[offset..end].to_string()),
                offset,
            });
        } else {
            let rest = &input[offset..];
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(*op))
                .ok_or_else(|| syntax(offset, "unexpected character"))?;
            for _ in 0..op.len() {
                chars.next();
            }
            tokens.push(Token {
                tok: Tok::Op(*op),
                offset,
            });
        }
    }

    Ok(tokens)
}

// ==================== Parser ====================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn end_offset(&self) -> usize {
        self.tokens.last().map(|t| t.offset + 1).unwrap_or(0)
    }

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token {
                tok: Tok::Op(op), ..
            }) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect_op(&mut self, op: &'static str) -> Result<(), EvalError> {
        match self.eat_op(&[op]) {
            Some(_) => Ok(()),
            None => {
                let offset = self.peek().map(|t| t.offset).unwrap_or(self.end_offset());
                Err(syntax(offset, &format!("expected '{}'", op)))
            }
        }
    }

    fn ternary(&mut self) -> Result<Expr, EvalError> {
        let condition = self.binary(0)?;
        if self.eat_op(&["?"]).is_none() {
            return Ok(condition);
        }
        let then = self.ternary()?;
        self.expect_op(":")?;
        let otherwise = self.ternary()?;
        Ok(Expr::Conditional(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    /// Precedence climbing over the binary operator levels, loosest first.
    fn binary(&mut self, level: usize) -> Result<Expr, EvalError> {
        static LEVELS: [&[&str]; 6] = [
            &["||"],
            &["&&"],
            &["==", "!=", "===", "!=="],
            &["<", "<=", ">", ">="],
            &["+", "-"],
            &["*", "/", "%"],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };

        let mut left = self.binary(level + 1)?;
        while let Some(op) = self.eat_op(ops) {
            let right = self.binary(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        match self.eat_op(&["!", "-"]) {
            Some(op) => Ok(Expr::Unary(op, Box::new(self.unary()?))),
            None => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        while self.eat_op(&["."]).is_some() {
            match self.peek().cloned() {
                Some(Token {
                    tok: Tok::Ident(name),
                    ..
                }) => {
                    self.pos += 1;
                    expr = Expr::Member(Box::new(expr), name);
                }
                Some(token) => return Err(syntax(token.offset, "expected property name")),
                None => return Err(syntax(self.end_offset(), "expected property name")),
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| syntax(self.end_offset(), "unexpected end of expression"))?;
        self.pos += 1;

        match token.tok {
            Tok::Num(n) => Ok(Expr::Literal(number(n)?)),
            Tok::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Tok::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Ident(name),
            }),
            Tok::Op("(") => {
                let inner = self.ternary()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Tok::Op(_) => Err(syntax(token.offset, "unexpected operator")),
        }
    }
}

// ==================== Evaluation ====================

/// Whole numbers come back as integers so they render without ".0".
fn number(n: f64) -> Result<Value, EvalError> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Type("result is not a finite number".to_string()))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn as_number(value: &Value, op: &str) -> Result<f64, EvalError> {
    value
        .as_f64()
        .ok_or_else(|| EvalError::Type(format!("'{}' expects numbers, got {}", op, value)))
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn eval(expr: &Expr, params: &Params) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) if name == "this" => Ok(Value::Object(params.clone())),
        Expr::Ident(name) => Ok(params.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Member(receiver, name) => match eval(receiver, params)? {
            Value::Null => Err(EvalError::Type(format!(
                "cannot read property '{}' of null",
                name
            ))),
            Value::Object(object) => Ok(object.get(name).cloned().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        },
        Expr::Unary(op, operand) => {
            let value = eval(operand, params)?;
            match *op {
                "!" => Ok(Value::Bool(!truthy(&value))),
                _ => number(-as_number(&value, op)?),
            }
        }
        Expr::Conditional(condition, then, otherwise) => {
            if truthy(&eval(condition, params)?) {
                eval(then, params)
            } else {
                eval(otherwise, params)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, params)?;
            match *op {
                "&&" if !truthy(&left) => return Ok(left),
                "||" if truthy(&left) => return Ok(left),
                "&&" | "||" => return eval(right, params),
                _ => {}
            }
            let right = eval(right, params)?;
            binary(op, &left, &right)
        }
    }
}

fn binary(op: &str, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        "+" if left.is_string() || right.is_string() => {
            Ok(Value::String(display(left) + &display(right)))
        }
        "==" | "===" => Ok(Value::Bool(loose_eq(left, right))),
        "!=" | "!==" => Ok(Value::Bool(!loose_eq(left, right))),
        "<" | "<=" | ">" | ">=" => {
            let ordering = match (left, right) {
                (Value::String(l), Value::String(r)) => l.partial_cmp(r),
                _ => as_number(left, op)?.partial_cmp(&as_number(right, op)?),
            };
            let ordering = ordering
                .ok_or_else(|| EvalError::Type(format!("cannot compare with '{}'", op)))?;
            Ok(Value::Bool(match op {
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                ">" => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        _ => {
            let l = as_number(left, op)?;
            let r = as_number(right, op)?;
            match op {
                "+" => number(l + r),
                "-" => number(l - r),
                "*" => number(l * r),
                "/" | "%" if r == 0.0 => Err(EvalError::DivisionByZero),
                "/" => number(l / r),
                _ => number(l % r),
            }
        }
    }
}
