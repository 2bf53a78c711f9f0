//! Arithmetic for `/calc`
//!
//! Grammar, with the usual precedence:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```
//!
//! Integers stay integers until divided or until they overflow `i64`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CalcError {
    #[error("unexpected character {0:?}")]
    InvalidCharacter(char),
    #[error("division by zero")]
    DivisionByZero,
    #[error("malformed expression")]
    Syntax,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    /// Floats are rounded to two decimal places
    pub fn rounded(self) -> Number {
        match self {
            Number::Float(f) => Number::Float((f * 100.0).round() / 100.0),
            int => int,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

fn apply(op: Op, lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    if let (Number::Int(a), Number::Int(b)) = (lhs, rhs) {
        let exact = match op {
            Op::Add => a.checked_add(b),
            Op::Sub => a.checked_sub(b),
            Op::Mul => a.checked_mul(b),
            Op::Div => None,
        };
        if let Some(v) = exact {
            return Ok(Number::Int(v));
        }
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    Ok(Number::Float(match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => {
            if rhs.is_zero() {
                return Err(CalcError::DivisionByZero);
            }
            a / b
        }
    }))
}

/// Characters accepted in an expression
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || "+-*/().".contains(c) || c.is_whitespace()
}

/// Evaluate an expression; commas must already be replaced by points
pub fn evaluate(expr: &str) -> Result<Number, CalcError> {
    if let Some(bad) = expr.chars().find(|c| !is_allowed(*c)) {
        return Err(CalcError::InvalidCharacter(bad));
    }

    let mut parser = Parser {
        chars: expr.chars().collect(),
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.peek().is_some() {
        return Err(CalcError::Syntax);
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    /// Next non-whitespace character, leaving `pos` on it
    fn peek(&mut self) -> Option<char> {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut value = self.term()?;
        while let Some(c @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = apply(if c == '+' { Op::Add } else { Op::Sub }, value, rhs)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut value = self.factor()?;
        while let Some(c @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = apply(if c == '*' { Op::Mul } else { Op::Div }, value, rhs)?;
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<Number, CalcError> {
        match self.peek().ok_or(CalcError::Syntax)? {
            '+' => {
                self.pos += 1;
                self.factor()
            }
            '-' => {
                self.pos += 1;
                let value = self.factor()?;
                apply(Op::Sub, Number::Int(0), value)
            }
            '(' => {
                self.pos += 1;
                let value = self.expr()?;
                match self.bump() {
                    Some(')') => Ok(value),
                    _ => Err(CalcError::Syntax),
                }
            }
            c if c.is_ascii_digit() || c == '.' => self.number(),
            _ => Err(CalcError::Syntax),
        }
    }

    fn number(&mut self) -> Result<Number, CalcError> {
        let start = self.pos;
        while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit() || *c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();

        if literal.contains('.') {
            if literal == "." || literal.matches('.').count() > 1 {
                return Err(CalcError::Syntax);
            }
            literal
                .parse::<f64>()
                .map(Number::Float)
                .map_err(|_| CalcError::Syntax)
        } else {
            match literal.parse::<i64>() {
                Ok(i) => Ok(Number::Int(i)),
                Err(_) => literal
                    .parse::<f64>()
                    .map(Number::Float)
                    .map_err(|_| CalcError::Syntax),
            }
        }
    }
}
