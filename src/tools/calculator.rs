//! Deterministic arithmetic evaluator (spec.md §4.2).
//!
//! A restricted recursive-descent parser/evaluator over
//! `+ − * / ^ %`, parentheses, the functions `{sqrt, log, log2, ln, sin,
//! cos, tan, exp, factorial}` and constants `{pi, e, g, c}`. No general
//! `eval` — this never executes arbitrary code, matching spec.md's "No
//! general `eval`" requirement and the crate's stance against ad-hoc
//! exception flows (spec.md §9): malformed input is a typed
//! `CalculatorError`, not a panic.

use std::f64::consts::{E, PI};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculatorError {
    #[error("malformed expression: {0}")]
    Malformed(String),
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("domain error: {0}")]
    DomainError(String),
}

/// Physical constants recognised by the grammar.
const GRAVITY: f64 = 9.80665;
const LIGHT_SPEED: f64 = 299_792_458.0;

/// Evaluates a restricted arithmetic expression and returns its decimal
/// value, or [`CalculatorError::Malformed`] for anything outside the
/// grammar (spec.md: "Returns a decimal result or `MALFORMED_EXPRESSION`").
pub fn evaluate(expression: &str) -> Result<f64, CalculatorError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(CalculatorError::Malformed("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalculatorError::Malformed(format!(
            "unexpected trailing input at token {}",
            parser.pos
        )));
    }
    if !value.is_finite() {
        return Err(CalculatorError::DomainError("result is not finite".to_string()));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalculatorError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
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
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| CalculatorError::Malformed(format!("bad number '{text}'")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text));
            }
            other => {
                return Err(CalculatorError::Malformed(format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    // expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, CalculatorError> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := power (('*' | '/' | '%') power)*
    fn parse_term(&mut self) -> Result<f64, CalculatorError> {
        let mut value = self.parse_power()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.parse_power()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.parse_power()?;
                    if rhs == 0.0 {
                        return Err(CalculatorError::DivisionByZero);
                    }
                    value /= rhs;
                }
                Some(Token::Percent) => {
                    self.advance();
                    let rhs = self.parse_power()?;
                    if rhs == 0.0 {
                        return Err(CalculatorError::DivisionByZero);
                    }
                    value %= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // power := unary ('^' power)?  (right-associative)
    fn parse_power(&mut self) -> Result<f64, CalculatorError> {
        let base = self.parse_unary()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.parse_power()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    // unary := '-' unary | primary
    fn parse_unary(&mut self) -> Result<f64, CalculatorError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            return Ok(-self.parse_unary()?);
        }
        if matches!(self.peek(), Some(Token::Plus)) {
            self.advance();
            return self.parse_unary();
        }
        self.parse_primary()
    }

    // primary := number | constant | function '(' expr ')' | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, CalculatorError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalculatorError::Malformed("expected ')'".to_string())),
                }
            }
            Some(Token::Ident(name)) => self.parse_ident(&name),
            other => Err(CalculatorError::Malformed(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_ident(&mut self, name: &str) -> Result<f64, CalculatorError> {
        match name {
            "pi" => return Ok(PI),
            "e" => return Ok(E),
            "g" => return Ok(GRAVITY),
            "c" => return Ok(LIGHT_SPEED),
            _ => {}
        }

        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            let arg = self.parse_expr()?;
            match self.advance() {
                Some(Token::RParen) => {}
                _ => return Err(CalculatorError::Malformed("expected ')'".to_string())),
            }
            return apply_function(name, arg);
        }

        Err(CalculatorError::UnknownIdentifier(name.to_string()))
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64, CalculatorError> {
    match name {
        "sqrt" => {
            if arg < 0.0 {
                Err(CalculatorError::DomainError("sqrt of negative number".to_string()))
            } else {
                Ok(arg.sqrt())
            }
        }
        "log" => {
            if arg <= 0.0 {
                Err(CalculatorError::DomainError("log of non-positive number".to_string()))
            } else {
                Ok(arg.log10())
            }
        }
        "log2" => {
            if arg <= 0.0 {
                Err(CalculatorError::DomainError("log2 of non-positive number".to_string()))
            } else {
                Ok(arg.log2())
            }
        }
        "ln" => {
            if arg <= 0.0 {
                Err(CalculatorError::DomainError("ln of non-positive number".to_string()))
            } else {
                Ok(arg.ln())
            }
        }
        "sin" => Ok(arg.sin()),
        "cos" => Ok(arg.cos()),
        "tan" => Ok(arg.tan()),
        "exp" => Ok(arg.exp()),
        "factorial" => {
            if arg < 0.0 || arg.fract() != 0.0 || arg > 170.0 {
                return Err(CalculatorError::DomainError(
                    "factorial requires a non-negative integer <= 170".to_string(),
                ));
            }
            let n = arg as u64;
            Ok((1..=n).fold(1.0_f64, |acc, x| acc * x as f64))
        }
        other => Err(CalculatorError::UnknownIdentifier(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 {
        evaluate(s).unwrap()
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(eval("(16-3-4)*2"), 18.0);
        assert_eq!(eval("2+3*4"), 14.0);
        assert_eq!(eval("(2+3)*4"), 20.0);
    }

    #[test]
    fn operator_precedence_and_power() {
        assert_eq!(eval("2^3^2"), 512.0); // right-associative: 2^(3^2)
        assert_eq!(eval("2*3^2"), 18.0);
        assert_eq!(eval("-2^2"), -4.0); // unary binds looser than ^ here: -(2^2)
    }

    #[test]
    fn functions_and_constants() {
        assert!((eval("sqrt(16)") - 4.0).abs() < 1e-9);
        assert!((eval("factorial(5)") - 120.0).abs() < 1e-9);
        assert!((eval("pi") - std::f64::consts::PI).abs() < 1e-9);
        assert!((eval("log2(8)") - 3.0).abs() < 1e-9);
    }

    #[test]
    fn division_by_zero_is_typed_error() {
        assert_eq!(evaluate("1/0"), Err(CalculatorError::DivisionByZero));
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(matches!(evaluate("2 + "), Err(CalculatorError::Malformed(_))));
        assert!(matches!(evaluate("2 $ 3"), Err(CalculatorError::Malformed(_))));
        assert!(matches!(evaluate("(2 + 3"), Err(CalculatorError::Malformed(_))));
    }

    #[test]
    fn never_executes_arbitrary_code() {
        // There is no identifier path that reaches a shell or the host
        // filesystem; unknown identifiers are rejected, not looked up.
        assert!(matches!(
            evaluate("system(1)"),
            Err(CalculatorError::UnknownIdentifier(_))
        ));
    }
}
