//! Guard expression parser
//!
//! Parses expressions like:
//! - `field == 'value'`
//! - `score > 0.8`
//! - `a == 'x' and b > 5`
//! - `not (done == true or retries >= 3)`
//!
//! `or` binds looser than `and`, which binds looser than `not`.

use super::ast::{CompareOp, Expression, Literal};
use super::ConditionError;

const OPERATORS: [(&str, CompareOp); 7] = [
    ("!=", CompareOp::NotEq),
    (">=", CompareOp::Gte),
    ("<=", CompareOp::Lte),
    ("==", CompareOp::Eq),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
    (" contains ", CompareOp::Contains),
];

/// Parse a guard expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ConditionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ConditionError::Empty);
    }

    if let Some(inner) = strip_outer_parens(input) {
        return parse(inner);
    }

    if let Some(pos) = find_top_level(input, " or ") {
        let left = parse(&input[..pos])?;
        let right = parse(&input[pos + 4..])?;
        return Ok(Expression::Or(Box::new(left), Box::new(right)));
    }

    if let Some(pos) = find_top_level(input, " and ") {
        let left = parse(&input[..pos])?;
        let right = parse(&input[pos + 5..])?;
        return Ok(Expression::And(Box::new(left), Box::new(right)));
    }

    if let Some(rest) = input.strip_prefix("not ") {
        return Ok(Expression::Not(Box::new(parse(rest)?)));
    }

    match input {
        "true" => Ok(Expression::True),
        "false" => Ok(Expression::False),
        _ => parse_comparison(input),
    }
}

fn parse_comparison(input: &str) -> Result<Expression, ConditionError> {
    for (op_str, op) in OPERATORS {
        if let Some(pos) = find_top_level(input, op_str) {
            let path = input[..pos].trim();
            if path.is_empty() || path.contains(char::is_whitespace) {
                return Err(ConditionError::Invalid(input.to_string()));
            }
            let value = parse_literal(&input[pos + op_str.len()..])?;
            return Ok(Expression::Compare {
                path: path.to_string(),
                op,
                value,
            });
        }
    }

    Err(ConditionError::Invalid(input.to_string()))
}

/// Byte offset of `needle` outside quotes and parentheses
fn find_top_level(input: &str, needle: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth -= 1,
                _ if depth == 0 && input[i..].starts_with(needle) => return Some(i),
                _ => {}
            },
        }
    }
    None
}

/// `Some(inner)` when the whole input is wrapped in one matching pair of parens
fn strip_outer_parens(input: &str) -> Option<&str> {
    let inner = input.strip_prefix('(')?.strip_suffix(')')?;

    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return None;
                    }
                }
                _ => {}
            },
        }
    }
    (depth == 0).then_some(inner)
}

fn parse_literal(input: &str) -> Result<Literal, ConditionError> {
    let input = input.trim();

    match input {
        "null" => return Ok(Literal::Null),
        "true" => return Ok(Literal::Boolean(true)),
        "false" => return Ok(Literal::Boolean(false)),
        _ => {}
    }

    for quote in ['\'', '"'] {
        if input.len() >= 2 && input.starts_with(quote) && input.ends_with(quote) {
            return Ok(Literal::String(input[1..input.len() - 1].to_string()));
        }
    }

    input
        .parse::<f64>()
        .map(Literal::Number)
        .map_err(|_| ConditionError::InvalidLiteral(input.to_string()))
}
