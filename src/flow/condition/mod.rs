// SPDX-License-Identifier: MIT

//! Guard expressions for edges declared in graph definitions
//!
//! Conditions are simple expressions like:
//! - `intent == 'search'`
//! - `quality_score < 80`
//! - `intent == 'bug' and priority > 3`

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Expression, Literal};
pub use evaluator::evaluate;
pub use parser::parse;

use crate::engine::{Guard, State};
use thiserror::Error;

/// Errors raised while parsing a condition
#[derive(Debug, Error, PartialEq)]
pub enum ConditionError {
    #[error("Empty condition")]
    Empty,

    #[error("Could not parse condition: {0}")]
    Invalid(String),

    #[error("Could not parse literal: {0}")]
    InvalidLiteral(String),
}

/// A parsed condition usable as an edge guard
#[derive(Debug, Clone)]
pub struct ConditionGuard {
    source: String,
    expr: Expression,
}

impl ConditionGuard {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        Ok(Self {
            source: source.to_string(),
            expr: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Guard for ConditionGuard {
    fn evaluate(&self, state: &State) -> bool {
        evaluate(&self.expr, state)
    }
}
