//! Guard conditions
//!
//!     A guard condition is the text between `if` and the trailing `:` of a guard line.
//!     It is tokenized with logos, parsed with chumsky into an [`Expr`], and evaluated
//!     against the flag table. Before evaluation every name carrying the flag prefix is
//!     resolved into the table, so evaluation itself never touches the environment.

pub mod ast;
pub mod eval;
pub mod parser;
pub mod tokens;

pub use ast::{BinaryOp, CompareOp, Expr};
pub use eval::{evaluate, Value};
pub use parser::parse_condition;

use crate::condiment::flags::{Environment, FlagTable};
use std::fmt;
use std::ops::Range;

/// Errors raised while parsing or evaluating a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// The condition is not valid syntax; `span` is a byte range into the condition
    Syntax { span: Range<usize>, message: String },
    /// The condition parsed but could not be evaluated
    Evaluation(String),
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionError::Syntax { span, message } => {
                write!(f, "{} (at {}..{})", message, span.start, span.end)
            }
            ConditionError::Evaluation(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ConditionError {}

/// A parsed condition, ready to be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        Ok(Self {
            source: source.to_string(),
            expr: parse_condition(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Names in the condition that carry `prefix`, i.e. the flags it references.
    pub fn flag_names<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.expr
            .names()
            .into_iter()
            .filter(move |name| name.starts_with(prefix))
    }

    /// Resolve referenced flags into `flags`, then evaluate to a boolean.
    pub fn decide<E: Environment + ?Sized>(
        &self,
        prefix: &str,
        flags: &mut FlagTable,
        env: &E,
    ) -> Result<bool, ConditionError> {
        for name in self.flag_names(prefix) {
            flags.define(name, env);
        }
        Ok(evaluate(&self.expr, flags)?.is_truthy())
    }
}
