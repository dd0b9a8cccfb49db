//! Condition evaluation
//!
//!     Evaluation sees nothing but the flag table: names must be flags that were
//!     resolved before evaluation started, and the only callable functions are the
//!     builtin conversions listed in [`call_builtin`]. Flag values are always strings,
//!     so `WITH_DEBUG=0` makes `if WITH_DEBUG:` true. Use `int(WITH_DEBUG)` to compare
//!     numerically.

use super::ast::{BinaryOp, CompareOp, Expr};
use super::ConditionError;
use crate::condiment::flags::FlagTable;
use std::cmp::Ordering;
use std::fmt;

/// Longest string `*` may build, in bytes.
const MAX_REPEAT_LEN: usize = 1 << 20;

/// A runtime value of the condition language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::None => false,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::None => "None",
        }
    }

    /// Booleans take part in arithmetic and comparisons as 0 and 1.
    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::None => f.write_str("None"),
        }
    }
}

fn eval_error(message: impl Into<String>) -> ConditionError {
    ConditionError::Evaluation(message.into())
}

/// Evaluate `expr` against the resolved flags.
pub fn evaluate(expr: &Expr, flags: &FlagTable) -> Result<Value, ConditionError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::None => Ok(Value::None),
        Expr::Name(name) => flags
            .get(name)
            .map(|value| Value::Str(value.to_string()))
            .ok_or_else(|| eval_error(format!("name `{}` is not defined", name))),
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, flags))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(function, args)
        }
        Expr::Neg(inner) => {
            let value = evaluate(inner, flags)?;
            let n = value
                .as_int()
                .ok_or_else(|| eval_error(format!("bad operand type for unary -: {}", value.type_name())))?;
            n.checked_neg()
                .map(Value::Int)
                .ok_or_else(|| eval_error("integer overflow"))
        }
        Expr::Not(inner) => Ok(Value::Bool(!evaluate(inner, flags)?.is_truthy())),
        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, flags)?;
            let rhs = evaluate(rhs, flags)?;
            binary(*op, lhs, rhs)
        }
        Expr::Compare { first, rest } => {
            let mut lhs = evaluate(first, flags)?;
            for (op, expr) in rest {
                let rhs = evaluate(expr, flags)?;
                if !compare(*op, &lhs, &rhs)? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(lhs, rhs) => {
            let lhs = evaluate(lhs, flags)?;
            if lhs.is_truthy() {
                evaluate(rhs, flags)
            } else {
                Ok(lhs)
            }
        }
        Expr::Or(lhs, rhs) => {
            let lhs = evaluate(lhs, flags)?;
            if lhs.is_truthy() {
                Ok(lhs)
            } else {
                evaluate(rhs, flags)
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ConditionError> {
    let unsupported = || {
        eval_error(format!(
            "unsupported operand types for {}: {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))
    };
    let overflow = || eval_error("integer overflow");

    match (op, &lhs, &rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinaryOp::Mul, Value::Str(s), other) | (BinaryOp::Mul, other, Value::Str(s)) => {
            let times = other.as_int().ok_or_else(unsupported)?;
            let times = usize::try_from(times).unwrap_or(0);
            match s.len().checked_mul(times) {
                Some(len) if len <= MAX_REPEAT_LEN => Ok(Value::Str(s.repeat(times))),
                _ => Err(eval_error("repeated string is too long")),
            }
        }
        _ => {
            let a = lhs.as_int().ok_or_else(unsupported)?;
            let b = rhs.as_int().ok_or_else(unsupported)?;
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => {
                    return Err(eval_error("integer division or modulo by zero"))
                }
                BinaryOp::FloorDiv => floor_div(a, b),
                BinaryOp::Mod => floor_div(a, b).and_then(|q| a.checked_sub(q.checked_mul(b)?)),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
    }
}

/// Division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, ConditionError> {
    match op {
        CompareOp::Eq => Ok(equals(lhs, rhs)),
        CompareOp::NotEq => Ok(!equals(lhs, rhs)),
        CompareOp::In => contains(rhs, lhs),
        CompareOp::NotIn => contains(rhs, lhs).map(|found| !found),
        CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => {
            let ordering = order(lhs, rhs).ok_or_else(|| {
                eval_error(format!(
                    "`{}` not supported between {} and {}",
                    op,
                    lhs.type_name(),
                    rhs.type_name()
                ))
            })?;
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::LtEq => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_int(), rhs.as_int()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn order(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => Some(lhs.as_int()?.cmp(&rhs.as_int()?)),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, ConditionError> {
    match (haystack, needle) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Str(_), other) => Err(eval_error(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (other, _) => Err(eval_error(format!(
            "argument of type {} is not a container",
            other.type_name()
        ))),
    }
}

/// The builtin conversions: `int`, `str`, `bool` and `len`.
fn call_builtin(function: &str, args: Vec<Value>) -> Result<Value, ConditionError> {
    let [arg]: [Value; 1] = args.try_into().map_err(|args: Vec<Value>| {
        eval_error(format!(
            "{}() takes exactly one argument ({} given)",
            function,
            args.len()
        ))
    })?;

    match function {
        "int" => match &arg {
            Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                eval_error(format!("invalid literal for int() with base 10: {:?}", s))
            }),
            Value::None => Err(eval_error("int() argument must be a string or a number, not None")),
            other => other
                .as_int()
                .map(Value::Int)
                .ok_or_else(|| eval_error("int() argument must be a string or a number")),
        },
        "str" => Ok(Value::Str(arg.to_string())),
        "bool" => Ok(Value::Bool(arg.is_truthy())),
        "len" => match &arg {
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            other => Err(eval_error(format!(
                "object of type {} has no len()",
                other.type_name()
            ))),
        },
        other => Err(eval_error(format!("name `{}` is not defined", other))),
    }
}
