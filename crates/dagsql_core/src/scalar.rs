use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use dagsql_parser::ast::{BinaryOperator, Literal};

use crate::errors::{ExecError, Result};
use crate::schema::DataType;

/// A single value.
#[derive(Debug, Clone, Default)]
pub enum ScalarValue {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

// Floats are compared and hashed by their bit pattern so values can be used
// as group and distinct keys.
impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => (),
            Self::Boolean(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.to_bits().hash(state),
            Self::Utf8(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn datatype(&self) -> Option<DataType> {
        Some(match self {
            Self::Null => return None,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
        })
    }

    /// Try to interpret this value as a boolean. NULL returns `None`.
    pub fn try_as_bool(&self) -> Result<Option<bool>> {
        match self {
            Self::Null => Ok(None),
            Self::Boolean(v) => Ok(Some(*v)),
            other => Err(ExecError::Runtime(format!(
                "Expected a boolean value, got {other}"
            ))),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Compare two values with SQL semantics. Comparing against NULL returns
    /// `None`.
    pub fn sql_cmp(&self, other: &ScalarValue) -> Result<Option<Ordering>> {
        let ord = match (self, other) {
            (Self::Null, _) | (_, Self::Null) => return Ok(None),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => {
                    return Err(ExecError::Runtime(format!(
                        "Cannot compare {a} with {b}"
                    )))
                }
            },
        };
        Ok(Some(ord))
    }

    /// Apply a binary operator.
    pub fn binary_op(&self, op: BinaryOperator, other: &ScalarValue) -> Result<ScalarValue> {
        match op {
            BinaryOperator::And => {
                let (a, b) = (self.try_as_bool()?, other.try_as_bool()?);
                Ok(match (a, b) {
                    (Some(false), _) | (_, Some(false)) => false.into(),
                    (Some(true), Some(true)) => true.into(),
                    _ => ScalarValue::Null,
                })
            }
            BinaryOperator::Or => {
                let (a, b) = (self.try_as_bool()?, other.try_as_bool()?);
                Ok(match (a, b) {
                    (Some(true), _) | (_, Some(true)) => true.into(),
                    (Some(false), Some(false)) => false.into(),
                    _ => ScalarValue::Null,
                })
            }
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => {
                let ord = match self.sql_cmp(other)? {
                    Some(ord) => ord,
                    None => return Ok(ScalarValue::Null),
                };
                let b = match op {
                    BinaryOperator::Eq => ord == Ordering::Equal,
                    BinaryOperator::NotEq => ord != Ordering::Equal,
                    BinaryOperator::Lt => ord == Ordering::Less,
                    BinaryOperator::LtEq => ord != Ordering::Greater,
                    BinaryOperator::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                };
                Ok(b.into())
            }
            BinaryOperator::Plus
            | BinaryOperator::Minus
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => self.arith(op, other),
        }
    }

    fn arith(&self, op: BinaryOperator, other: &ScalarValue) -> Result<ScalarValue> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(ScalarValue::Null),
            (Self::Int64(a), Self::Int64(b)) => {
                let (a, b) = (*a, *b);
                let v = match op {
                    BinaryOperator::Plus => a.checked_add(b),
                    BinaryOperator::Minus => a.checked_sub(b),
                    BinaryOperator::Multiply => a.checked_mul(b),
                    BinaryOperator::Divide | BinaryOperator::Modulo if b == 0 => {
                        return Err(ExecError::Runtime("Division by zero".to_string()))
                    }
                    BinaryOperator::Divide => a.checked_div(b),
                    _ => a.checked_rem(b),
                };
                v.map(ScalarValue::Int64).ok_or_else(|| {
                    ExecError::Runtime(format!("Integer overflow evaluating {a} {op} {b}"))
                })
            }
            (Self::Utf8(a), Self::Utf8(b)) if op == BinaryOperator::Plus => {
                Ok(ScalarValue::Utf8(format!("{a}{b}")))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => Ok(ScalarValue::Float64(match op {
                    BinaryOperator::Plus => a + b,
                    BinaryOperator::Minus => a - b,
                    BinaryOperator::Multiply => a * b,
                    BinaryOperator::Divide => a / b,
                    _ => a % b,
                })),
                _ => Err(ExecError::Runtime(format!(
                    "Cannot apply {op} to {a} and {b}"
                ))),
            },
        }
    }

    pub fn negate(&self) -> Result<ScalarValue> {
        match self {
            Self::Null => Ok(ScalarValue::Null),
            Self::Int64(v) => v
                .checked_neg()
                .map(ScalarValue::Int64)
                .ok_or_else(|| ExecError::Runtime(format!("Integer overflow negating {v}"))),
            Self::Float64(v) => Ok(ScalarValue::Float64(-v)),
            other => Err(ExecError::Runtime(format!("Cannot negate {other}"))),
        }
    }

    pub fn not(&self) -> Result<ScalarValue> {
        Ok(match self.try_as_bool()? {
            Some(v) => (!v).into(),
            None => ScalarValue::Null,
        })
    }

    /// Cast to the given type. NULL casts to NULL.
    pub fn cast_to(&self, datatype: DataType) -> Result<ScalarValue> {
        let err = || ExecError::Runtime(format!("Cannot cast {self} to {datatype}"));
        Ok(match (self, datatype) {
            (Self::Null, _) => ScalarValue::Null,
            (Self::Boolean(_), DataType::Boolean)
            | (Self::Int64(_), DataType::Int64)
            | (Self::Float64(_), DataType::Float64)
            | (Self::Utf8(_), DataType::Utf8) => self.clone(),
            (Self::Int64(v), DataType::Float64) => ScalarValue::Float64(*v as f64),
            (Self::Float64(v), DataType::Int64) if v.fract() == 0.0 => {
                ScalarValue::Int64(*v as i64)
            }
            (Self::Utf8(s), DataType::Int64) => {
                ScalarValue::Int64(s.trim().parse().map_err(|_| err())?)
            }
            (Self::Utf8(s), DataType::Float64) => {
                ScalarValue::Float64(s.trim().parse().map_err(|_| err())?)
            }
            (Self::Utf8(s), DataType::Boolean) => match s.trim().to_lowercase().as_str() {
                "true" | "t" => ScalarValue::Boolean(true),
                "false" | "f" => ScalarValue::Boolean(false),
                _ => return Err(err()),
            },
            (v, DataType::Utf8) => ScalarValue::Utf8(v.to_string()),
            _ => return Err(err()),
        })
    }

    pub fn from_literal(literal: &Literal) -> Result<ScalarValue> {
        Ok(match literal {
            Literal::Null => ScalarValue::Null,
            Literal::Boolean(v) => ScalarValue::Boolean(*v),
            Literal::SingleQuotedString(s) => ScalarValue::Utf8(s.clone()),
            Literal::Number(n) => {
                if let Ok(v) = n.parse::<i64>() {
                    ScalarValue::Int64(v)
                } else {
                    ScalarValue::Float64(n.parse::<f64>().map_err(|_| {
                        ExecError::Plan(format!("Invalid number literal: {n}"))
                    })?)
                }
            }
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<ScalarValue> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => ScalarValue::Null,
            Value::Bool(v) => ScalarValue::Boolean(*v),
            Value::Number(n) => match n.as_i64() {
                Some(v) => ScalarValue::Int64(v),
                None => ScalarValue::Float64(n.as_f64().ok_or_else(|| {
                    ExecError::Plan(format!("Unsupported number: {n}"))
                })?),
            },
            Value::String(s) => ScalarValue::Utf8(s.clone()),
            other => {
                return Err(ExecError::Plan(format!(
                    "Unsupported JSON value: {other}"
                )))
            }
        })
    }
}

/// A single row of values flowing between tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Row(pub Vec<ScalarValue>);

impl Row {
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Row(values)
    }

    pub fn empty() -> Self {
        Row(Vec::new())
    }

    /// Row of `width` NULLs.
    pub fn nulls(width: usize) -> Self {
        Row(vec![ScalarValue::Null; width])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ScalarValue> {
        self.0.get(idx)
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.0
    }

    /// Concatenate two rows, used for joins.
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.0);
        values.extend_from_slice(&other.0);
        Row(values)
    }
}

impl From<Vec<ScalarValue>> for Row {
    fn from(value: Vec<ScalarValue>) -> Self {
        Row(value)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<_> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", strs.join("\t"))
    }
}
