use std::cmp::Ordering;

use dagsql_parser::ast::{BinaryOperator, Expr, FunctionArg};

use super::PhysicalExpr;
use crate::errors::{plan_err, Result};
use crate::plan::layout::ColumnLayout;
use crate::scalar::{Row, ScalarValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "min" => Self::Min,
            "max" => Self::Max,
            "avg" => Self::Avg,
            _ => return None,
        })
    }

    fn new_accumulator(&self) -> Accumulator {
        match self {
            Self::Count => Accumulator::Count(0),
            Self::Sum => Accumulator::Sum(None),
            Self::Min => Accumulator::Min(None),
            Self::Max => Accumulator::Max(None),
            Self::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }
}

/// A bound aggregate call.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFunction,
    /// Argument, `None` for `COUNT(*)`.
    pub arg: Option<PhysicalExpr>,
    /// Display of the original call, used as the output column name.
    pub display: String,
}

impl AggregateExpr {
    /// Try to bind an aggregate call, returning `None` if the expression
    /// isn't one.
    pub fn try_bind(expr: &Expr, layout: &ColumnLayout) -> Result<Option<AggregateExpr>> {
        let (name, args) = match expr {
            Expr::Function { name, args } => (name.normalized(), args),
            _ => return Ok(None),
        };
        let func = match AggregateFunction::from_name(&name) {
            Some(func) => func,
            None => return Ok(None),
        };

        let arg = match (func, args.as_slice()) {
            (AggregateFunction::Count, [FunctionArg::Wildcard]) => None,
            (_, [FunctionArg::Expr(arg)]) => Some(PhysicalExpr::bind(arg, layout)?),
            _ => return Err(plan_err!("Invalid arguments to aggregate {expr}")),
        };

        Ok(Some(AggregateExpr {
            func,
            arg,
            display: expr.to_string(),
        }))
    }

    /// Collect every aggregate call within the given expressions, skipping
    /// duplicates.
    pub fn collect<'a>(
        exprs: impl IntoIterator<Item = &'a Expr>,
        layout: &ColumnLayout,
    ) -> Result<Vec<AggregateExpr>> {
        let mut calls = Vec::new();
        for expr in exprs {
            expr.walk(&mut |e| {
                if matches!(e, Expr::Function { .. }) {
                    calls.push(e);
                }
            });
        }

        let mut aggs: Vec<AggregateExpr> = Vec::new();
        for call in calls {
            if let Some(agg) = Self::try_bind(call, layout)? {
                if !aggs.iter().any(|a| a.display == agg.display) {
                    aggs.push(agg);
                }
            }
        }
        Ok(aggs)
    }

    pub fn accumulator(&self) -> Accumulator {
        self.func.new_accumulator()
    }

    /// Feed a row into an accumulator for this aggregate.
    pub fn update(&self, acc: &mut Accumulator, row: &Row) -> Result<()> {
        let value = match &self.arg {
            Some(arg) => arg.eval(row)?,
            None => ScalarValue::Boolean(true),
        };
        acc.update(value)
    }
}

/// Running state of a single aggregate. NULL inputs are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count(i64),
    Sum(Option<ScalarValue>),
    Min(Option<ScalarValue>),
    Max(Option<ScalarValue>),
    Avg { sum: f64, count: i64 },
}

impl Accumulator {
    pub fn update(&mut self, value: ScalarValue) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        match self {
            Self::Count(n) => *n += 1,
            Self::Sum(sum) => {
                *sum = Some(match sum.take() {
                    Some(curr) => curr.binary_op(BinaryOperator::Plus, &value)?,
                    None => value,
                })
            }
            Self::Min(min) => {
                if Self::replaces(min, &value, Ordering::Less)? {
                    *min = Some(value);
                }
            }
            Self::Max(max) => {
                if Self::replaces(max, &value, Ordering::Greater)? {
                    *max = Some(value);
                }
            }
            Self::Avg { sum, count } => {
                let v = match value {
                    ScalarValue::Int64(v) => v as f64,
                    ScalarValue::Float64(v) => v,
                    other => return Err(plan_err!("Cannot average {other}")),
                };
                *sum += v;
                *count += 1;
            }
        }
        Ok(())
    }

    fn replaces(curr: &Option<ScalarValue>, value: &ScalarValue, want: Ordering) -> Result<bool> {
        Ok(match curr {
            None => true,
            Some(curr) => value.sql_cmp(curr)? == Some(want),
        })
    }

    pub fn finish(self) -> ScalarValue {
        match self {
            Self::Count(n) => ScalarValue::Int64(n),
            Self::Sum(v) | Self::Min(v) | Self::Max(v) => v.unwrap_or(ScalarValue::Null),
            Self::Avg { count: 0, .. } => ScalarValue::Null,
            Self::Avg { sum, count } => ScalarValue::Float64(sum / count as f64),
        }
    }
}
