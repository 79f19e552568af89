//! Expressions bound to row positions.
pub mod aggregate;

use std::fmt;

use dagsql_parser::ast::{BinaryOperator, Expr, FunctionArg, UnaryOperator};

pub use aggregate::{AggregateExpr, AggregateFunction};

use crate::errors::{plan_err, ExecError, Result};
use crate::plan::layout::ColumnLayout;
use crate::scalar::{Row, ScalarValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunction {
    Lower,
    Upper,
    Length,
    Abs,
    Coalesce,
}

impl ScalarFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "lower" => Self::Lower,
            "upper" => Self::Upper,
            "length" => Self::Length,
            "abs" => Self::Abs,
            "coalesce" => Self::Coalesce,
            _ => return None,
        })
    }

    fn check_args(&self, num: usize) -> Result<()> {
        let ok = match self {
            Self::Coalesce => num >= 1,
            _ => num == 1,
        };
        if !ok {
            return Err(plan_err!("Invalid number of arguments to {self}: {num}"));
        }
        Ok(())
    }

    fn eval(&self, mut args: Vec<ScalarValue>) -> Result<ScalarValue> {
        if *self == Self::Coalesce {
            return Ok(args
                .into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(ScalarValue::Null));
        }

        let arg = args.pop().unwrap_or_default();
        Ok(match (self, arg) {
            (_, ScalarValue::Null) => ScalarValue::Null,
            (Self::Lower, ScalarValue::Utf8(s)) => ScalarValue::Utf8(s.to_lowercase()),
            (Self::Upper, ScalarValue::Utf8(s)) => ScalarValue::Utf8(s.to_uppercase()),
            (Self::Length, ScalarValue::Utf8(s)) => ScalarValue::Int64(s.chars().count() as i64),
            (Self::Abs, ScalarValue::Int64(v)) => ScalarValue::Int64(v.checked_abs().ok_or_else(
                || ExecError::Runtime(format!("Integer overflow evaluating abs({v})")),
            )?),
            (Self::Abs, ScalarValue::Float64(v)) => ScalarValue::Float64(v.abs()),
            (_, other) => {
                return Err(ExecError::Runtime(format!(
                    "Invalid argument to {self}: {other}"
                )))
            }
        })
    }
}

impl fmt::Display for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Length => "length",
            Self::Abs => "abs",
            Self::Coalesce => "coalesce",
        };
        write!(f, "{s}")
    }
}

/// An expression with all column references resolved to row positions.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalExpr {
    Column(usize),
    Literal(ScalarValue),
    Unary {
        op: UnaryOperator,
        expr: Box<PhysicalExpr>,
    },
    Binary {
        left: Box<PhysicalExpr>,
        op: BinaryOperator,
        right: Box<PhysicalExpr>,
    },
    IsNull {
        expr: Box<PhysicalExpr>,
        negated: bool,
    },
    Function {
        func: ScalarFunction,
        args: Vec<PhysicalExpr>,
    },
}

impl PhysicalExpr {
    /// Bind an expression against the layout of the rows it'll be evaluated
    /// on.
    ///
    /// Computed columns (aggregate outputs, group keys) are matched by the
    /// display of the whole expression before looking at its parts.
    pub fn bind(expr: &Expr, layout: &ColumnLayout) -> Result<PhysicalExpr> {
        if !matches!(expr, Expr::Ident(_) | Expr::CompoundIdent(_) | Expr::Literal(_)) {
            if let Some(idx) = layout.find_computed(&expr.to_string()) {
                return Ok(PhysicalExpr::Column(idx));
            }
        }

        Ok(match expr {
            Expr::Ident(ident) => {
                PhysicalExpr::Column(layout.resolve(None, &ident.normalized())?)
            }
            Expr::CompoundIdent(idents) => {
                let (relation, column) = match idents.as_slice() {
                    [.., relation, column] => (relation, column),
                    _ => return Err(plan_err!("Invalid column reference: {expr}")),
                };
                PhysicalExpr::Column(
                    layout.resolve(Some(&relation.normalized()), &column.normalized())?,
                )
            }
            Expr::Literal(lit) => PhysicalExpr::Literal(ScalarValue::from_literal(lit)?),
            Expr::UnaryExpr { op, expr } => PhysicalExpr::Unary {
                op: *op,
                expr: Box::new(Self::bind(expr, layout)?),
            },
            Expr::BinaryExpr { left, op, right } => PhysicalExpr::Binary {
                left: Box::new(Self::bind(left, layout)?),
                op: *op,
                right: Box::new(Self::bind(right, layout)?),
            },
            Expr::IsNull { expr, negated } => PhysicalExpr::IsNull {
                expr: Box::new(Self::bind(expr, layout)?),
                negated: *negated,
            },
            Expr::Nested(expr) => Self::bind(expr, layout)?,
            Expr::Function { name, args } => {
                let name = name.normalized();
                if AggregateFunction::from_name(&name).is_some() {
                    return Err(plan_err!(
                        "Aggregate {expr} not allowed here, it must be part of a select list or HAVING"
                    ));
                }
                let func = ScalarFunction::from_name(&name)
                    .ok_or_else(|| plan_err!("Unknown function: {name}"))?;
                func.check_args(args.len())?;
                let args = args
                    .iter()
                    .map(|arg| match arg {
                        FunctionArg::Expr(expr) => Self::bind(expr, layout),
                        FunctionArg::Wildcard => Err(plan_err!("Unexpected * in {expr}")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                PhysicalExpr::Function { func, args }
            }
        })
    }

    /// Bind an expression that may not reference any columns.
    pub fn bind_constant(expr: &Expr) -> Result<PhysicalExpr> {
        Self::bind(expr, &ColumnLayout::empty())
    }

    pub fn eval(&self, row: &Row) -> Result<ScalarValue> {
        Ok(match self {
            PhysicalExpr::Column(idx) => row
                .get(*idx)
                .cloned()
                .ok_or_else(|| ExecError::Runtime(format!("Column {idx} out of range")))?,
            PhysicalExpr::Literal(v) => v.clone(),
            PhysicalExpr::Unary { op, expr } => {
                let v = expr.eval(row)?;
                match op {
                    UnaryOperator::Plus => v,
                    UnaryOperator::Minus => v.negate()?,
                    UnaryOperator::Not => v.not()?,
                }
            }
            PhysicalExpr::Binary { left, op, right } => {
                let l = left.eval(row)?;
                // Avoid evaluating the right side when the result is known.
                match (op, l.try_as_bool()) {
                    (BinaryOperator::And, Ok(Some(false))) => return Ok(false.into()),
                    (BinaryOperator::Or, Ok(Some(true))) => return Ok(true.into()),
                    _ => (),
                }
                let r = right.eval(row)?;
                l.binary_op(*op, &r)?
            }
            PhysicalExpr::IsNull { expr, negated } => {
                let v = expr.eval(row)?;
                (v.is_null() != *negated).into()
            }
            PhysicalExpr::Function { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(row))
                    .collect::<Result<Vec<_>>>()?;
                func.eval(args)?
            }
        })
    }

    /// Evaluate as a predicate. NULL is treated as false.
    pub fn eval_predicate(&self, row: &Row) -> Result<bool> {
        Ok(self.eval(row)?.try_as_bool()?.unwrap_or(false))
    }
}

/// Output column name for a select list expression.
pub fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Ident(ident) => ident.normalized(),
        Expr::CompoundIdent(idents) => idents
            .last()
            .map(|i| i.normalized())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use dagsql_parser::ast::{Ident, Literal};

    use super::*;
    use crate::plan::layout::LayoutColumn;

    fn layout() -> ColumnLayout {
        ColumnLayout::new(vec![
            LayoutColumn::new(Some("t".to_string()), "a"),
            LayoutColumn::new(Some("t".to_string()), "b"),
            LayoutColumn::new(None, "count(*)"),
        ])
    }

    fn ident(s: &str) -> Expr {
        Expr::Ident(Ident::new(s))
    }

    fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn number(n: i64) -> Expr {
        Expr::Literal(Literal::Number(n.to_string()))
    }

    #[test]
    fn bind_and_eval_arith() {
        let expr = binary(ident("a"), BinaryOperator::Plus, ident("b"));
        let bound = PhysicalExpr::bind(&expr, &layout()).unwrap();
        let row = Row::new(vec![1.into(), 2.into(), 0.into()]);
        assert_eq!(ScalarValue::Int64(3), bound.eval(&row).unwrap());
    }

    #[test]
    fn bind_computed_column() {
        let expr = binary(
            Expr::Function {
                name: Ident::new("COUNT"),
                args: vec![FunctionArg::Wildcard],
            },
            BinaryOperator::Gt,
            number(1),
        );
        let bound = PhysicalExpr::bind(&expr, &layout()).unwrap();
        let expected = PhysicalExpr::Binary {
            left: Box::new(PhysicalExpr::Column(2)),
            op: BinaryOperator::Gt,
            right: Box::new(PhysicalExpr::Literal(ScalarValue::Int64(1))),
        };
        assert_eq!(expected, bound);
    }

    #[test]
    fn aggregate_outside_group() {
        let expr = Expr::Function {
            name: Ident::new("sum"),
            args: vec![FunctionArg::Expr(ident("a"))],
        };
        PhysicalExpr::bind(&expr, &layout()).unwrap_err();
    }

    #[test]
    fn scalar_functions() {
        let expr = Expr::Function {
            name: Ident::new("upper"),
            args: vec![FunctionArg::Expr(Expr::Literal(Literal::SingleQuotedString(
                "abc".to_string(),
            )))],
        };
        let bound = PhysicalExpr::bind_constant(&expr).unwrap();
        assert_eq!(
            ScalarValue::from("ABC"),
            bound.eval(&Row::empty()).unwrap()
        );

        let expr = Expr::Function {
            name: Ident::new("coalesce"),
            args: vec![
                FunctionArg::Expr(Expr::Literal(Literal::Null)),
                FunctionArg::Expr(number(4)),
            ],
        };
        let bound = PhysicalExpr::bind_constant(&expr).unwrap();
        assert_eq!(ScalarValue::Int64(4), bound.eval(&Row::empty()).unwrap());
    }

    #[test]
    fn null_predicate_is_false() {
        let expr = binary(ident("a"), BinaryOperator::Eq, number(1));
        let bound = PhysicalExpr::bind(&expr, &layout()).unwrap();
        let row = Row::new(vec![ScalarValue::Null, 2.into(), 0.into()]);
        assert!(!bound.eval_predicate(&row).unwrap());
    }
}
