// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::fmt;

/// Parsed condition
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `path op literal`
    Compare {
        path: String,
        op: CompareOp,
        value: Literal,
    },
    /// Bare field reference, true when the value is truthy
    Truthy(String),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Const(bool),
}

impl Expression {
    pub fn and(self, other: Expression) -> Self {
        Expression::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expression) -> Self {
        Expression::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Expression::Not(Box::new(self))
    }

    pub fn compare(path: impl Into<String>, op: CompareOp, value: Literal) -> Self {
        Expression::Compare {
            path: path.into(),
            op,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring for strings, membership for arrays
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Contains => "contains",
        };
        f.write_str(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let expr = Expression::compare("a", CompareOp::Eq, Literal::Boolean(true))
            .and(Expression::Truthy("b".to_string()).negate());
        assert!(matches!(expr, Expression::And(_, ref right) if matches!(**right, Expression::Not(_))));
    }

    #[test]
    fn test_literal_to_json() {
        assert_eq!(Literal::Number(2.5).to_json(), json!(2.5));
        assert_eq!(Literal::String("yes".to_string()).to_json(), json!("yes"));
        assert_eq!(Literal::Null.to_json(), json!(null));
        assert_eq!(CompareOp::Contains.to_string(), "contains");
    }
}
