// SPDX-License-Identifier: MIT

//! Evaluate conditions against workflow state

use serde_json::Value;

use super::ast::{CompareOp, Expression, Literal};
use crate::pausegraph::workflow::state::WorkflowState;

/// Evaluate a condition. Missing fields behave as `null`.
pub fn evaluate(expr: &Expression, state: &WorkflowState) -> bool {
    match expr {
        Expression::Const(value) => *value,
        Expression::Truthy(path) => is_truthy(state.get_path(path)),
        Expression::Compare { path, op, value } => compare(state.get_path(path), *op, value),
        Expression::And(left, right) => evaluate(left, state) && evaluate(right, state),
        Expression::Or(left, right) => evaluate(left, state) || evaluate(right, state),
        Expression::Not(inner) => !evaluate(inner, state),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn compare(left: Option<&Value>, op: CompareOp, right: &Literal) -> bool {
    let left = left.unwrap_or(&Value::Null);
    match op {
        CompareOp::Eq => matches(left, right),
        CompareOp::NotEq => !matches(left, right),
        CompareOp::Gt => ordered(left, right, |a, b| a > b),
        CompareOp::Gte => ordered(left, right, |a, b| a >= b),
        CompareOp::Lt => ordered(left, right, |a, b| a < b),
        CompareOp::Lte => ordered(left, right, |a, b| a <= b),
        CompareOp::Contains => contains(left, right),
    }
}

fn matches(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::Null, Literal::Null) => true,
        (Value::String(s), Literal::String(l)) => s == l,
        (Value::Bool(b), Literal::Boolean(l)) => b == l,
        (Value::Number(n), Literal::Number(l)) => n.as_f64() == Some(*l),
        _ => false,
    }
}

/// Numbers compare numerically, strings lexically; other pairs are false
fn ordered(value: &Value, literal: &Literal, cmp: fn(f64, f64) -> bool) -> bool {
    match (value, literal) {
        (Value::Number(n), Literal::Number(l)) => n.as_f64().is_some_and(|f| cmp(f, *l)),
        (Value::String(s), Literal::String(l)) => {
            let ordering = s.as_str().cmp(l.as_str()) as i8;
            cmp(f64::from(ordering), 0.0)
        }
        _ => false,
    }
}

fn contains(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::String(s), Literal::String(needle)) => s.contains(needle.as_str()),
        (Value::Array(items), literal) => items.iter().any(|item| matches(item, literal)),
        (Value::Object(map), Literal::String(key)) => map.contains_key(key),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pausegraph::workflow::condition::parse;
    use serde_json::json;

    fn check(condition: &str, state: &serde_json::Value) -> bool {
        let state = WorkflowState::from_value(state.clone()).unwrap();
        evaluate(&parse(condition).unwrap(), &state)
    }

    #[test]
    fn test_equality() {
        let state = json!({"binary_score": "yes", "approved": false, "attempts": 2});
        assert!(check("binary_score == 'yes'", &state));
        assert!(!check("binary_score == 'no'", &state));
        assert!(check("approved == false", &state));
        assert!(check("attempts == 2", &state));
        assert!(check("attempts != 3", &state));
    }

    #[test]
    fn test_missing_fields_are_null() {
        let state = json!({"result": null});
        assert!(check("result == null", &state));
        assert!(check("missing == null", &state));
        assert!(!check("missing == 'x'", &state));
        assert!(!check("missing > 1", &state));
    }

    #[test]
    fn test_ordering() {
        let state = json!({"score": 7.5, "grade": "b"});
        assert!(check("score > 5", &state));
        assert!(check("score >= 7.5", &state));
        assert!(!check("score < 7", &state));
        assert!(check("grade > 'a'", &state));
        assert!(check("grade <= 'b'", &state));
        assert!(!check("grade > 1", &state));
    }

    #[test]
    fn test_truthiness() {
        let state = json!({
            "approved": true,
            "feedback": "",
            "messages": [],
            "count": 0,
            "review": {"ok": "yes"}
        });
        assert!(check("approved", &state));
        assert!(!check("feedback", &state));
        assert!(!check("messages", &state));
        assert!(!check("count", &state));
        assert!(check("review", &state));
        assert!(!check("nothing", &state));
        assert!(check("not feedback and approved", &state));
    }

    #[test]
    fn test_contains() {
        let state = json!({
            "message": "hello world",
            "tags": ["bug", 3, true],
            "meta": {"owner": "me"}
        });
        assert!(check("message contains 'world'", &state));
        assert!(!check("message contains 'mars'", &state));
        assert!(check("tags contains 'bug'", &state));
        assert!(check("tags contains 3", &state));
        assert!(check("tags contains true", &state));
        assert!(check("meta contains 'owner'", &state));
    }

    #[test]
    fn test_nested_paths_and_grouping() {
        let state = json!({"review": {"grade": "funny"}, "attempts": 4});
        assert!(check("review.grade == 'funny'", &state));
        assert!(check("(review.grade == 'dull' or attempts > 3) and true", &state));
        assert!(!check("not (review.grade == 'funny')", &state));
    }
}
