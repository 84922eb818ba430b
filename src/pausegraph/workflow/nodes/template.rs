// SPDX-License-Identifier: MIT

//! `{field}` prompt templates rendered from workflow state

use serde_json::Value;

use crate::pausegraph::workflow::state::WorkflowState;

/// Replace `{path}` placeholders with state values
///
/// Paths use dot notation (`{review.grade}`). Missing fields render as an
/// empty string. `{{` and `}}` produce literal braces.
pub fn render(template: &str, state: &WorkflowState) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            match tail.find('}') {
                Some(close) => {
                    let path = tail[1..close].trim();
                    if let Some(value) = state.get_path(path) {
                        out.push_str(&value_to_text(value));
                    }
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Readable text for a JSON value: strings unquoted, arrays as bullet lines
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("- {}", value_to_text(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_to_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Follow a dot-separated path into a JSON value
pub fn extract_json_path(json: &Value, path: &str) -> Option<Value> {
    path.split('.')
        .try_fold(json, |current, part| current.get(part))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> WorkflowState {
        WorkflowState::from_value(json!({
            "topic": "cats",
            "review": {"grade": "funny"},
            "tags": ["a", "b"],
            "attempts": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_render_fields_and_paths() {
        assert_eq!(
            render("Write a joke about {topic} ({review.grade}, try {attempts})", &state()),
            "Write a joke about cats (funny, try 2)"
        );
    }

    #[test]
    fn test_render_missing_and_escapes() {
        assert_eq!(render("[{missing}]", &state()), "[]");
        assert_eq!(render("{{\"k\": 1}}", &state()), "{\"k\": 1}");
        assert_eq!(render("open { only", &state()), "open { only");
        assert_eq!(render("stray } brace", &state()), "stray } brace");
    }

    #[test]
    fn test_render_arrays() {
        assert_eq!(render("{tags}", &state()), "- a\n- b");
    }

    #[test]
    fn test_extract_json_path() {
        let json = json!({"result": {"data": {"value": 42}}});
        assert_eq!(extract_json_path(&json, "result.data.value"), Some(json!(42)));
        assert_eq!(
            extract_json_path(&json, "result.data"),
            Some(json!({"value": 42}))
        );
        assert_eq!(extract_json_path(&json, "nonexistent"), None);
    }
}
