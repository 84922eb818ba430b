// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{ReducerType, StateSchema};
use crate::adk::error::ReduceError;

/// Runtime workflow state
///
/// An ordered mapping of field name to JSON value. The engine changes it only
/// by applying a node's [`StateUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState {
    fields: Map<String, Value>,
}

/// Partial state update returned by a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateUpdate {
    fields: Map<String, Value>,
}

impl WorkflowState {
    /// Create a new WorkflowState holding the schema's defaults
    pub fn new(schema: &StateSchema) -> Self {
        Self::empty().with_defaults(schema)
    }

    /// Create an empty WorkflowState
    pub fn empty() -> Self {
        Self { fields: Map::new() }
    }

    /// Build state from a JSON object. Returns `None` for non-object values.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Fill fields that are missing with the schema's defaults
    pub fn with_defaults(mut self, schema: &StateSchema) -> Self {
        for (name, def) in &schema.fields {
            if let Some(default) = &def.default {
                self.fields
                    .entry(name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
        self
    }

    /// Merge a partial update using the schema's reducers
    ///
    /// Keys present in the update are reduced into the state; keys absent
    /// from the update keep their current values. The merge is all or
    /// nothing: if any field cannot be reduced the state is left unchanged.
    pub fn apply(&mut self, update: &StateUpdate, schema: &StateSchema) -> Result<(), ReduceError> {
        let mut merged = self.fields.clone();
        for (key, value) in update.iter() {
            if let Some(def) = schema.fields.get(key) {
                if !def.field_type.accepts(value) {
                    log::warn!(
                        "State field '{}' declared as {:?} received {}",
                        key,
                        def.field_type,
                        value
                    );
                }
            }
            reduce(&mut merged, key, value.clone(), schema.reducer(key))?;
        }
        self.fields = merged;
        Ok(())
    }

    /// Overwrite a single field
    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a boolean field
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    /// Get a nested field value using dot notation (e.g., "review.grade")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn reduce(
    fields: &mut Map<String, Value>,
    key: &str,
    value: Value,
    reducer: ReducerType,
) -> Result<(), ReduceError> {
    let reject = |message: String| ReduceError {
        field: key.to_string(),
        reducer: reducer.clone(),
        message,
    };

    match reducer {
        ReducerType::Overwrite => {
            fields.insert(key.to_string(), value);
        }
        ReducerType::Append => match fields.get_mut(key) {
            None | Some(Value::Null) => {
                let items = match value {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                fields.insert(key.to_string(), Value::Array(items));
            }
            Some(Value::Array(items)) => match value {
                Value::Array(new_items) => items.extend(new_items),
                other => items.push(other),
            },
            Some(current) => {
                return Err(reject(format!("current value {} is not an array", current)));
            }
        },
        ReducerType::Max | ReducerType::Min => {
            let Some(new) = value.as_f64() else {
                return Err(reject(format!("{} is not a number", value)));
            };
            let replace = match fields.get(key) {
                None | Some(Value::Null) => true,
                Some(current) => {
                    let Some(current) = current.as_f64() else {
                        return Err(reject(format!("current value {} is not a number", current)));
                    };
                    if reducer == ReducerType::Max {
                        new > current
                    } else {
                        new < current
                    }
                }
            };
            if replace {
                fields.insert(key.to_string(), value);
            }
        }
        ReducerType::Merge => {
            let Value::Object(new_obj) = value else {
                return Err(reject(format!("{} is not an object", value)));
            };
            match fields.get_mut(key) {
                None | Some(Value::Null) => {
                    fields.insert(key.to_string(), Value::Object(new_obj));
                }
                Some(Value::Object(current)) => current.extend(new_obj),
                Some(current) => {
                    return Err(reject(format!("current value {} is not an object", current)));
                }
            }
        }
    }
    Ok(())
}

impl From<Map<String, Value>> for WorkflowState {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Build an update from a JSON object. Returns `None` for non-object values.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Map<String, Value>> for StateUpdate {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pausegraph::workflow::state::schema::{FieldType, StateFieldDef};
    use serde_json::json;

    fn make_schema(fields: Vec<(&str, FieldType, ReducerType, Option<Value>)>) -> StateSchema {
        let mut schema = StateSchema::default();
        for (name, field_type, reducer, default) in fields {
            schema.fields.insert(
                name.to_string(),
                StateFieldDef {
                    field_type,
                    reducer,
                    default,
                },
            );
        }
        schema
    }

    fn apply_one(state: &mut WorkflowState, schema: &StateSchema, key: &str, value: Value) {
        state
            .apply(&StateUpdate::new().set(key, value), schema)
            .unwrap();
    }

    fn try_apply(
        state: &mut WorkflowState,
        schema: &StateSchema,
        key: &str,
        value: Value,
    ) -> Result<(), ReduceError> {
        state.apply(&StateUpdate::new().set(key, value), schema)
    }

    #[test]
    fn test_empty_state() {
        let state = WorkflowState::empty();
        assert!(state.get("anything").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_with_defaults() {
        let schema = make_schema(vec![
            (
                "attempts",
                FieldType::Number,
                ReducerType::Overwrite,
                Some(json!(0)),
            ),
            (
                "user_feedback",
                FieldType::String,
                ReducerType::Overwrite,
                Some(json!("")),
            ),
        ]);
        let state = WorkflowState::new(&schema);

        assert_eq!(state.get("attempts"), Some(&json!(0)));
        assert_eq!(state.get("user_feedback"), Some(&json!("")));
    }

    #[test]
    fn test_defaults_do_not_override_initial_values() {
        let schema = make_schema(vec![(
            "topic",
            FieldType::String,
            ReducerType::Overwrite,
            Some(json!("cats")),
        )]);
        let state = WorkflowState::from_value(json!({"topic": "dogs"}))
            .unwrap()
            .with_defaults(&schema);
        assert_eq!(state.get_str("topic"), Some("dogs"));
    }

    #[test]
    fn test_apply_is_shallow_merge() {
        let mut state = WorkflowState::from_value(json!({"input": "hi", "score": null})).unwrap();
        state
            .apply(
                &StateUpdate::new().set("score", "yes"),
                &StateSchema::default(),
            )
            .unwrap();

        assert_eq!(state.get_str("input"), Some("hi"));
        assert_eq!(state.get_str("score"), Some("yes"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_append_reducer() {
        let schema = make_schema(vec![(
            "messages",
            FieldType::Array,
            ReducerType::Append,
            None,
        )]);
        let mut state = WorkflowState::new(&schema);

        apply_one(&mut state, &schema, "messages", json!("m1"));
        assert_eq!(state.get("messages"), Some(&json!(["m1"])));

        apply_one(&mut state, &schema, "messages", json!(["m2", "m3"]));
        assert_eq!(state.get("messages"), Some(&json!(["m1", "m2", "m3"])));
    }

    #[test]
    fn test_append_onto_null_initial_value() {
        let schema = make_schema(vec![(
            "messages",
            FieldType::Array,
            ReducerType::Append,
            None,
        )]);
        let mut state = WorkflowState::from_value(json!({"messages": null})).unwrap();
        apply_one(&mut state, &schema, "messages", json!("first"));
        assert_eq!(state.get("messages"), Some(&json!(["first"])));
    }

    #[test]
    fn test_max_reducer() {
        let schema = make_schema(vec![("score", FieldType::Number, ReducerType::Max, None)]);
        let mut state = WorkflowState::new(&schema);

        apply_one(&mut state, &schema, "score", json!(5.0));
        apply_one(&mut state, &schema, "score", json!(3.0));
        assert_eq!(state.get("score"), Some(&json!(5.0)));

        apply_one(&mut state, &schema, "score", json!(8.0));
        assert_eq!(state.get("score"), Some(&json!(8.0)));
    }

    #[test]
    fn test_min_reducer() {
        let schema = make_schema(vec![("cost", FieldType::Number, ReducerType::Min, None)]);
        let mut state = WorkflowState::new(&schema);

        apply_one(&mut state, &schema, "cost", json!(10.0));
        apply_one(&mut state, &schema, "cost", json!(15.0));
        assert_eq!(state.get("cost"), Some(&json!(10.0)));

        apply_one(&mut state, &schema, "cost", json!(5.0));
        assert_eq!(state.get("cost"), Some(&json!(5.0)));
    }

    #[test]
    fn test_merge_reducer() {
        let schema = make_schema(vec![("meta", FieldType::Object, ReducerType::Merge, None)]);
        let mut state = WorkflowState::new(&schema);

        apply_one(&mut state, &schema, "meta", json!({"a": 1}));
        apply_one(&mut state, &schema, "meta", json!({"b": 2}));
        apply_one(&mut state, &schema, "meta", json!({"a": 10}));
        assert_eq!(state.get("meta"), Some(&json!({"a": 10, "b": 2})));
    }

    #[test]
    fn test_append_onto_scalar_is_rejected() {
        let schema = make_schema(vec![("messages", FieldType::Array, ReducerType::Append, None)]);
        let mut state = WorkflowState::from_value(json!({"messages": "hi"})).unwrap();

        let err = try_apply(&mut state, &schema, "messages", json!(["reply"])).unwrap_err();
        assert_eq!(err.field, "messages");
        assert_eq!(err.reducer, ReducerType::Append);
        assert_eq!(state.get("messages"), Some(&json!("hi")));
    }

    #[test]
    fn test_max_min_reject_non_numbers() {
        let schema = make_schema(vec![
            ("best", FieldType::Number, ReducerType::Max, None),
            ("cheapest", FieldType::Number, ReducerType::Min, None),
        ]);
        let mut state = WorkflowState::from_value(json!({"best": 3, "cheapest": "n/a"})).unwrap();

        let err = try_apply(&mut state, &schema, "best", json!("oops")).unwrap_err();
        assert_eq!(err.reducer, ReducerType::Max);
        assert_eq!(state.get("best"), Some(&json!(3)));

        let err = try_apply(&mut state, &schema, "cheapest", json!(2)).unwrap_err();
        assert_eq!(err.reducer, ReducerType::Min);
        assert_eq!(state.get("cheapest"), Some(&json!("n/a")));
    }

    #[test]
    fn test_merge_rejects_non_objects() {
        let schema = make_schema(vec![("meta", FieldType::Object, ReducerType::Merge, None)]);
        let mut state = WorkflowState::from_value(json!({"meta": {"a": 1}})).unwrap();
        assert!(try_apply(&mut state, &schema, "meta", json!([1])).is_err());

        let mut state = WorkflowState::from_value(json!({"meta": 7})).unwrap();
        assert!(try_apply(&mut state, &schema, "meta", json!({"b": 2})).is_err());
        assert_eq!(state.get("meta"), Some(&json!(7)));
    }

    #[test]
    fn test_failed_field_leaves_whole_update_unapplied() {
        let schema = make_schema(vec![("best", FieldType::Number, ReducerType::Max, None)]);
        let mut state = WorkflowState::from_value(json!({"best": 3, "note": "old"})).unwrap();

        let update = StateUpdate::new().set("note", "new").set("best", "oops");
        assert!(state.apply(&update, &schema).is_err());
        assert_eq!(state.to_json(), json!({"best": 3, "note": "old"}));
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let mut state = WorkflowState::from_value(json!({"topic": "cats"})).unwrap();
        state
            .apply(
                &StateUpdate::new().set("joke", "meow").set("approved", true),
                &StateSchema::default(),
            )
            .unwrap();

        let keys: Vec<&String> = state.keys().collect();
        assert_eq!(keys, vec!["topic", "joke", "approved"]);
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"topic":"cats","joke":"meow","approved":true}"#
        );
    }

    #[test]
    fn test_get_path() {
        let mut state = WorkflowState::empty();
        state.set("review", json!({"grade": {"value": "funny"}}));

        assert_eq!(state.get_path("review.grade.value"), Some(&json!("funny")));
        assert_eq!(state.get_path("review.nonexistent"), None);
        assert_eq!(state.get_path("missing"), None);
    }

    #[test]
    fn test_serde_is_plain_object() {
        let mut state = WorkflowState::empty();
        state.set("a", json!(1));
        state.set("b", json!("hello"));

        let text = serde_json::to_string(&state).unwrap();
        assert_eq!(text, r#"{"a":1,"b":"hello"}"#);

        let back: WorkflowState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(WorkflowState::from_value(json!("text")).is_none());
        assert!(StateUpdate::from_value(json!([1, 2])).is_none());
    }
}
