// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Schema declaring types, reducers and defaults for workflow state fields
///
/// Fields that are not declared are accepted as-is and always overwritten.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field
    pub fn with_field(mut self, name: impl Into<String>, def: StateFieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Reducer used when merging `key`
    pub fn reducer(&self, key: &str) -> ReducerType {
        self.fields
            .get(key)
            .map(|def| def.reducer.clone())
            .unwrap_or_default()
    }
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    pub default: Option<Value>,
}

impl StateFieldDef {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            reducer: ReducerType::default(),
            default: None,
        }
    }

    pub fn reducer(mut self, reducer: ReducerType) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Supported field types
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Any JSON value
    Any,
}

impl FieldType {
    /// Whether `value` fits this type. `null` fits every type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (FieldType::Any, _) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
    /// Keep maximum value
    Max,
    /// Keep minimum value
    Min,
    /// Shallow merge objects
    Merge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_schema_deserialize() {
        let yaml = r#"
            topic:
              type: string
            attempts:
              type: number
              default: 0
            messages:
              type: array
              reducer: append
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields["topic"].field_type, FieldType::String);
        assert_eq!(schema.fields["attempts"].default, Some(json!(0)));
        assert_eq!(schema.fields["messages"].reducer, ReducerType::Append);
    }

    #[test]
    fn test_undeclared_field_overwrites() {
        let schema = StateSchema::new().with_field(
            "messages",
            StateFieldDef::new(FieldType::Array).reducer(ReducerType::Append),
        );
        assert_eq!(schema.reducer("messages"), ReducerType::Append);
        assert_eq!(schema.reducer("joke"), ReducerType::Overwrite);
    }

    #[test]
    fn test_all_reducers() {
        let yaml = r#"
            f1: { type: string, reducer: overwrite }
            f2: { type: array, reducer: append }
            f3: { type: number, reducer: max }
            f4: { type: number, reducer: min }
            f5: { type: object, reducer: merge }
            f6: { type: any }
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.fields["f1"].reducer, ReducerType::Overwrite);
        assert_eq!(schema.fields["f2"].reducer, ReducerType::Append);
        assert_eq!(schema.fields["f3"].reducer, ReducerType::Max);
        assert_eq!(schema.fields["f4"].reducer, ReducerType::Min);
        assert_eq!(schema.fields["f5"].reducer, ReducerType::Merge);
        assert_eq!(schema.fields["f6"].field_type, FieldType::Any);
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::String.accepts(&json!("yes")));
        assert!(!FieldType::String.accepts(&json!(true)));
        assert!(FieldType::Boolean.accepts(&json!(null)));
        assert!(FieldType::Any.accepts(&json!({"a": 1})));
    }
}
