//! Dotted attribute lookup into an input document
//!
//! `device.os.name` walks `{"device": {"os": {"name": ...}}}` one key at a
//! time. Every intermediate node must be an object; anything else stops the
//! walk and the attribute is absent.

use serde::Serialize;
use serde_json::Value;

/// Shape of a resolved attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// Missing key, non-object intermediate node, or JSON `null`
    Absent,
    /// A single string leaf
    Text(&'a str),
    /// An array whose every element is a string
    TextList(Vec<&'a str>),
    /// Numbers, booleans, objects, and arrays with non-string elements
    Unsupported,
}

/// Shape tag of a [`Resolved`] value, without the borrowed data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Absent,
    Text,
    TextList,
    Unsupported,
}

impl<'a> Resolved<'a> {
    /// Classify a JSON node
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Null => Resolved::Absent,
            Value::String(s) => Resolved::Text(s),
            Value::Array(items) => items
                .iter()
                .map(Value::as_str)
                .collect::<Option<Vec<_>>>()
                .map_or(Resolved::Unsupported, Resolved::TextList),
            Value::Bool(_) | Value::Number(_) | Value::Object(_) => Resolved::Unsupported,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Resolved::Absent => Shape::Absent,
            Resolved::Text(_) => Shape::Text,
            Resolved::TextList(_) => Shape::TextList,
            Resolved::Unsupported => Shape::Unsupported,
        }
    }
}

/// Locate the value addressed by `name` in `document`
///
/// An empty name addresses the document root.
pub fn resolve<'a>(document: &'a Value, name: &str) -> Resolved<'a> {
    if name.is_empty() {
        return Resolved::classify(document);
    }

    let mut current = document;
    for segment in name.split('.') {
        current = match current.as_object() {
            Some(map) => match map.get(segment) {
                Some(next) => next,
                None => return Resolved::Absent,
            },
            None => return Resolved::Absent,
        };
    }

    Resolved::classify(current)
}
