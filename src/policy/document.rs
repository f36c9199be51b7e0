//! Policy document structure
//!
//! A policy is an ordered list of paths and a path is an ordered list of
//! properties. The policy holds when every property of at least one path holds.
//!
//! Wire format (JSON):
//!
//! ```json
//! [
//!   [
//!     { "attribute": { "name": "user.role", "type": "string" },
//!       "operator": "equal",
//!       "value": ["admin"] }
//!   ]
//! ]
//! ```
//!
//! Decoding is lenient about absence: `null` stands for an empty container or
//! a default leaf, missing fields take their default, unknown fields are
//! ignored. A repeated key keeps its last non-null value. Wrong leaf types
//! are errors.

use super::decode::decode;
use crate::error::{PolicyError, Result};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Deref;

/// Declared type of an attribute
///
/// Advisory only. Evaluation classifies the resolved value itself and never
/// consults the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeType {
    /// A single string leaf
    String,
    /// A list of strings
    List,
    /// Any other declared type, kept verbatim
    Other(String),
}

impl AttributeType {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeType::String => "string",
            AttributeType::List => "list",
            AttributeType::Other(s) => s,
        }
    }
}

impl Default for AttributeType {
    fn default() -> Self {
        AttributeType::Other(String::new())
    }
}

impl From<String> for AttributeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" => AttributeType::String,
            "list" => AttributeType::List,
            _ => AttributeType::Other(s),
        }
    }
}

impl From<AttributeType> for String {
    fn from(kind: AttributeType) -> Self {
        match kind {
            AttributeType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Comparison operator of a property
///
/// Unrecognized operator strings are accepted at parse time as
/// [`Operator::Unknown`] and never satisfy a condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    /// Single string equals `value[0]`
    Equal,
    /// Single string differs from `value[0]`
    NotEqual,
    /// String list contains `value[0]`
    Contains,
    /// String list does not contain `value[0]`
    NotContains,
    /// String list contains at least one of `value`
    ContainAtLeastOne,
    /// String list is missing at least one of `value`
    ///
    /// Note the name suggests "contains none of `value`", but the deployed
    /// semantics are "does not contain all of `value`": one missing expected
    /// value is enough.
    NotContainAtLeastOne,
    /// Any other operator string, kept verbatim
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::ContainAtLeastOne => "contain_at_least_one",
            Operator::NotContainAtLeastOne => "not_contain_at_least_one",
            Operator::Unknown(s) => s,
        }
    }

    /// Whether this operator applies to a single string value
    pub fn is_single_value(&self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }

    /// Whether this operator applies to a list of strings
    pub fn is_multi_value(&self) -> bool {
        matches!(
            self,
            Operator::Contains
                | Operator::NotContains
                | Operator::ContainAtLeastOne
                | Operator::NotContainAtLeastOne
        )
    }
}

impl Default for Operator {
    fn default() -> Self {
        Operator::Unknown(String::new())
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equal" => Operator::Equal,
            "not_equal" => Operator::NotEqual,
            "contains" => Operator::Contains,
            "not_contains" => Operator::NotContains,
            "contain_at_least_one" => Operator::ContainAtLeastOne,
            "not_contain_at_least_one" => Operator::NotContainAtLeastOne,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        Operator::from(s.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named reference into the input document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Dotted path, e.g. `device.os.name`
    pub name: String,

    /// Declared type (advisory)
    #[serde(rename = "type")]
    pub kind: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Attribute {
            name: name.into(),
            kind,
        }
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AttributeVisitor;

        impl<'de> Visitor<'de> for AttributeVisitor {
            type Value = Attribute;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an attribute object")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Attribute, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut attribute = Attribute::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "name" => {
                            if let Some(name) = map.next_value()? {
                                attribute.name = name;
                            }
                        }
                        "type" => {
                            if let Some(kind) = map.next_value()? {
                                attribute.kind = kind;
                            }
                        }
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(attribute)
            }
        }

        deserializer.deserialize_map(AttributeVisitor)
    }
}

/// A single condition: attribute, operator and expected values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Property {
    pub attribute: Attribute,

    pub operator: Operator,

    /// Expected values. Single-expected operators read only the first one.
    pub value: Vec<String>,
}

impl Property {
    /// Create a new property
    pub fn new<I, S>(attribute: Attribute, operator: Operator, value: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Property {
            attribute,
            operator,
            value: value.into_iter().map(Into::into).collect(),
        }
    }

    /// The expected value read by single-expected operators
    pub fn expected(&self) -> Option<&str> {
        self.value.first().map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for Property {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PropertyVisitor;

        impl<'de> Visitor<'de> for PropertyVisitor {
            type Value = Property;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a property object")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Property, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut property = Property::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "attribute" => {
                            if let Some(attribute) = map.next_value()? {
                                property.attribute = attribute;
                            }
                        }
                        "operator" => {
                            if let Some(operator) = map.next_value()? {
                                property.operator = operator;
                            }
                        }
                        "value" => {
                            let value: Option<Vec<Option<String>>> = map.next_value()?;
                            if let Some(value) = value {
                                property.value =
                                    value.into_iter().map(Option::unwrap_or_default).collect();
                            }
                        }
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(property)
            }
        }

        deserializer.deserialize_map(PropertyVisitor)
    }
}

/// Conjunction of properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path {
    pub properties: Vec<Property>,
}

impl Path {
    /// Create a new empty path (always satisfied)
    pub fn new() -> Self {
        Path::default()
    }

    /// Append a property, builder style
    pub fn with(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn push(&mut self, property: Property) {
        self.properties.push(property);
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.properties.iter()
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let properties = Option::<Vec<Option<Property>>>::deserialize(deserializer)?
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        Ok(Path { properties })
    }
}

impl FromIterator<Property> for Path {
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        Path {
            properties: iter.into_iter().collect(),
        }
    }
}

/// Complete policy document: disjunction of paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Policy {
    pub paths: Vec<Path>,
}

impl Policy {
    /// Create a new empty policy (never satisfied)
    pub fn new() -> Self {
        Policy::default()
    }

    /// Add a path to this policy
    pub fn add_path(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.paths.iter()
    }

    /// Parse policy from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        parse_policy(json.as_bytes())
    }

    /// Serialize policy to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let paths = Option::<Vec<Path>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Policy { paths })
    }
}

impl FromIterator<Path> for Policy {
    fn from_iter<T: IntoIterator<Item = Path>>(iter: T) -> Self {
        Policy {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Decode a policy payload
pub fn parse_policy(bytes: &[u8]) -> Result<Policy> {
    decode(bytes).map_err(PolicyError::MalformedPolicy)
}

/// Decoded input document
///
/// Always a JSON object; derefs to the underlying [`Value`]. Dropping it
/// tears the tree down iteratively, so any document the decoder accepts is
/// released without deep recursion.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDocument(Value);

impl InputDocument {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the underlying value
    pub fn into_value(mut self) -> Value {
        std::mem::take(&mut self.0)
    }
}

impl Deref for InputDocument {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl Drop for InputDocument {
    fn drop(&mut self) {
        let mut pending = vec![std::mem::take(&mut self.0)];
        while let Some(value) = pending.pop() {
            match value {
                Value::Array(items) => pending.extend(items),
                Value::Object(fields) => pending.extend(fields.into_iter().map(|(_, v)| v)),
                _ => {}
            }
        }
    }
}

/// Decode an input payload
///
/// The root must be a JSON object. `null` decodes to an empty object.
pub fn parse_input(bytes: &[u8]) -> Result<InputDocument> {
    let document = InputDocument(
        decode(bytes).map_err(|e: serde_json::Error| PolicyError::MalformedInput(e.to_string()))?,
    );

    if document.is_object() {
        return Ok(document);
    }
    if document.is_null() {
        return Ok(InputDocument(Value::Object(Map::new())));
    }
    Err(PolicyError::MalformedInput(format!(
        "expected a JSON object at the root, found {}",
        json_kind(&document)
    )))
}

/// Short name of a JSON value's kind, for diagnostics
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::MAX_NESTING_DEPTH;
    use super::*;

    #[test]
    fn test_parse_single_path() {
        let json = r#"[[{"attribute":{"name":"role","type":"string"},"operator":"equal","value":["admin"]}]]"#;
        let policy = Policy::from_json(json).unwrap();

        assert_eq!(policy.len(), 1);
        assert_eq!(policy.paths[0].len(), 1);

        let property = &policy.paths[0].properties[0];
        assert_eq!(property.attribute.name, "role");
        assert_eq!(property.attribute.kind, AttributeType::String);
        assert_eq!(property.operator, Operator::Equal);
        assert_eq!(property.value, vec!["admin".to_string()]);
        assert_eq!(property.expected(), Some("admin"));
    }

    #[test]
    fn test_operator_names() {
        for name in [
            "equal",
            "not_equal",
            "contains",
            "not_contains",
            "contain_at_least_one",
            "not_contain_at_least_one",
        ] {
            let op = Operator::from(name);
            assert!(!matches!(op, Operator::Unknown(_)), "{} not recognized", name);
            assert_eq!(op.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_operator_is_accepted() {
        let json = r#"[[{"attribute":{"name":"role","type":"string"},"operator":"starts_with","value":["a"]}]]"#;
        let policy = Policy::from_json(json).unwrap();

        let op = &policy.paths[0].properties[0].operator;
        assert_eq!(op, &Operator::Unknown("starts_with".to_string()));
        assert!(!op.is_single_value());
        assert!(!op.is_multi_value());
    }

    #[test]
    fn test_operator_match_is_case_sensitive() {
        assert_eq!(Operator::from("Equal"), Operator::Unknown("Equal".to_string()));
    }

    #[test]
    fn test_unknown_attribute_type_is_kept() {
        let json = r#"[[{"attribute":{"name":"n","type":"ipv4"},"operator":"equal","value":["x"]}]]"#;
        let policy = Policy::from_json(json).unwrap();

        assert_eq!(
            policy.paths[0].properties[0].attribute.kind,
            AttributeType::Other("ipv4".to_string())
        );
    }

    #[test]
    fn test_empty_policy_and_empty_path() {
        assert!(Policy::from_json("[]").unwrap().is_empty());

        let policy = Policy::from_json("[[]]").unwrap();
        assert_eq!(policy.len(), 1);
        assert!(policy.paths[0].is_empty());
    }

    #[test]
    fn test_null_is_lenient() {
        assert!(Policy::from_json("null").unwrap().is_empty());

        let policy = Policy::from_json("[null, [null]]").unwrap();
        assert_eq!(policy.len(), 2);
        assert!(policy.paths[0].is_empty());
        assert_eq!(policy.paths[1].properties[0], Property::default());

        let json = r#"[[{"attribute":null,"operator":"equal","value":["x", null]}]]"#;
        let policy = Policy::from_json(json).unwrap();
        let property = &policy.paths[0].properties[0];
        assert_eq!(property.attribute, Attribute::default());
        assert_eq!(property.value, vec!["x".to_string(), String::new()]);
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let json = r#"[[{"attribute":{"name":"role"},"operator":"equal","extra":1}]]"#;
        let policy = Policy::from_json(json).unwrap();
        let property = &policy.paths[0].properties[0];

        assert_eq!(property.attribute.name, "role");
        assert!(property.value.is_empty());
        assert_eq!(property.expected(), None);
    }

    #[test]
    fn test_repeated_keys_keep_last_value() {
        let json = r#"[[{
            "attribute": {"name": "user", "type": "list", "name": "role"},
            "operator": "contains",
            "operator": "equal",
            "value": ["guest"],
            "value": ["admin"]
        }]]"#;
        let property = &Policy::from_json(json).unwrap().paths[0].properties[0];

        assert_eq!(property.attribute, Attribute::new("role", AttributeType::List));
        assert_eq!(property.operator, Operator::Equal);
        assert_eq!(property.value, vec!["admin".to_string()]);

        // A repeated null leaves the earlier value in place
        let json = r#"[[{"operator":"equal","operator":null,"value":["x"],"value":null}]]"#;
        let property = &Policy::from_json(json).unwrap().paths[0].properties[0];
        assert_eq!(property.operator, Operator::Equal);
        assert_eq!(property.value, vec!["x".to_string()]);
    }

    #[test]
    fn test_structural_mismatch_is_rejected() {
        // value must be a list of strings
        let json = r#"[[{"attribute":{"name":"role","type":"string"},"operator":"equal","value":"admin"}]]"#;
        assert!(matches!(
            Policy::from_json(json),
            Err(PolicyError::MalformedPolicy(_))
        ));

        // numbers are not strings
        let json = r#"[[{"attribute":{"name":"role","type":"string"},"operator":"equal","value":[1]}]]"#;
        assert!(Policy::from_json(json).is_err());

        // paths must be arrays
        assert!(Policy::from_json(r#"[{"attribute":{"name":"x"}}]"#).is_err());
        assert!(Policy::from_json(r#"{"paths":[]}"#).is_err());
    }

    #[test]
    fn test_truncated_policy_is_rejected() {
        let json = r#"[[{"attribute":{"name":"role","type":"str"#;
        assert!(parse_policy(json.as_bytes()).is_err());
        assert!(parse_policy(b"").is_err());
        assert!(parse_policy(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_policy_json_roundtrip() {
        let mut policy = Policy::new();
        policy.add_path(
            Path::new()
                .with(Property::new(
                    Attribute::new("role", AttributeType::String),
                    Operator::Equal,
                    ["admin"],
                ))
                .with(Property::new(
                    Attribute::new("tags", AttributeType::List),
                    Operator::Unknown("matches".to_string()),
                    ["a", "b"],
                )),
        );

        let json = policy.to_json().unwrap();
        assert!(json.contains("\"type\": \"string\""));
        assert!(json.contains("\"operator\": \"matches\""));

        let parsed = Policy::from_json(&json).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_parse_input() {
        let doc = parse_input(br#"{"role":"admin"}"#).unwrap();
        assert_eq!(doc["role"], "admin");

        assert_eq!(*parse_input(b"null").unwrap(), Value::Object(Map::new()));

        assert!(matches!(
            parse_input(b"[1,2]"),
            Err(PolicyError::MalformedInput(_))
        ));
        assert!(parse_input(br#""admin""#).is_err());
        assert!(parse_input(b"{").is_err());
    }

    #[test]
    fn test_parse_deep_input() {
        let depth = 5_000;
        let payload = format!(r#"{{"a":{}0{}}}"#, "[".repeat(depth), "]".repeat(depth));

        let doc = parse_input(payload.as_bytes()).unwrap();
        assert!(doc["a"].is_array());
        drop(doc);

        let payload = "[".repeat(MAX_NESTING_DEPTH + 1);
        assert!(matches!(
            parse_input(payload.as_bytes()),
            Err(PolicyError::MalformedInput(_))
        ));
    }
}
