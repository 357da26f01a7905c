//! Classification of schema nodes into a closed set of shapes.

use serde_json::{Map, Value};

use crate::types::COMPOSITE_KEYWORDS;

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind<'a> {
    /// Unexpanded `$ref` (only seen after expansion when it closes a cycle).
    Reference(&'a str),
    /// Node still carrying `allOf`/`anyOf`/`oneOf`.
    Composite,
    Object(ObjectShape<'a>),
    Array(ArrayShape<'a>),
    Scalar,
}

/// Object parts of a schema: its named and wildcard members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape<'a> {
    pub properties: Option<&'a Map<String, Value>>,
    /// `additionalProperties` when it is a schema rather than a boolean.
    pub additional: Option<&'a Value>,
    pub required: Vec<&'a str>,
}

/// Array parts of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShape<'a> {
    pub items: Option<Items<'a>>,
    /// Object members declared next to `items`, if any.
    pub object: Option<ObjectShape<'a>>,
}

/// `items` as a single schema or as tuple validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Items<'a> {
    Single(&'a Value),
    Tuple(&'a [Value]),
}

impl<'a> SchemaKind<'a> {
    /// Classify a node by the keywords it carries.
    pub fn classify(schema: &'a Value) -> Self {
        let Value::Object(map) = schema else {
            return SchemaKind::Scalar;
        };

        if let Some(Value::String(pointer)) = map.get("$ref") {
            return SchemaKind::Reference(pointer);
        }
        if COMPOSITE_KEYWORDS.iter().any(|k| map.contains_key(*k)) {
            return SchemaKind::Composite;
        }

        let object = ObjectShape::from_map(map);
        if has_type(map, "array") || map.contains_key("items") {
            let items = match map.get("items") {
                Some(Value::Array(tuple)) => Some(Items::Tuple(tuple)),
                Some(single @ Value::Object(_)) => Some(Items::Single(single)),
                _ => None,
            };
            return SchemaKind::Array(ArrayShape { items, object });
        }
        match object {
            Some(shape) => SchemaKind::Object(shape),
            None if has_type(map, "object") => SchemaKind::Object(ObjectShape::default()),
            None => SchemaKind::Scalar,
        }
    }
}

impl<'a> ObjectShape<'a> {
    fn from_map(map: &'a Map<String, Value>) -> Option<Self> {
        let properties = map.get("properties").and_then(Value::as_object);
        let additional = map
            .get("additionalProperties")
            .filter(|v| v.is_object());
        if properties.is_none() && additional.is_none() {
            return None;
        }
        Some(ObjectShape {
            properties,
            additional,
            required: required_names(map),
        })
    }
}

/// Names listed in a node's `required` array.
pub fn required_names(map: &Map<String, Value>) -> Vec<&str> {
    map.get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// `type` equals `name`, or is a list containing it (OpenAPI 3.1).
fn has_type(map: &Map<String, Value>, name: &str) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
        _ => false,
    }
}
