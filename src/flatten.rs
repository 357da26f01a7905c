//! Tree-to-table flattening of schemas.
//!
//! Every addressable element becomes one [`FlatRecord`]. Paths use dots for
//! properties (`order.customer.name`), `[]` for array items, `[i]` for tuple
//! items and `.*` for `additionalProperties` values:
//!
//! ```
//! use oas_dictionary::flatten;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["id"],
//!     "properties": {
//!         "id": { "type": "string" },
//!         "tags": { "type": "array", "items": { "type": "string" } }
//!     }
//! });
//!
//! let records = flatten(&schema, &schema, "").unwrap();
//! let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
//! assert_eq!(paths, ["id", "tags", "tags[]"]);
//! assert!(records[0].required);
//! ```
//!
//! The walk uses an explicit stack, so nesting depth is not limited by the
//! call stack. A reference back to a schema already open on the current
//! branch is emitted once and not descended into.
//!
//! Property names that would read as path syntax (`*`, or containing `.`,
//! `[`, `]` or `"`) are written as a quoted step, `parent["a.b"]`, so no two
//! elements share a path.

use serde_json::Value;

use crate::error::PointerError;
use crate::expand::{is_cut, Expander, Slot};
use crate::kind::{Items, ObjectShape, SchemaKind};
use crate::pointer::resolve_pointer;
use crate::sink::TabularRecord;
use crate::types::cell_value;

/// One flattened schema element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlatRecord {
    pub leaf_element: String,
    pub path: String,
    pub description: String,
    pub schema_type: String,
    pub format: String,
    pub enum_values: String,
    pub pattern: String,
    pub minimum: String,
    pub maximum: String,
    pub exclusive_minimum: String,
    pub exclusive_maximum: String,
    pub multiple_of: String,
    pub min_length: String,
    pub max_length: String,
    pub min_items: String,
    pub max_items: String,
    /// Listed in the enclosing object's `required`.
    pub required: bool,
    pub default: String,
    pub example: String,
    /// `x-*` keys of the node as `key: value`, joined by `; `.
    pub extensions: String,
}

impl FlatRecord {
    fn from_schema(path: String, leaf_element: String, required: bool, schema: &Value) -> Self {
        let cell = |key: &str| cell_value(schema.get(key));
        let extensions = schema
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(k, _)| k.starts_with("x-"))
                    .map(|(k, v)| format!("{}: {}", k, cell_value(Some(v))))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();

        FlatRecord {
            leaf_element,
            path,
            description: cell("description"),
            schema_type: cell("type"),
            format: cell("format"),
            enum_values: cell("enum"),
            pattern: cell("pattern"),
            minimum: cell("minimum"),
            maximum: cell("maximum"),
            exclusive_minimum: cell("exclusiveMinimum"),
            exclusive_maximum: cell("exclusiveMaximum"),
            multiple_of: cell("multipleOf"),
            min_length: cell("minLength"),
            max_length: cell("maxLength"),
            min_items: cell("minItems"),
            max_items: cell("maxItems"),
            required,
            default: cell("default"),
            example: cell("example"),
            extensions,
        }
    }
}

impl TabularRecord for FlatRecord {
    const COLUMNS: &'static [&'static str] = &[
        "leaf element",
        "path",
        "description",
        "type",
        "format",
        "enum",
        "pattern",
        "min",
        "max",
        "exclusiveMinimum",
        "exclusiveMaximum",
        "multipleOf",
        "minLength",
        "maxLength",
        "minItems",
        "maxItems",
        "required",
        "default",
        "example",
        "extensions",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.leaf_element.clone(),
            self.path.clone(),
            self.description.clone(),
            self.schema_type.clone(),
            self.format.clone(),
            self.enum_values.clone(),
            self.pattern.clone(),
            self.minimum.clone(),
            self.maximum.clone(),
            self.exclusive_minimum.clone(),
            self.exclusive_maximum.clone(),
            self.multiple_of.clone(),
            self.min_length.clone(),
            self.max_length.clone(),
            self.min_items.clone(),
            self.max_items.clone(),
            if self.required { "true".into() } else { String::new() },
            self.default.clone(),
            self.example.clone(),
            self.extensions.clone(),
        ]
    }
}

/// A pending node of the walk.
struct Frame {
    schema: Value,
    path: String,
    leaf: String,
    required: bool,
    /// References dereferenced on the way down to this node.
    ancestry: Vec<String>,
}

/// A flattened node together with its expanded schema.
pub(crate) struct Visit {
    pub record: FlatRecord,
    pub schema: Value,
}

/// Walks schemas of one document; expanded references are shared across
/// calls.
pub struct Flattener<'doc> {
    expander: Expander<'doc>,
}

impl<'doc> Flattener<'doc> {
    pub fn new(document: &'doc Value) -> Self {
        Self {
            expander: Expander::new(document),
        }
    }

    /// Flatten `schema`, prefixing every path with `root_path`.
    ///
    /// The root itself is emitted only when `root_path` is non-empty.
    ///
    /// # Errors
    ///
    /// Returns `PointerError` if any reference reached by the walk cannot be
    /// resolved; no partial output is produced.
    pub fn flatten(&mut self, schema: &Value, root_path: &str) -> Result<Vec<FlatRecord>, PointerError> {
        Ok(self
            .walk(schema, root_path, Vec::new())?
            .into_iter()
            .map(|v| v.record)
            .collect())
    }

    /// Flatten the schema found at `pointer`.
    pub fn flatten_pointer(
        &mut self,
        pointer: &str,
        root_path: &str,
    ) -> Result<Vec<FlatRecord>, PointerError> {
        Ok(self
            .walk_pointer(pointer, root_path)?
            .into_iter()
            .map(|v| v.record)
            .collect())
    }

    /// Expand a single node with the walk's shared reference cache.
    pub fn expand(&mut self, schema: &Value) -> Result<Value, PointerError> {
        self.expander.expand(schema)
    }

    pub(crate) fn walk_pointer(
        &mut self,
        pointer: &str,
        root_path: &str,
    ) -> Result<Vec<Visit>, PointerError> {
        let root = resolve_pointer(self.expander.document(), pointer)?;
        self.walk(root, root_path, vec![pointer.to_string()])
    }

    pub(crate) fn walk(
        &mut self,
        schema: &Value,
        root_path: &str,
        ancestry: Vec<String>,
    ) -> Result<Vec<Visit>, PointerError> {
        let mut visits = Vec::new();
        let mut stack = vec![Frame {
            schema: schema.clone(),
            path: root_path.to_string(),
            leaf: root_path.to_string(),
            required: false,
            ancestry,
        }];

        while let Some(frame) = stack.pop() {
            let expansion = self.expander.expand_within(&frame.schema, &frame.ancestry)?;
            let schema = &expansion.schema;

            if !frame.path.is_empty() {
                visits.push(Visit {
                    record: FlatRecord::from_schema(
                        frame.path.clone(),
                        frame.leaf.clone(),
                        frame.required,
                        schema,
                    ),
                    schema: schema.clone(),
                });
            }
            if is_cut(schema) {
                tracing::debug!(path = %frame.path, "recursive reference, not descending");
                continue;
            }

            let ancestry_of = |slot: Slot| {
                let mut ancestry = frame.ancestry.clone();
                for pointer in expansion.ancestry_of(&slot) {
                    if !ancestry.contains(&pointer) {
                        ancestry.push(pointer);
                    }
                }
                ancestry
            };
            let children = child_frames(schema, &frame.path, &frame.leaf, ancestry_of);
            stack.extend(children.into_iter().rev());
        }

        Ok(visits)
    }
}

/// Flatten `schema` against `document` with a fresh [`Flattener`].
pub fn flatten(
    document: &Value,
    schema: &Value,
    root_path: &str,
) -> Result<Vec<FlatRecord>, PointerError> {
    Flattener::new(document).flatten(schema, root_path)
}

/// Flatten the schema at `pointer` (e.g. `#/components/schemas/Pet`).
pub fn flatten_pointer(document: &Value, pointer: &str) -> Result<Vec<FlatRecord>, PointerError> {
    Flattener::new(document).flatten_pointer(pointer, "")
}

/// Path of property `name` under `path`, quoted when the name is not a
/// plain identifier step.
fn property_path(path: &str, name: &str) -> String {
    let plain = name != "*" && !name.contains(['.', '[', ']', '"']);
    match (plain, path.is_empty()) {
        (true, true) => name.to_string(),
        (true, false) => format!("{}.{}", path, name),
        (false, _) => format!(
            "{}[\"{}\"]",
            path,
            name.replace('\\', "\\\\").replace('"', "\\\"")
        ),
    }
}

/// Children of an expanded node in walk order: properties, then the
/// `additionalProperties` wildcard, then array items.
fn child_frames(
    schema: &Value,
    path: &str,
    leaf: &str,
    ancestry_of: impl Fn(Slot) -> Vec<String>,
) -> Vec<Frame> {
    let mut children = Vec::new();
    let frame = |schema: &Value, path: String, leaf: String, required: bool, slot: Slot| Frame {
        schema: schema.clone(),
        path,
        leaf,
        required,
        ancestry: ancestry_of(slot),
    };

    let push_object = |shape: &ObjectShape, children: &mut Vec<Frame>| {
        if let Some(properties) = shape.properties {
            for (name, child) in properties {
                let required = shape.required.contains(&name.as_str());
                children.push(frame(
                    child,
                    property_path(path, name),
                    name.clone(),
                    required,
                    Slot::Property(name.clone()),
                ));
            }
        }
        if let Some(additional) = shape.additional {
            let child_path = if path.is_empty() {
                "*".to_string()
            } else {
                format!("{}.*", path)
            };
            children.push(frame(additional, child_path, "*".to_string(), false, Slot::Additional));
        }
    };

    match SchemaKind::classify(schema) {
        SchemaKind::Object(shape) => push_object(&shape, &mut children),
        SchemaKind::Array(shape) => {
            if let Some(object) = &shape.object {
                push_object(object, &mut children);
            }
            match shape.items {
                Some(Items::Single(items)) => {
                    let item_leaf = if path.is_empty() { "[]" } else { leaf };
                    children.push(frame(
                        items,
                        format!("{}[]", path),
                        item_leaf.to_string(),
                        false,
                        Slot::Items,
                    ));
                }
                Some(Items::Tuple(items)) => {
                    for (idx, item) in items.iter().enumerate() {
                        let item_leaf = if path.is_empty() {
                            format!("[{}]", idx)
                        } else {
                            format!("{}[{}]", leaf, idx)
                        };
                        children.push(frame(
                            item,
                            format!("{}[{}]", path, idx),
                            item_leaf,
                            false,
                            Slot::Items,
                        ));
                    }
                }
                None => {}
            }
        }
        SchemaKind::Reference(_) | SchemaKind::Composite | SchemaKind::Scalar => {}
    }

    children
}
