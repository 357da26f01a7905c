//! Data dictionary of an OpenAPI document.
//!
//! Lists operation parameters, request and response bodies and component
//! schemas, one entry per data element, with each body and component
//! flattened to its nested properties.

use serde_json::Value;

use crate::aggregate::dedupe;
use crate::error::PointerError;
use crate::flatten::{Flattener, Visit};
use crate::kind::SchemaKind;
use crate::pointer::{escape_segment, resolve_pointer};
use crate::sink::TabularRecord;
use crate::types::{cell_value, DictionaryOptions, CONSTRAINT_KEYWORDS, HTTP_METHODS};

/// One row of the data dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictionaryEntry {
    pub leaf_element: String,
    pub element: String,
    pub definition: String,
    pub schema_type: String,
    pub example_constraints: String,
    pub location: String,
    /// `METHOD /path` of the operation; empty for component schemas.
    pub path: String,
}

impl TabularRecord for DictionaryEntry {
    const COLUMNS: &'static [&'static str] = &[
        "Leaf Element",
        "Element",
        "Definition",
        "Type",
        "Example/Constraints",
        "Location",
        "Path",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.leaf_element.clone(),
            self.element.clone(),
            self.definition.clone(),
            self.schema_type.clone(),
            self.example_constraints.clone(),
            self.location.clone(),
            self.path.clone(),
        ]
    }
}

const REQUEST_BODY: &str = "requestBody";
const RESPONSE_BODY: &str = "response body";
const COMPONENT_SCHEMA: &str = "component schema";

/// Root path of the members of an array body.
const ARRAY_BODY_ROOT: &str = "items";

/// Build the data dictionary of `document`.
///
/// Operations come first in document order (parameters, request body, then
/// responses per operation), followed by `components.schemas`.
///
/// # Errors
///
/// Any unresolvable reference aborts the whole build.
pub fn build_dictionary(
    document: &Value,
    options: &DictionaryOptions,
) -> Result<Vec<DictionaryEntry>, PointerError> {
    let mut builder = Builder {
        document,
        flattener: Flattener::new(document),
        entries: Vec::new(),
    };
    builder.operations()?;
    builder.components()?;

    let entries = builder.entries;
    tracing::debug!(entries = entries.len(), "dictionary built");
    if options.dedupe {
        Ok(dedupe(entries))
    } else {
        Ok(entries)
    }
}

struct Builder<'doc> {
    document: &'doc Value,
    flattener: Flattener<'doc>,
    entries: Vec<DictionaryEntry>,
}

impl<'doc> Builder<'doc> {
    fn operations(&mut self) -> Result<(), PointerError> {
        let document = self.document;
        let Some(paths) = document.get("paths").and_then(Value::as_object) else {
            return Ok(());
        };

        for (path, item) in paths {
            for method in HTTP_METHODS {
                let Some(operation) = item.get(*method).filter(|op| op.is_object()) else {
                    continue;
                };
                let context = format!("{} {}", method.to_uppercase(), path);
                self.parameters(item, operation, &context)?;
                self.request_body(operation, &context)?;
                self.responses(operation, &context)?;
            }
        }
        Ok(())
    }

    fn parameters(
        &mut self,
        item: &'doc Value,
        operation: &'doc Value,
        context: &str,
    ) -> Result<(), PointerError> {
        let declared = [item, operation]
            .into_iter()
            .filter_map(|owner| owner.get("parameters").and_then(Value::as_array))
            .flatten();

        for parameter in declared {
            let parameter = self.follow(parameter)?;
            if !parameter.is_object() {
                continue;
            }
            let schema = match parameter.get("schema") {
                Some(schema) => self.flattener.expand(schema)?,
                None => Value::Null,
            };
            let required = parameter.get("required").and_then(Value::as_bool) == Some(true);
            let name = cell_value(parameter.get("name"));

            self.entries.push(DictionaryEntry {
                leaf_element: name.clone(),
                element: name,
                definition: cell_value(parameter.get("description")),
                schema_type: type_label(&schema),
                example_constraints: join_details(&[
                    example_text(&schema).as_str(),
                    constraints_text(&schema).as_str(),
                    if required { "required" } else { "" },
                ]),
                location: format!("parameter ({})", cell_value(parameter.get("in"))),
                path: context.to_string(),
            });
        }
        Ok(())
    }

    fn request_body(&mut self, operation: &'doc Value, context: &str) -> Result<(), PointerError> {
        let Some(body) = operation.get("requestBody") else {
            return Ok(());
        };
        let body = self.follow(body)?;
        let definition = cell_value(body.get("description"));
        let Some(content) = body.get("content").and_then(Value::as_object) else {
            return Ok(());
        };

        for (media, block) in content {
            let element = format!("requestBody ({})", media);
            self.body(block.get("schema"), element, &definition, REQUEST_BODY, context)?;
        }
        Ok(())
    }

    fn responses(&mut self, operation: &'doc Value, context: &str) -> Result<(), PointerError> {
        let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
            return Ok(());
        };

        for (status, response) in responses {
            let response = self.follow(response)?;
            let definition = cell_value(response.get("description"));
            let Some(content) = response.get("content").and_then(Value::as_object) else {
                continue;
            };
            for (media, block) in content {
                let element = format!("response ({}, {})", status, media);
                self.body(block.get("schema"), element, &definition, RESPONSE_BODY, context)?;
            }
        }
        Ok(())
    }

    /// One entry for the body itself, then its flattened members.
    fn body(
        &mut self,
        schema: Option<&'doc Value>,
        element: String,
        definition: &str,
        location: &str,
        context: &str,
    ) -> Result<(), PointerError> {
        let expanded = match schema {
            Some(schema) => self.flattener.expand(schema)?,
            None => Value::Null,
        };
        self.entries.push(DictionaryEntry {
            leaf_element: element.clone(),
            element,
            definition: definition.to_string(),
            schema_type: type_label(&expanded),
            example_constraints: join_details(&[
                example_text(&expanded).as_str(),
                constraints_text(&expanded).as_str(),
            ]),
            location: location.to_string(),
            path: context.to_string(),
        });

        if let Some(schema) = schema {
            // array bodies are walked under `items`; the body entry above
            // stands for the array itself
            let is_array = matches!(SchemaKind::classify(&expanded), SchemaKind::Array(_));
            let root = if is_array { ARRAY_BODY_ROOT } else { "" };
            let mut visits = self.flattener.walk(schema, root, Vec::new())?;
            if is_array && !visits.is_empty() {
                visits.remove(0);
            }
            self.push_visits(visits, location, context);
        }
        Ok(())
    }

    fn components(&mut self) -> Result<(), PointerError> {
        let document = self.document;
        let Some(schemas) = document
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
        else {
            return Ok(());
        };

        for name in schemas.keys() {
            let pointer = format!("#/components/schemas/{}", escape_segment(name));
            let visits = self.flattener.walk_pointer(&pointer, name)?;
            self.push_visits(visits, COMPONENT_SCHEMA, "");
        }
        Ok(())
    }

    fn push_visits(&mut self, visits: Vec<Visit>, location: &str, context: &str) {
        self.entries.extend(visits.into_iter().map(|visit| {
            let Visit { record, schema } = visit;
            DictionaryEntry {
                example_constraints: join_details(&[
                    example_text(&schema).as_str(),
                    constraints_text(&schema).as_str(),
                    if record.required { "required" } else { "" },
                ]),
                schema_type: type_label(&schema),
                definition: record.description,
                leaf_element: record.leaf_element,
                element: record.path,
                location: location.to_string(),
                path: context.to_string(),
            }
        }));
    }

    fn follow(&self, node: &'doc Value) -> Result<&'doc Value, PointerError> {
        match node.get("$ref").and_then(Value::as_str) {
            Some(pointer) => resolve_pointer(self.document, pointer),
            None => Ok(node),
        }
    }
}

/// `type (format)`, `type`, or `$ref` for a reference left unexpanded.
fn type_label(schema: &Value) -> String {
    let ty = cell_value(schema.get("type"));
    let format = cell_value(schema.get("format"));
    match (ty.is_empty(), format.is_empty()) {
        (false, false) => format!("{} ({})", ty, format),
        (false, true) => ty,
        _ if schema.get("$ref").is_some() => "$ref".to_string(),
        _ => String::new(),
    }
}

/// `example` (or `examples`) as compact JSON.
fn example_text(schema: &Value) -> String {
    schema
        .get("example")
        .or_else(|| schema.get("examples"))
        .map(Value::to_string)
        .unwrap_or_default()
}

/// Constraint keywords as `key: value`, joined by `; `.
fn constraints_text(schema: &Value) -> String {
    CONSTRAINT_KEYWORDS
        .iter()
        .filter_map(|key| {
            let value = schema.get(*key)?;
            Some(match value {
                Value::Array(items) if *key == "enum" => {
                    let items: Vec<String> = items.iter().map(|v| cell_value(Some(v))).collect();
                    format!("enum: {}", items.join(", "))
                }
                other => format!("{}: {}", key, cell_value(Some(other))),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_details(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.3",
            "paths": {
                "/pets/{petId}": {
                    "parameters": [ { "$ref": "#/components/parameters/PetId" } ],
                    "get": {
                        "parameters": [
                            { "name": "verbose", "in": "query", "schema": { "type": "boolean", "default": false } }
                        ],
                        "responses": {
                            "200": {
                                "description": "A pet",
                                "content": { "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Pet" }
                                }}
                            },
                            "404": { "description": "Not found" }
                        }
                    },
                    "post": {
                        "requestBody": {
                            "description": "New pets",
                            "content": { "application/json": {
                                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                            }}
                        },
                        "responses": { "201": { "description": "Created" } }
                    }
                }
            },
            "components": {
                "parameters": {
                    "PetId": {
                        "name": "petId", "in": "path", "required": true,
                        "description": "Pet identifier",
                        "schema": { "type": "string", "format": "uuid", "pattern": "^[0-9a-f-]+$" }
                    }
                },
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": { "type": "string", "example": "Rex", "description": "Pet name" },
                            "status": { "type": "string", "enum": ["available", "sold"] }
                        }
                    }
                }
            }
        })
    }

    fn elements(entries: &[DictionaryEntry]) -> Vec<(&str, &str)> {
        entries
            .iter()
            .map(|e| (e.element.as_str(), e.location.as_str()))
            .collect()
    }

    #[test]
    fn dictionary_lists_operations_then_components() {
        let entries = build_dictionary(&petstore(), &DictionaryOptions::new()).unwrap();
        assert_eq!(
            elements(&entries),
            [
                ("petId", "parameter (path)"),
                ("verbose", "parameter (query)"),
                ("response (200, application/json)", "response body"),
                ("name", "response body"),
                ("status", "response body"),
                ("requestBody (application/json)", "requestBody"),
                ("items[]", "requestBody"),
                ("items[].name", "requestBody"),
                ("items[].status", "requestBody"),
                ("Pet", "component schema"),
                ("Pet.name", "component schema"),
                ("Pet.status", "component schema"),
            ]
        );
    }

    #[test]
    fn parameter_details() {
        let entries = build_dictionary(&petstore(), &DictionaryOptions::new()).unwrap();
        let pet_id = &entries[0];
        assert_eq!(pet_id.path, "GET /pets/{petId}");
        assert_eq!(pet_id.definition, "Pet identifier");
        assert_eq!(pet_id.schema_type, "string (uuid)");
        assert_eq!(pet_id.example_constraints, "pattern: ^[0-9a-f-]+$ | required");
    }

    #[test]
    fn property_details() {
        let entries = build_dictionary(&petstore(), &DictionaryOptions::new()).unwrap();
        let name = &entries[3];
        assert_eq!(name.leaf_element, "name");
        assert_eq!(name.definition, "Pet name");
        assert_eq!(name.example_constraints, "\"Rex\" | required");

        let status = &entries[4];
        assert_eq!(status.example_constraints, "enum: available, sold");
    }

    #[test]
    fn body_header_carries_response_description() {
        let entries = build_dictionary(&petstore(), &DictionaryOptions::new()).unwrap();
        assert_eq!(entries[2].definition, "A pet");
        assert_eq!(entries[2].schema_type, "object");
        assert_eq!(entries[5].definition, "New pets");
        assert_eq!(entries[5].path, "POST /pets/{petId}");
    }

    #[test]
    fn all_occurrences_kept_unless_deduped() {
        let doc = json!({
            "paths": {},
            "components": { "schemas": {
                "A": { "type": "string" }
            }}
        });
        let mut doubled = doc.clone();
        doubled["paths"] = json!({
            "/a": {
                "get": { "parameters": [
                    { "name": "q", "in": "query" },
                    { "name": "q", "in": "query" }
                ]}
            }
        });
        let all = build_dictionary(&doubled, &DictionaryOptions::new()).unwrap();
        assert_eq!(all.len(), 3);
        let unique = build_dictionary(&doubled, &DictionaryOptions::new().dedupe(true)).unwrap();
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn recursive_component_is_marked_as_ref() {
        let doc = json!({ "components": { "schemas": {
            "Node": {
                "type": "object",
                "properties": { "next": { "$ref": "#/components/schemas/Node" } }
            }
        }}});
        let entries = build_dictionary(&doc, &DictionaryOptions::new()).unwrap();
        assert_eq!(elements(&entries), [("Node", "component schema"), ("Node.next", "component schema")]);
        assert_eq!(entries[1].schema_type, "$ref");
    }

    #[test]
    fn dangling_reference_fails() {
        let doc = json!({ "paths": { "/x": { "get": {
            "parameters": [ { "$ref": "#/components/parameters/Missing" } ]
        }}}});
        let err = build_dictionary(&doc, &DictionaryOptions::new()).unwrap_err();
        assert!(matches!(err, PointerError::PointerNotFound { .. }));
    }

    #[test]
    fn type_labels() {
        assert_eq!(type_label(&json!({ "type": "integer", "format": "int64" })), "integer (int64)");
        assert_eq!(type_label(&json!({ "type": "string" })), "string");
        assert_eq!(type_label(&json!({ "$ref": "#/x" })), "$ref");
        assert_eq!(type_label(&json!({})), "");
    }
}
