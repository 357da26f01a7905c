//! Expansion of `$ref` and composite (`allOf`/`anyOf`/`oneOf`) schemas.
//!
//! Expansion only rewrites the node it is given: nested `properties`,
//! `items` and `additionalProperties` are left for the flattener to expand as
//! it reaches them.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::PointerError;
use crate::merge::merge;
use crate::pointer::resolve_pointer;
use crate::types::COMPOSITE_KEYWORDS;

/// Expand a schema against its document in one call.
///
/// Equivalent to `Expander::new(document).expand(schema)`.
pub fn expand(document: &Value, schema: &Value) -> Result<Value, PointerError> {
    Expander::new(document).expand(schema)
}

/// A child position of a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Property(String),
    /// `additionalProperties` given as a schema.
    Additional,
    /// `items`, single or tuple.
    Items,
}

impl Slot {
    /// Child positions present in `schema`.
    fn present(schema: &Value) -> Vec<Slot> {
        let mut slots: Vec<Slot> = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().map(Slot::Property).collect())
            .unwrap_or_default();
        if schema.get("additionalProperties").map_or(false, Value::is_object) {
            slots.push(Slot::Additional);
        }
        if schema.get("items").is_some() {
            slots.push(Slot::Items);
        }
        slots
    }

    fn is_held_by(&self, schema: &Value) -> bool {
        match self {
            Slot::Property(name) => schema
                .get("properties")
                .and_then(Value::as_object)
                .map_or(false, |props| props.contains_key(name)),
            Slot::Additional => schema.get("additionalProperties").is_some(),
            Slot::Items => schema.get("items").is_some(),
        }
    }
}

/// Result of expanding one node.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// The merged schema, free of composite keywords. Still carries `$ref`
    /// when the reference closes a cycle.
    pub schema: Value,
    /// References the node itself resolved through, outermost first.
    pub chain: Vec<String>,
    /// References that contributed a child through a composite branch.
    pub origins: HashMap<Slot, Vec<String>>,
}

impl Expansion {
    fn plain(schema: Value) -> Self {
        Self {
            schema,
            chain: Vec::new(),
            origins: HashMap::new(),
        }
    }

    /// References the child at `slot` descends through: the node's own chain
    /// plus those of the composite branches that supplied the child.
    pub fn ancestry_of(&self, slot: &Slot) -> Vec<String> {
        let mut refs = self.chain.clone();
        if let Some(extra) = self.origins.get(slot) {
            push_distinct(&mut refs, extra);
        }
        refs
    }

    /// Record the children a composite branch brings in. Properties are
    /// unioned, so every contributing branch counts; `items` and
    /// `additionalProperties` come from the first holder only.
    fn absorb(&mut self, folded: &Value, branch: &Expansion) {
        for slot in Slot::present(&branch.schema) {
            let first_wins = !matches!(slot, Slot::Property(_));
            if first_wins && (slot.is_held_by(&self.schema) || slot.is_held_by(folded)) {
                continue;
            }
            let refs = branch.ancestry_of(&slot);
            if !refs.is_empty() {
                push_distinct(self.origins.entry(slot).or_default(), &refs);
            }
        }
    }
}

fn push_distinct(into: &mut Vec<String>, refs: &[String]) {
    for pointer in refs {
        if !into.contains(pointer) {
            into.push(pointer.clone());
        }
    }
}

/// Expands schemas of one document, memoizing dereferenced targets.
pub struct Expander<'doc> {
    document: &'doc Value,
    cache: HashMap<String, Expansion>,
    active: Vec<String>,
    cuts: usize,
}

impl<'doc> Expander<'doc> {
    pub fn new(document: &'doc Value) -> Self {
        Self {
            document,
            cache: HashMap::new(),
            active: Vec::new(),
            cuts: 0,
        }
    }

    /// The document references are resolved against.
    pub fn document(&self) -> &'doc Value {
        self.document
    }

    /// Expand `$ref` and composite keywords at the top of `schema`.
    ///
    /// # Errors
    ///
    /// Returns `PointerError` for any reference that cannot be resolved.
    pub fn expand(&mut self, schema: &Value) -> Result<Value, PointerError> {
        self.expand_within(schema, &[]).map(|e| e.schema)
    }

    /// Expand `schema` as a descendant of the given references.
    ///
    /// A `$ref` to any pointer in `ancestry` is treated as a cycle and left
    /// unexpanded.
    pub fn expand_within(
        &mut self,
        schema: &Value,
        ancestry: &[String],
    ) -> Result<Expansion, PointerError> {
        self.active = ancestry.to_vec();
        let result = self.expand_node(schema);
        self.active.clear();
        result
    }

    fn expand_node(&mut self, schema: &Value) -> Result<Expansion, PointerError> {
        let Value::Object(map) = schema else {
            return Ok(Expansion::plain(schema.clone()));
        };

        let mut node = match map.get("$ref") {
            Some(Value::String(pointer)) => {
                if self.active.contains(pointer) {
                    tracing::debug!(pointer = %pointer, "reference cycle, leaving $ref unexpanded");
                    self.cuts += 1;
                    return Ok(Expansion::plain(schema.clone()));
                }
                let target = self.expand_reference(pointer)?;
                let siblings: Map<String, Value> = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "$ref")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let mut chain = vec![pointer.clone()];
                chain.extend(target.chain);
                Expansion {
                    schema: merge(&target.schema, &Value::Object(siblings)),
                    chain,
                    origins: target.origins,
                }
            }
            _ => Expansion::plain(schema.clone()),
        };

        for keyword in COMPOSITE_KEYWORDS {
            let Some(branches) = node
                .schema
                .as_object_mut()
                .and_then(|m| m.shift_remove(*keyword))
            else {
                continue;
            };
            let mut folded = Value::Object(Map::new());
            if let Value::Array(branches) = branches {
                for branch in &branches {
                    let expanded = self.expand_node(branch)?;
                    if is_cut(&expanded.schema) {
                        continue;
                    }
                    node.absorb(&folded, &expanded);
                    folded = merge(&folded, &expanded.schema);
                }
            }
            node.schema = merge(&node.schema, &folded);
        }

        Ok(node)
    }

    fn expand_reference(&mut self, pointer: &str) -> Result<Expansion, PointerError> {
        if let Some(cached) = self.cache.get(pointer) {
            return Ok(cached.clone());
        }

        let target = resolve_pointer(self.document, pointer)?;
        let cuts_before = self.cuts;
        self.active.push(pointer.to_string());
        let expanded = self.expand_node(target);
        self.active.pop();
        let expanded = expanded?;

        // results that hit a cycle depend on the current chain
        if self.cuts == cuts_before {
            self.cache.insert(pointer.to_string(), expanded.clone());
        }
        Ok(expanded)
    }
}

/// True if an expanded node still carries a `$ref`, i.e. it closed a cycle.
pub fn is_cut(schema: &Value) -> bool {
    schema.get("$ref").map_or(false, Value::is_string)
}
