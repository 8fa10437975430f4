//! Tree nodes
//!
//! A node holds one record payload plus the ordered/keyed child nodes the
//! record's schema descriptors declare. On ingest, declared child fields
//! are split out of the record's value into child nodes; reads re-assemble
//! them up to the requested depth. A node belongs exclusively to one tree,
//! main or branch copy; the whole subtree is `Clone` so a transaction
//! branch is an isolated deep copy.

use confmodel_core::{
    Error, JsonValue, Multiplicity, OpContext, Record, Result, SchemaRegistry,
};
use std::collections::BTreeMap;

/// Depth sentinel for unbounded child expansion
pub const DEPTH_UNBOUNDED: i64 = -1;

/// Child slot for one declared field of a node
#[derive(Debug, Clone)]
enum NodeChildren {
    /// A single optional child node
    One(Option<Box<Node>>),
    /// A keyed collection, ordered by key
    Many(BTreeMap<String, Node>),
}

/// A tree vertex holding one record and its keyed children
#[derive(Debug, Clone)]
pub struct Node {
    type_name: String,
    payload: JsonValue,
    children: BTreeMap<String, NodeChildren>,
}

impl Node {
    /// Build an empty node of the given record type
    ///
    /// Used for the tree root; declared collections start empty.
    pub fn empty(registry: &SchemaRegistry, type_name: &str) -> Result<Node> {
        Node::from_record(registry, Record::new(type_name, serde_json::json!({})))
    }

    /// Build a node (and its subtree) from a record
    ///
    /// Declared child fields are stripped from the record value and
    /// materialized as child nodes; everything else stays in the payload.
    /// Keyed children derive their storage key from their own key field.
    pub fn from_record(registry: &SchemaRegistry, record: Record) -> Result<Node> {
        let descriptors = registry.children_of(&record.type_name);
        let Record {
            type_name,
            mut value,
        } = record;

        let mut children = BTreeMap::new();
        for desc in descriptors.iter() {
            let raw = value.take_field(&desc.field);
            let slot = match desc.multiplicity {
                Multiplicity::One => {
                    let child = match raw {
                        None | Some(serde_json::Value::Null) => None,
                        Some(v) => Some(Box::new(Node::from_record(
                            registry,
                            Record::new(desc.child_type.clone(), v),
                        )?)),
                    };
                    NodeChildren::One(child)
                }
                Multiplicity::Many => {
                    let key_field = desc.key_field.as_deref().ok_or_else(|| {
                        Error::schema(format!(
                            "collection {} of {} declares no key field",
                            desc.field, type_name
                        ))
                    })?;
                    let mut map = BTreeMap::new();
                    match raw {
                        None | Some(serde_json::Value::Null) => {}
                        Some(serde_json::Value::Array(items)) => {
                            for item in items {
                                let child = Record::new(desc.child_type.clone(), item);
                                let key = child.key_from_field(key_field)?;
                                let node = Node::from_record(registry, child)?;
                                if map.insert(key.clone(), node).is_some() {
                                    return Err(Error::schema(format!(
                                        "duplicate key {} in collection {} of {}",
                                        key, desc.field, type_name
                                    )));
                                }
                            }
                        }
                        Some(other) => {
                            return Err(Error::schema(format!(
                                "collection {} of {} is not an array: {}",
                                desc.field, type_name, other
                            )))
                        }
                    }
                    NodeChildren::Many(map)
                }
            };
            children.insert(desc.field.clone(), slot);
        }

        Ok(Node {
            type_name,
            payload: value,
            children,
        })
    }

    /// Record type of this node
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Re-assemble this node into a by-value record
    ///
    /// `depth` bounds how many child levels are attached (0 = payload
    /// only); `deep` or a negative depth means unbounded. Child fields are
    /// attached in descriptor order, keyed collections in key order.
    /// Cancellation is checked before each node expansion.
    pub fn materialize(
        &self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        depth: i64,
        deep: bool,
    ) -> Result<Record> {
        ctx.check()?;
        let mut value = self.payload.clone();
        let remaining = if deep || depth < 0 { DEPTH_UNBOUNDED } else { depth };

        if remaining != 0 {
            let next = if remaining == DEPTH_UNBOUNDED {
                DEPTH_UNBOUNDED
            } else {
                remaining - 1
            };
            for desc in registry.children_of(&self.type_name).iter() {
                match self.children.get(&desc.field) {
                    Some(NodeChildren::One(Some(child))) => {
                        let rec = child.materialize(registry, ctx, next, deep)?;
                        value.set_field(&desc.field, rec.value.into_inner());
                    }
                    Some(NodeChildren::One(None)) | None => {}
                    Some(NodeChildren::Many(map)) => {
                        let mut items = Vec::with_capacity(map.len());
                        for child in map.values() {
                            items.push(child.materialize(registry, ctx, next, deep)?.value.into_inner());
                        }
                        value.set_field(&desc.field, serde_json::Value::Array(items));
                    }
                }
            }
        }

        Ok(Record {
            type_name: self.type_name.clone(),
            value,
        })
    }

    /// Navigate to the node at `segments`
    fn find(
        &self,
        registry: &SchemaRegistry,
        segments: &[&str],
        full_path: &str,
    ) -> Result<&Node> {
        let Some((field, rest)) = segments.split_first() else {
            return Ok(self);
        };
        let desc = registry
            .child_descriptor(&self.type_name, field)
            .ok_or_else(|| Error::not_found(full_path))?;
        match (desc.multiplicity, self.children.get(*field)) {
            (Multiplicity::One, Some(NodeChildren::One(Some(child)))) => {
                child.find(registry, rest, full_path)
            }
            (Multiplicity::Many, Some(NodeChildren::Many(map))) => {
                let (key, rest) = rest
                    .split_first()
                    .ok_or_else(|| Error::not_found(full_path))?;
                let child = map.get(*key).ok_or_else(|| Error::not_found(full_path))?;
                child.find(registry, rest, full_path)
            }
            _ => Err(Error::not_found(full_path)),
        }
    }

    /// Mutable twin of [`Node::find`]
    fn find_mut(
        &mut self,
        registry: &SchemaRegistry,
        segments: &[&str],
        full_path: &str,
    ) -> Result<&mut Node> {
        let Some((field, rest)) = segments.split_first() else {
            return Ok(self);
        };
        let desc = registry
            .child_descriptor(&self.type_name, field)
            .ok_or_else(|| Error::not_found(full_path))?;
        match (desc.multiplicity, self.children.get_mut(*field)) {
            (Multiplicity::One, Some(NodeChildren::One(Some(child)))) => {
                child.find_mut(registry, rest, full_path)
            }
            (Multiplicity::Many, Some(NodeChildren::Many(map))) => {
                let (key, rest) = rest
                    .split_first()
                    .ok_or_else(|| Error::not_found(full_path))?;
                let child = map
                    .get_mut(*key)
                    .ok_or_else(|| Error::not_found(full_path))?;
                child.find_mut(registry, rest, full_path)
            }
            _ => Err(Error::not_found(full_path)),
        }
    }

    /// Resolve `segments` and return the value at that node
    pub fn get(
        &self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        segments: &[&str],
        full_path: &str,
        depth: i64,
        deep: bool,
    ) -> Result<Record> {
        let node = self.find(registry, segments, full_path)?;
        node.materialize(registry, ctx, depth, deep)
    }

    /// Resolve `segments` to a keyed collection and return its members
    pub fn list(
        &self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        segments: &[&str],
        full_path: &str,
        depth: i64,
        deep: bool,
    ) -> Result<Vec<Record>> {
        let Some((field, parent_segments)) = segments.split_last() else {
            return Err(Error::InvalidOperation(format!(
                "list target {} is not a keyed collection",
                full_path
            )));
        };
        let parent = self.find(registry, parent_segments, full_path)?;
        let desc = registry
            .child_descriptor(&parent.type_name, field)
            .ok_or_else(|| Error::not_found(full_path))?;
        match (desc.multiplicity, parent.children.get(*field)) {
            (Multiplicity::Many, Some(NodeChildren::Many(map))) => map
                .values()
                .map(|child| child.materialize(registry, ctx, depth, deep))
                .collect(),
            _ => Err(Error::InvalidOperation(format!(
                "list target {} is not a keyed collection",
                full_path
            ))),
        }
    }

    /// Insert a record into the keyed collection at `segments`
    ///
    /// The storage key is always derived from the record's own key field.
    pub fn add(
        &mut self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        segments: &[&str],
        record: Record,
        full_path: &str,
    ) -> Result<Record> {
        ctx.check()?;
        let Some((field, parent_segments)) = segments.split_last() else {
            return Err(Error::InvalidOperation(format!(
                "add target {} is not a keyed collection",
                full_path
            )));
        };
        let parent = self.find_mut(registry, parent_segments, full_path)?;
        let desc = registry
            .child_descriptor(&parent.type_name, field)
            .ok_or_else(|| Error::not_found(full_path))?;
        if desc.multiplicity != Multiplicity::Many {
            return Err(Error::InvalidOperation(format!(
                "add target {} is not a keyed collection",
                full_path
            )));
        }
        if record.type_name != desc.child_type {
            return Err(Error::schema(format!(
                "collection {} holds {} records, got {}",
                full_path, desc.child_type, record.type_name
            )));
        }
        let key_field = desc.key_field.as_deref().ok_or_else(|| {
            Error::schema(format!("collection {} declares no key field", full_path))
        })?;
        let key = record.key_from_field(key_field)?;
        let node = Node::from_record(registry, record)?;

        let slot = parent
            .children
            .entry(field.to_string())
            .or_insert_with(|| NodeChildren::Many(BTreeMap::new()));
        match slot {
            NodeChildren::Many(map) => {
                if map.contains_key(&key) {
                    return Err(Error::KeyConflict {
                        path: full_path.to_string(),
                        key,
                    });
                }
                let stored = node.materialize(registry, ctx, DEPTH_UNBOUNDED, true)?;
                map.insert(key, node);
                Ok(stored)
            }
            NodeChildren::One(_) => Err(Error::InvalidOperation(format!(
                "add target {} is not a keyed collection",
                full_path
            ))),
        }
    }

    /// Replace or merge the record at `segments`
    ///
    /// `strict=true` replaces the whole node from a structurally complete
    /// document; `strict=false` shallow-merges scalar fields into the
    /// payload (declared child fields in the patch are ignored). Either
    /// way a keyed node's identifying field cannot change: the record's
    /// identity must keep matching the key it is stored under.
    pub fn update(
        &mut self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        segments: &[&str],
        record: Record,
        strict: bool,
        full_path: &str,
    ) -> Result<Record> {
        ctx.check()?;
        let Some((field, rest)) = segments.split_first() else {
            return self.apply_update(registry, ctx, record, strict, None, full_path);
        };
        let desc = registry
            .child_descriptor(&self.type_name, field)
            .ok_or_else(|| Error::not_found(full_path))?;
        match (desc.multiplicity, self.children.get_mut(*field)) {
            (Multiplicity::One, Some(NodeChildren::One(Some(child)))) => {
                child.update(registry, ctx, rest, record, strict, full_path)
            }
            (Multiplicity::Many, Some(NodeChildren::Many(map))) => {
                let (key, rest) = rest
                    .split_first()
                    .ok_or_else(|| Error::not_found(full_path))?;
                let child = map
                    .get_mut(*key)
                    .ok_or_else(|| Error::not_found(full_path))?;
                if rest.is_empty() {
                    let key_field = desc.key_field.as_deref();
                    child.apply_update(
                        registry,
                        ctx,
                        record,
                        strict,
                        key_field.map(|kf| (*key, kf)),
                        full_path,
                    )
                } else {
                    child.update(registry, ctx, rest, record, strict, full_path)
                }
            }
            _ => Err(Error::not_found(full_path)),
        }
    }

    fn apply_update(
        &mut self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        record: Record,
        strict: bool,
        key_check: Option<(&str, &str)>,
        full_path: &str,
    ) -> Result<Record> {
        if strict {
            if !record.value.is_object() {
                return Err(Error::schema(format!(
                    "strict update at {} requires a complete document",
                    full_path
                )));
            }
            if record.type_name != self.type_name {
                return Err(Error::schema(format!(
                    "update at {} expects type {}, got {}",
                    full_path, self.type_name, record.type_name
                )));
            }
            if let Some((expected_key, key_field)) = key_check {
                let new_key = record.key_from_field(key_field)?;
                if new_key != expected_key {
                    return Err(Error::KeyConflict {
                        path: full_path.to_string(),
                        key: new_key,
                    });
                }
            }
            *self = Node::from_record(registry, record)?;
        } else {
            // A merge patch may restate the key but never change it: the
            // node stays stored under its map key.
            if let Some((expected_key, key_field)) = key_check {
                if record.value.field(key_field).is_some() {
                    let new_key = record.key_from_field(key_field)?;
                    if new_key != expected_key {
                        return Err(Error::KeyConflict {
                            path: full_path.to_string(),
                            key: new_key,
                        });
                    }
                }
            }
            let mut patch = record.value;
            for desc in registry.children_of(&self.type_name).iter() {
                patch.take_field(&desc.field);
            }
            self.payload.merge_fields(&patch);
        }
        self.materialize(registry, ctx, DEPTH_UNBOUNDED, true)
    }

    /// Delete the subtree rooted at `segments` and return its value
    pub fn remove(
        &mut self,
        registry: &SchemaRegistry,
        ctx: &OpContext,
        segments: &[&str],
        full_path: &str,
    ) -> Result<Record> {
        ctx.check()?;
        let Some((field, rest)) = segments.split_first() else {
            return Err(Error::InvalidOperation(
                "cannot remove the tree root".to_string(),
            ));
        };
        let desc = registry
            .child_descriptor(&self.type_name, field)
            .ok_or_else(|| Error::not_found(full_path))?;
        match (desc.multiplicity, self.children.get_mut(*field)) {
            (Multiplicity::One, Some(NodeChildren::One(slot))) => {
                if rest.is_empty() {
                    let child = slot.take().ok_or_else(|| Error::not_found(full_path))?;
                    child.materialize(registry, ctx, DEPTH_UNBOUNDED, true)
                } else {
                    let child = slot.as_mut().ok_or_else(|| Error::not_found(full_path))?;
                    child.remove(registry, ctx, rest, full_path)
                }
            }
            (Multiplicity::Many, Some(NodeChildren::Many(map))) => {
                let (key, rest) = rest.split_first().ok_or_else(|| {
                    Error::InvalidOperation(format!(
                        "remove target {} is a collection, not a node",
                        full_path
                    ))
                })?;
                if rest.is_empty() {
                    let child = map
                        .remove(*key)
                        .ok_or_else(|| Error::not_found(full_path))?;
                    child.materialize(registry, ctx, DEPTH_UNBOUNDED, true)
                } else {
                    let child = map
                        .get_mut(*key)
                        .ok_or_else(|| Error::not_found(full_path))?;
                    child.remove(registry, ctx, rest, full_path)
                }
            }
            _ => Err(Error::not_found(full_path)),
        }
    }

    /// True if a node exists at `segments`
    pub fn contains(&self, registry: &SchemaRegistry, segments: &[&str]) -> bool {
        self.find(registry, segments, "").is_ok()
    }
}
