//! Schema descriptors and the memoizing registry
//!
//! The tree store needs to know, for a given record type, which of its
//! fields are child collections and how keyed children derive their
//! identity. A `DescriptorSource` answers that question; the
//! `SchemaRegistry` memoizes answers for the life of the registry so that
//! repeated lookups are pure cache hits.
//!
//! The registry is an explicit object constructed once at startup and
//! passed by reference into the tree store. There is no process-wide
//! singleton.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Whether a child field holds one node or a keyed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// A single optional child node
    One,
    /// A keyed collection of child nodes
    Many,
}

/// Descriptor for one child field of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    /// Field name on the parent record holding the children
    pub field: String,
    /// Record type of the children
    pub child_type: String,
    /// One child or a keyed collection
    pub multiplicity: Multiplicity,
    /// Field on the child record that supplies its storage key
    ///
    /// Required for `Many` collections; ignored for `One`.
    pub key_field: Option<String>,
}

impl ChildDescriptor {
    /// Descriptor for a keyed child collection
    pub fn many(
        field: impl Into<String>,
        child_type: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        ChildDescriptor {
            field: field.into(),
            child_type: child_type.into(),
            multiplicity: Multiplicity::Many,
            key_field: Some(key_field.into()),
        }
    }

    /// Descriptor for a single optional child
    pub fn one(field: impl Into<String>, child_type: impl Into<String>) -> Self {
        ChildDescriptor {
            field: field.into(),
            child_type: child_type.into(),
            multiplicity: Multiplicity::One,
            key_field: None,
        }
    }
}

/// Source of child descriptors for record types
///
/// Any mechanism that can answer "for record type T, what are its child
/// collections?" satisfies this dependency: a static table, generated
/// descriptors, or something dynamic. A type with no discoverable
/// children yields an empty list, not an error.
pub trait DescriptorSource: Send + Sync {
    /// Ordered child descriptors for `type_name`
    fn children_of(&self, type_name: &str) -> Vec<ChildDescriptor>;
}

/// Statically declared descriptor table
///
/// The common case: child descriptors registered up front, before the
/// tree store is constructed.
#[derive(Debug, Default)]
pub struct StaticDescriptorSource {
    table: HashMap<String, Vec<ChildDescriptor>>,
}

impl StaticDescriptorSource {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the ordered children of a record type
    pub fn with_type(
        mut self,
        type_name: impl Into<String>,
        children: Vec<ChildDescriptor>,
    ) -> Self {
        self.table.insert(type_name.into(), children);
        self
    }
}

impl DescriptorSource for StaticDescriptorSource {
    fn children_of(&self, type_name: &str) -> Vec<ChildDescriptor> {
        self.table.get(type_name).cloned().unwrap_or_default()
    }
}

/// Memoizing schema registry
///
/// Descriptor lists are computed lazily on first request for a type and
/// retained for the registry's lifetime, never evicted. Concurrent
/// first-time lookups are serialized by the write lock so discovery work
/// is not duplicated; later lookups take the read lock only.
pub struct SchemaRegistry {
    source: Box<dyn DescriptorSource>,
    cache: RwLock<HashMap<String, Arc<[ChildDescriptor]>>>,
    discoveries: AtomicU64,
}

impl SchemaRegistry {
    /// Create a registry over a descriptor source
    pub fn new(source: impl DescriptorSource + 'static) -> Self {
        SchemaRegistry {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
            discoveries: AtomicU64::new(0),
        }
    }

    /// Ordered child descriptors for a record type
    ///
    /// Descriptor order is stable across repeated calls for the same
    /// type; it is the iteration order for list and deep get.
    pub fn children_of(&self, type_name: &str) -> Arc<[ChildDescriptor]> {
        if let Some(cached) = self.cache.read().get(type_name) {
            return Arc::clone(cached);
        }

        let mut cache = self.cache.write();
        // Another thread may have populated the entry while we waited.
        if let Some(cached) = cache.get(type_name) {
            return Arc::clone(cached);
        }

        let discovered: Arc<[ChildDescriptor]> = self.source.children_of(type_name).into();
        self.discoveries.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(type_name, children = discovered.len(), "discovered child descriptors");
        cache.insert(type_name.to_string(), Arc::clone(&discovered));
        discovered
    }

    /// Descriptor for one child field of a record type
    pub fn child_descriptor(&self, type_name: &str, field: &str) -> Option<ChildDescriptor> {
        self.children_of(type_name)
            .iter()
            .find(|d| d.field == field)
            .cloned()
    }

    /// Number of discovery calls made against the source
    ///
    /// Cache hits do not count; used to observe memoization.
    pub fn discovery_count(&self) -> u64 {
        self.discoveries.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("cached_types", &self.cache.read().len())
            .field("discoveries", &self.discovery_count())
            .finish()
    }
}
