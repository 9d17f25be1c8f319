//! Observable mirror - deeply-tracked state trees.
//!
//! Wraps a plain [`Value`] tree into a mirror where every read can be
//! tracked and every write notifies: scalar fields become reactive cells,
//! and each container carries a structure-version cell bumped on
//! insert/remove/replace. Dependency tracking, dirty propagation, and
//! notification all belong to `spark-signals`; this module only decides
//! which cell a read or write lands on.
//!
//! Granularity:
//!
//! - `get_path` reads one leaf plus the version of each container along
//!   the path, so a derived reading `state1.count` only recomputes when
//!   that field (or the shape around it) changes.
//! - [`ReactiveValue::track`] reads an entire subtree, which is how deep
//!   watches establish their dependencies.
//! - Writing a scalar over a scalar hits only that leaf cell; any edit
//!   that changes shape (new key, container value, removal) replaces the
//!   node and bumps the owning container's version.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{Signal, signal};

use crate::sub_state::SUB_STATE_MARKER;
use crate::value::Value;

// =============================================================================
// ReactiveValue
// =============================================================================

/// One node of an observable tree.
///
/// Handles are cheap clones sharing the same underlying cells; mutating
/// through any clone notifies every watcher.
#[derive(Clone)]
pub enum ReactiveValue {
    /// Scalar leaf backed by a single reactive cell.
    Leaf(Signal<Value>),
    /// Map node.
    Map(ReactiveMap),
    /// List node.
    List(ReactiveList),
}

impl ReactiveValue {
    /// Wrap a plain value into an observable node.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Map(entries) => ReactiveValue::Map(ReactiveMap::from_entries(entries)),
            Value::List(items) => ReactiveValue::List(ReactiveList::from_items(items)),
            leaf => ReactiveValue::Leaf(signal(leaf)),
        }
    }

    /// Borrow the map node, if this is one.
    pub fn as_map(&self) -> Option<&ReactiveMap> {
        match self {
            ReactiveValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the list node, if this is one.
    pub fn as_list(&self) -> Option<&ReactiveList> {
        match self {
            ReactiveValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Read the whole subtree as a plain value.
    ///
    /// Every cell in the subtree is read, so calling this inside an
    /// effect or derived establishes a deep dependency.
    pub fn snapshot(&self) -> Value {
        match self {
            ReactiveValue::Leaf(cell) => cell.get(),
            ReactiveValue::Map(map) => map.snapshot(),
            ReactiveValue::List(list) => list.snapshot(),
        }
    }

    /// Establish a deep dependency on the subtree without materializing it.
    pub fn track(&self) {
        match self {
            ReactiveValue::Leaf(cell) => {
                let _ = cell.get();
            }
            ReactiveValue::Map(map) => map.track(),
            ReactiveValue::List(list) => list.track(),
        }
    }

    /// Establish a shallow dependency: the leaf cell, or just the
    /// container's structure version.
    pub fn track_shallow(&self) {
        match self {
            ReactiveValue::Leaf(cell) => {
                let _ = cell.get();
            }
            ReactiveValue::Map(map) => {
                let _ = map.inner.version.get();
            }
            ReactiveValue::List(list) => {
                let _ = list.inner.version.get();
            }
        }
    }
}

fn is_leaf_value(value: &Value) -> bool {
    value.is_scalar()
}

// =============================================================================
// ReactiveMap
// =============================================================================

struct MapInner {
    entries: RefCell<Vec<(String, ReactiveValue)>>,
    version: Signal<u64>,
    next_version: Cell<u64>,
}

/// Observable map node. The root state tree of a store is one of these,
/// as is every tagged sub-state and nested map.
#[derive(Clone)]
pub struct ReactiveMap {
    inner: Rc<MapInner>,
}

impl ReactiveMap {
    /// Create an empty observable map (carries no sub-state marker).
    pub fn new() -> Self {
        ReactiveMap::from_entries(Vec::new())
    }

    /// Wrap a plain map value. Returns `None` for non-map input.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(entries) => Some(ReactiveMap::from_entries(entries)),
            _ => None,
        }
    }

    pub(crate) fn from_entries(entries: Vec<(String, Value)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key, ReactiveValue::new(value)))
            .collect();
        ReactiveMap {
            inner: Rc::new(MapInner {
                entries: RefCell::new(entries),
                version: signal(0),
                next_version: Cell::new(0),
            }),
        }
    }

    /// Structural change: bump the version cell so shape watchers re-run.
    ///
    /// Must be called with no outstanding borrow of `entries`; listeners
    /// run synchronously inside `set` and re-enter this node to re-track.
    fn bump(&self) {
        let next = self.inner.next_version.get() + 1;
        self.inner.next_version.set(next);
        self.inner.version.set(next);
    }

    /// Get the child node handle for a field.
    ///
    /// Reads the structure version, so callers inside an effect re-run
    /// when the field is added, removed, or replaced.
    pub fn entry(&self, key: &str) -> Option<ReactiveValue> {
        let _ = self.inner.version.get();
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node.clone())
    }

    /// Get a nested map handle for a field.
    pub fn sub(&self, key: &str) -> Option<ReactiveMap> {
        self.entry(key).and_then(|node| node.as_map().cloned())
    }

    /// Get a nested list handle for a field.
    pub fn list(&self, key: &str) -> Option<ReactiveList> {
        self.entry(key).and_then(|node| node.as_list().cloned())
    }

    /// Read a field's subtree as a plain value (deep, tracked).
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entry(key).map(|node| node.snapshot())
    }

    /// Read a nested value by path.
    ///
    /// Path segments name map fields; a segment that parses as an index
    /// descends into a list. Only the cells along the path are read, so
    /// this is the fine-grained way for selectors to depend on one field.
    pub fn get_path(&self, path: &[&str]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let node = self.entry(first)?;
        if rest.is_empty() {
            return Some(node.snapshot());
        }
        match node {
            ReactiveValue::Map(map) => map.get_path(rest),
            ReactiveValue::List(list) => list.get_path(rest),
            ReactiveValue::Leaf(_) => None,
        }
    }

    /// Write a field.
    ///
    /// A scalar written over an existing scalar field updates that leaf
    /// cell in place (no structural notification). Anything else replaces
    /// the node and bumps the structure version.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        // Fine-grained path: scalar over scalar reuses the leaf cell.
        let leaf = if is_leaf_value(&value) {
            self.inner
                .entries
                .borrow()
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, node)| match node {
                    ReactiveValue::Leaf(cell) => Some(cell.clone()),
                    _ => None,
                })
        } else {
            None
        };
        if let Some(cell) = leaf {
            cell.set(value);
            return;
        }

        let node = ReactiveValue::new(value);
        {
            let mut entries = self.inner.entries.borrow_mut();
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = node,
                None => entries.push((key.to_string(), node)),
            }
        }
        self.bump();
    }

    /// Remove a field. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = {
            let mut entries = self.inner.entries.borrow_mut();
            let before = entries.len();
            entries.retain(|(k, _)| k != key);
            entries.len() != before
        };
        if removed {
            self.bump();
        }
        removed
    }

    /// Check whether a field exists (tracked via the structure version).
    pub fn contains_key(&self, key: &str) -> bool {
        let _ = self.inner.version.get();
        self.inner.entries.borrow().iter().any(|(k, _)| k == key)
    }

    /// Number of fields (tracked via the structure version).
    pub fn len(&self) -> usize {
        let _ = self.inner.version.get();
        self.inner.entries.borrow().len()
    }

    /// Check whether the map has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names in insertion order (tracked via the structure version).
    pub fn keys(&self) -> Vec<String> {
        let _ = self.inner.version.get();
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Check whether this node carries the sub-state marker.
    pub fn is_sub_state(&self) -> bool {
        let marker = self
            .inner
            .entries
            .borrow()
            .iter()
            .find(|(k, _)| k == SUB_STATE_MARKER)
            .map(|(_, node)| node.clone());
        match marker {
            Some(ReactiveValue::Leaf(cell)) => cell.get() == Value::Bool(true),
            _ => false,
        }
    }

    /// Read the whole map as a plain value (deep, tracked).
    pub fn snapshot(&self) -> Value {
        let _ = self.inner.version.get();
        let entries = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(key, node)| (key.clone(), node.snapshot()))
            .collect();
        Value::Map(entries)
    }

    /// Establish a deep dependency on every cell in the map.
    pub fn track(&self) {
        let _ = self.inner.version.get();
        for (_, node) in self.inner.entries.borrow().iter() {
            node.track();
        }
    }

    /// Identity comparison: do two handles share the same node?
    pub fn same_node(&self, other: &ReactiveMap) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ReactiveMap {
    fn default() -> Self {
        ReactiveMap::new()
    }
}

// =============================================================================
// ReactiveList
// =============================================================================

struct ListInner {
    items: RefCell<Vec<ReactiveValue>>,
    version: Signal<u64>,
    next_version: Cell<u64>,
}

/// Observable list node.
#[derive(Clone)]
pub struct ReactiveList {
    inner: Rc<ListInner>,
}

impl ReactiveList {
    pub(crate) fn from_items(items: Vec<Value>) -> Self {
        let items = items.into_iter().map(ReactiveValue::new).collect();
        ReactiveList {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                version: signal(0),
                next_version: Cell::new(0),
            }),
        }
    }

    fn bump(&self) {
        let next = self.inner.next_version.get() + 1;
        self.inner.next_version.set(next);
        self.inner.version.set(next);
    }

    /// Read an element's subtree as a plain value (deep, tracked).
    pub fn get(&self, index: usize) -> Option<Value> {
        let _ = self.inner.version.get();
        let node = self.inner.items.borrow().get(index).cloned();
        node.map(|node| node.snapshot())
    }

    fn get_path(&self, path: &[&str]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let index: usize = first.parse().ok()?;
        let _ = self.inner.version.get();
        let node = self.inner.items.borrow().get(index).cloned()?;
        if rest.is_empty() {
            return Some(node.snapshot());
        }
        match node {
            ReactiveValue::Map(map) => map.get_path(rest),
            ReactiveValue::List(list) => list.get_path(rest),
            ReactiveValue::Leaf(_) => None,
        }
    }

    /// Write an element in place. Out-of-bounds writes are ignored.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();

        let leaf = if is_leaf_value(&value) {
            self.inner
                .items
                .borrow()
                .get(index)
                .and_then(|node| match node {
                    ReactiveValue::Leaf(cell) => Some(cell.clone()),
                    _ => None,
                })
        } else {
            None
        };
        if let Some(cell) = leaf {
            cell.set(value);
            return;
        }

        let replaced = {
            let mut items = self.inner.items.borrow_mut();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = ReactiveValue::new(value);
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.bump();
        }
    }

    /// Append an element.
    pub fn push(&self, value: impl Into<Value>) {
        self.inner
            .items
            .borrow_mut()
            .push(ReactiveValue::new(value.into()));
        self.bump();
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let node = self.inner.items.borrow_mut().pop();
        let node = node?;
        self.bump();
        Some(node.snapshot())
    }

    /// Number of elements (tracked via the structure version).
    pub fn len(&self) -> usize {
        let _ = self.inner.version.get();
        self.inner.items.borrow().len()
    }

    /// Check whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the whole list as a plain value (deep, tracked).
    pub fn snapshot(&self) -> Value {
        let _ = self.inner.version.get();
        let items = self
            .inner
            .items
            .borrow()
            .iter()
            .map(ReactiveValue::snapshot)
            .collect();
        Value::List(items)
    }

    /// Establish a deep dependency on every cell in the list.
    pub fn track(&self) {
        let _ = self.inner.version.get();
        for node in self.inner.items.borrow().iter() {
            node.track();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
