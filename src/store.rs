//! Store - one reactive state tree plus realized selectors.
//!
//! A store owns one observable root tree (named keys mapping to tagged
//! sub-states) and the memoized derived values realized from its selector
//! functions. Views bind to it through the subscription operations, which
//! hand the actual watch wiring to the [coalescer](crate::subscribe).
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use spark_store::{create_store, create_sub_state, SelectorFn, Value};
//!
//! let counter = create_sub_state(Value::map([("count", Value::from(1))])).unwrap();
//! let next: SelectorFn = Rc::new(|state| {
//!     Value::from(
//!         state
//!             .get_path(&["counter", "count"])
//!             .and_then(|v| v.as_int())
//!             .unwrap_or(0)
//!             + 1,
//!     )
//! });
//!
//! let store = create_store([("counter", counter)], [("next", next)]).unwrap();
//! assert_eq!(store.selector("next").unwrap().get(), Value::Int(2));
//!
//! store.state().sub("counter").unwrap().set("count", 2);
//! assert_eq!(store.selector("next").unwrap().get(), Value::Int(3));
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use spark_signals::{Derived, derived};
use tracing::debug;

use crate::error::StoreError;
use crate::observable::ReactiveMap;
use crate::sub_state::is_sub_state;
use crate::subscribe;
use crate::value::Value;
use crate::view;
use crate::view::ViewId;

// =============================================================================
// Selectors
// =============================================================================

/// A pure selector function over the reactive state tree.
pub type SelectorFn = Rc<dyn Fn(&ReactiveMap) -> Value>;

type SelectorThunk = Box<dyn Fn() -> Value>;

/// A realized selector: a memoized derived value bound to one store's
/// tree. Recomputes lazily, at most once per distinct set of changes to
/// the reactive cells it reads.
#[derive(Clone)]
pub struct Selector {
    inner: Rc<Derived<Value>>,
}

impl Selector {
    fn from_thunk(read: SelectorThunk) -> Self {
        Selector {
            inner: Rc::new(derived(read)),
        }
    }

    /// Current value, recomputing first if any input changed.
    pub fn get(&self) -> Value {
        self.inner.get()
    }
}

/// A derived-value watch target: a realized selector, or a bare getter
/// wrapped into an on-the-fly derived at subscription time so memoized
/// recomputation semantics apply either way.
#[derive(Clone)]
pub enum SelectorTarget {
    /// A selector realized by the store.
    Selector(Selector),
    /// A zero-argument read function.
    Getter(Rc<dyn Fn() -> Value>),
}

impl SelectorTarget {
    /// Wrap a plain closure as a watch target.
    pub fn from_fn(read: impl Fn() -> Value + 'static) -> Self {
        SelectorTarget::Getter(Rc::new(read))
    }

    /// The memoized read function the coalescer watches.
    pub(crate) fn realize(&self) -> Selector {
        match self {
            SelectorTarget::Selector(selector) => selector.clone(),
            SelectorTarget::Getter(read) => {
                let read = read.clone();
                Selector::from_thunk(Box::new(move || read()))
            }
        }
    }
}

impl From<Selector> for SelectorTarget {
    fn from(selector: Selector) -> Self {
        SelectorTarget::Selector(selector)
    }
}

impl From<&Selector> for SelectorTarget {
    fn from(selector: &Selector) -> Self {
        SelectorTarget::Selector(selector.clone())
    }
}

// =============================================================================
// Store
// =============================================================================

/// One reactive state tree plus its realized selectors and the shared
/// pending-update map for subscription coalescing.
pub struct Store {
    state: ReactiveMap,
    selectors: HashMap<String, Selector>,
    pending_updates: Rc<RefCell<HashSet<ViewId>>>,
}

/// Build a store from tagged sub-states and selector functions.
///
/// Every top-level entry is validated before any reactive wrapping
/// happens: either the whole tree wraps, or the call fails and no store
/// escapes.
///
/// # Errors
///
/// [`StoreError::InvalidSubState`] naming the first entry that does not
/// carry the sub-state marker.
pub fn create_store<K, N>(
    initial_state: impl IntoIterator<Item = (K, Value)>,
    selectors: impl IntoIterator<Item = (N, SelectorFn)>,
) -> Result<Store, StoreError>
where
    K: Into<String>,
    N: Into<String>,
{
    let entries: Vec<(String, Value)> = initial_state
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect();

    for (key, value) in &entries {
        if !is_sub_state(value) {
            return Err(StoreError::InvalidSubState { key: key.clone() });
        }
    }

    let sub_state_count = entries.len();
    let state = ReactiveMap::from_entries(entries);

    let mut realized = HashMap::new();
    for (name, read) in selectors {
        let tree = state.clone();
        realized.insert(
            name.into(),
            Selector::from_thunk(Box::new(move || read(&tree))),
        );
    }

    debug!(
        sub_states = sub_state_count,
        selectors = realized.len(),
        "store created"
    );

    Ok(Store {
        state,
        selectors: realized,
        pending_updates: Rc::new(RefCell::new(HashSet::new())),
    })
}

impl Store {
    /// The reactive state tree.
    pub fn state(&self) -> &ReactiveMap {
        &self.state
    }

    /// Every realized selector by name.
    pub fn selectors(&self) -> &HashMap<String, Selector> {
        &self.selectors
    }

    /// One realized selector by name.
    pub fn selector(&self, name: &str) -> Option<&Selector> {
        self.selectors.get(name)
    }

    /// The state tree and the realized selectors together.
    pub fn state_and_selectors(&self) -> (&ReactiveMap, &HashMap<String, Selector>) {
        (&self.state, &self.selectors)
    }

    /// Subscribe the current view to a set of sub-states.
    ///
    /// Must be called during a view's setup phase. See
    /// [`use_state_and_selectors`](Store::use_state_and_selectors) for the
    /// validation and coalescing contract.
    pub fn use_state(&self, sub_states: &[ReactiveMap]) -> Result<(), StoreError> {
        self.use_state_and_selectors(sub_states, &[])
    }

    /// Subscribe the current view to a set of derived-value targets.
    ///
    /// Must be called during a view's setup phase.
    pub fn use_selectors(&self, selectors: &[SelectorTarget]) -> Result<(), StoreError> {
        self.use_state_and_selectors(&[], selectors)
    }

    /// Subscribe the current view to sub-states and derived-value targets
    /// in one subscription sharing one coalescing window.
    ///
    /// Every sub-state target is checked for the marker before any
    /// listener is registered; on failure nothing was attached. However
    /// many of the targets change within one window, the view receives at
    /// most one re-render, delivered on the next
    /// [`scheduler::flush`](crate::scheduler::flush). The subscription is
    /// torn down when the view unmounts.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotASubState`] naming the position of the first
    /// sub-state target that does not carry the marker.
    ///
    /// # Panics
    ///
    /// Panics when called outside a view's setup phase.
    pub fn use_state_and_selectors(
        &self,
        sub_states: &[ReactiveMap],
        selectors: &[SelectorTarget],
    ) -> Result<(), StoreError> {
        for (position, sub_state) in sub_states.iter().enumerate() {
            if !sub_state.is_sub_state() {
                return Err(StoreError::NotASubState { position });
            }
        }

        let view = view::current_view()
            .expect("subscription operations must be called during a view's setup phase");

        subscribe::subscribe(self.pending_updates.clone(), view, sub_states, selectors);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
