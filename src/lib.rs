//! # spark-store
//!
//! Reactive state store with coalesced view subscriptions.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactivity.
//!
//! ## Architecture
//!
//! Application state lives in one observable tree per store: named keys
//! mapping to tagged sub-states, wrapped so that mutating any nested field
//! is individually observable. Selectors are memoized derived values over
//! that tree. Views subscribe to the sub-states and selectors they read;
//! however many of those change within one synchronous burst, each view
//! re-renders exactly once, on the next deferred-queue flush:
//!
//! ```text
//! mutation → sync watch listeners → pending flag per view → one deferred
//! task → flush() → force-update → view re-reads live state
//! ```
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use spark_store::{
//!     create_store, create_sub_state, scheduler, view::mount_view, SelectorFn, Value,
//! };
//!
//! let state1 = create_sub_state(Value::map([("count", Value::from(1))])).unwrap();
//! let next: SelectorFn = Rc::new(|state| {
//!     Value::from(state.get_path(&["state1", "count"]).and_then(|v| v.as_int()).unwrap_or(0) + 1)
//! });
//! let store = create_store([("state1", state1)], [("next", next)]).unwrap();
//!
//! let state1 = store.state().sub("state1").unwrap();
//! let target = state1.clone();
//! let view = mount_view(move || {
//!     store.use_state(std::slice::from_ref(&target)).unwrap();
//! });
//!
//! state1.set("count", 2);
//! state1.set("count", 3);
//! scheduler::flush();
//!
//! assert_eq!(view.render_count(), 1);
//! view.unmount();
//! ```
//!
//! ## Modules
//!
//! - [`value`] - Plain value model for state fragments
//! - [`sub_state`] - Sub-state tagging and the reserved marker
//! - [`observable`] - Deeply-tracked mirror over `spark-signals` cells
//! - [`store`] - Store construction, selectors, subscription operations
//! - [`watch`] - Change listeners over nodes and read functions
//! - [`scheduler`] - Deferred task queue (the coalescing window)
//! - [`view`] - View harness: mount/unmount lifecycle and force-update

pub mod error;
pub mod observable;
pub mod scheduler;
pub mod store;
pub mod sub_state;
pub mod value;
pub mod view;
pub mod watch;

mod subscribe;

// Re-export commonly used items
pub use error::StoreError;
pub use observable::{ReactiveList, ReactiveMap, ReactiveValue};
pub use store::{Selector, SelectorFn, SelectorTarget, Store, create_store};
pub use sub_state::{SUB_STATE_MARKER, create_sub_state, is_sub_state};
pub use value::Value;
pub use view::{ViewHandle, ViewId, mount_view, on_view_cleanup, use_force_update};
pub use watch::{Cleanup, Delivery, WatchOptions, WatchSource, watch};
