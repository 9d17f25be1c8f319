//! View harness - the component-framework boundary.
//!
//! The store core needs exactly three things from a view framework: a
//! setup phase that runs once per mounted view, cleanup callbacks that run
//! once at unmount, and a render-trigger slot per view instance. This
//! module provides that surface, with the current view carried on a
//! thread-local context stack during setup.
//!
//! # Example
//!
//! ```
//! use spark_store::view::{mount_view, use_force_update};
//!
//! let view = mount_view(|| {
//!     let force_update = use_force_update();
//!     force_update();
//! });
//!
//! assert_eq!(view.render_count(), 1);
//! view.unmount();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::watch::Cleanup;

// =============================================================================
// View Identity
// =============================================================================

/// Opaque identity token for one mounted view instance.
///
/// Issued at mount time; the coalescer keys its pending-update map by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ViewId(u64);

thread_local! {
    static VIEW_STACK: RefCell<Vec<ViewHandle>> = const { RefCell::new(Vec::new()) };
    static NEXT_VIEW_ID: Cell<u64> = const { Cell::new(0) };
}

// =============================================================================
// View Handle
// =============================================================================

struct ViewInner {
    id: ViewId,
    live: Cell<bool>,
    render_count: Cell<u64>,
    render_callback: RefCell<Option<Rc<dyn Fn()>>>,
    cleanups: RefCell<Vec<Cleanup>>,
}

/// Handle to one mounted view instance.
///
/// Clones share the same view; [`unmount`](ViewHandle::unmount) through
/// any clone tears the view down exactly once.
#[derive(Clone)]
pub struct ViewHandle {
    inner: Rc<ViewInner>,
}

impl ViewHandle {
    /// This view's identity token.
    pub fn id(&self) -> ViewId {
        self.inner.id
    }

    /// Check whether the view is still mounted.
    pub fn is_live(&self) -> bool {
        self.inner.live.get()
    }

    /// Number of re-renders delivered so far.
    pub fn render_count(&self) -> u64 {
        self.inner.render_count.get()
    }

    /// Install the render callback invoked on every delivered re-render.
    ///
    /// Without one, re-renders are still counted; an embedding framework
    /// installs its actual render pass here.
    pub fn set_render_callback(&self, callback: impl Fn() + 'static) {
        *self.inner.render_callback.borrow_mut() = Some(Rc::new(callback));
    }

    /// Deliver a re-render to this view: bump the counter and run the
    /// installed render callback, if any.
    pub fn request_render(&self) {
        self.inner.render_count.set(self.inner.render_count.get() + 1);
        let callback = self.inner.render_callback.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Unmount the view: mark it dead, then run every registered cleanup
    /// in registration order. Unmounting twice is a no-op.
    pub fn unmount(self) {
        if !self.inner.live.get() {
            return;
        }
        self.inner.live.set(false);
        let cleanups: Vec<Cleanup> = self.inner.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups {
            cleanup();
        }
        debug!(view = ?self.inner.id, "view unmounted");
    }
}

// =============================================================================
// Mounting and Context
// =============================================================================

/// Mount a view: allocate its identity, push it as the current view
/// context, run `setup` once, pop the context, and return the handle.
pub fn mount_view(setup: impl FnOnce()) -> ViewHandle {
    let id = NEXT_VIEW_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        ViewId(id)
    });

    let handle = ViewHandle {
        inner: Rc::new(ViewInner {
            id,
            live: Cell::new(true),
            render_count: Cell::new(0),
            render_callback: RefCell::new(None),
            cleanups: RefCell::new(Vec::new()),
        }),
    };
    debug!(view = ?id, "view mounted");

    VIEW_STACK.with(|stack| stack.borrow_mut().push(handle.clone()));
    setup();
    VIEW_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });

    handle
}

/// The view whose setup phase is currently executing, if any.
pub fn current_view() -> Option<ViewHandle> {
    VIEW_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Register a cleanup to run when the current view unmounts.
///
/// Outside a setup phase there is no view to attach to; the cleanup is
/// dropped with a warning.
pub fn on_view_cleanup(cleanup: impl FnOnce() + 'static) {
    match current_view() {
        Some(view) => view.inner.cleanups.borrow_mut().push(Box::new(cleanup)),
        None => warn!("on_view_cleanup called outside a view setup phase; cleanup dropped"),
    }
}

/// Get a stable callback that re-renders the current view.
///
/// The callback is a dumb trigger: it schedules a re-render through the
/// view's render slot regardless of whether any tracked value changed.
///
/// # Panics
///
/// Panics when called outside a view's setup phase; like any hook, it is
/// only meaningful while a view is being set up.
pub fn use_force_update() -> Rc<dyn Fn()> {
    let view = current_view().expect("use_force_update called outside a view setup phase");
    Rc::new(move || view.request_render())
}

/// Reset view identity allocation and drop any dangling context (for
/// testing).
pub fn reset_view_state() {
    VIEW_STACK.with(|stack| stack.borrow_mut().clear());
    NEXT_VIEW_ID.with(|next| next.set(0));
}

// =============================================================================
// Tests
// =============================================================================
