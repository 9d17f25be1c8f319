//! Subscription coalescer.
//!
//! Converts any number of watched-target change reports into at most one
//! re-render per view per coalescing window. One synchronous deep watch
//! is registered per target; the first report for a view marks it pending
//! and queues one deferred re-render, and every further report inside the
//! same window is absorbed by the pending flag. The flag map lives on the
//! store and is shared by all of its subscriptions, keyed by view
//! identity, so two targets of one view share a window while two views
//! never interfere.
//!
//! Teardown is deterministic: unmounting a view disposes its watches,
//! cancels the pending deferred re-render, and removes its pending entry.
//! A deferred re-render that slips past cancellation still checks view
//! liveness before delivering.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::observable::{ReactiveMap, ReactiveValue};
use crate::scheduler::{self, DeferredTask};
use crate::store::SelectorTarget;
use crate::view::{self, ViewHandle, ViewId};
use crate::watch::{Cleanup, Delivery, WatchOptions, WatchSource, watch};

/// Pending-update flags shared by every subscription of one store.
pub(crate) type PendingUpdates = Rc<RefCell<HashSet<ViewId>>>;

/// Latest deferred re-render of one subscription, kept for cancellation.
type DeferredSlot = Rc<RefCell<Option<DeferredTask>>>;

// =============================================================================
// Subscription Setup
// =============================================================================

/// Bind `view` to a set of watch targets.
///
/// Registers one synchronous change listener per target and one unmount
/// cleanup tearing all of them down. Targets were validated by the caller;
/// nothing here can fail partway.
pub(crate) fn subscribe(
    pending: PendingUpdates,
    view: ViewHandle,
    sub_states: &[ReactiveMap],
    selectors: &[SelectorTarget],
) {
    let deferred: DeferredSlot = Rc::new(RefCell::new(None));
    let mut watches: Vec<Cleanup> = Vec::with_capacity(sub_states.len() + selectors.len());

    for sub_state in sub_states {
        watches.push(watch(
            WatchSource::Node(ReactiveValue::Map(sub_state.clone())),
            notifier(pending.clone(), view.clone(), deferred.clone()),
            WatchOptions {
                deep: true,
                delivery: Delivery::Sync,
            },
        ));
    }

    for selector in selectors {
        // Bare getters realize to an on-the-fly derived here, so both
        // arms get memoized recomputation.
        let realized = selector.realize();
        watches.push(watch(
            WatchSource::Read(Rc::new(move || realized.get())),
            notifier(pending.clone(), view.clone(), deferred.clone()),
            WatchOptions {
                deep: false,
                delivery: Delivery::Sync,
            },
        ));
    }

    debug!(
        view = ?view.id(),
        sub_states = sub_states.len(),
        selectors = selectors.len(),
        "subscription attached"
    );

    let view_id = view.id();
    view::on_view_cleanup(move || {
        for stop in watches {
            stop();
        }
        if let Some(task) = deferred.borrow_mut().take() {
            task.cancel();
        }
        pending.borrow_mut().remove(&view_id);
        debug!(view = ?view_id, "subscription torn down");
    });
}

// =============================================================================
// Coalescing
// =============================================================================

/// Change-report callback for one subscription: every watch of the
/// subscription funnels into one of these clones.
fn notifier(
    pending: PendingUpdates,
    view: ViewHandle,
    deferred: DeferredSlot,
) -> impl FnMut() + 'static {
    move || schedule_update(&pending, &view, &deferred)
}

/// Mark `view` pending and queue its one re-render for this window.
///
/// Runs synchronously inside the mutating call stack. The deferred task
/// clears the flag before delivering, so a mutation performed during the
/// re-render itself opens a fresh window.
fn schedule_update(pending: &PendingUpdates, view: &ViewHandle, deferred: &DeferredSlot) {
    let view_id = view.id();
    if pending.borrow().contains(&view_id) {
        trace!(view = ?view_id, "re-render already pending");
        return;
    }
    pending.borrow_mut().insert(view_id);
    trace!(view = ?view_id, "re-render scheduled");

    let pending = pending.clone();
    let view = view.clone();
    let task = scheduler::defer(move || {
        pending.borrow_mut().remove(&view_id);
        // Liveness guard: unmount cancels the task, but a teardown racing
        // this window must still never force-update a dead view.
        if view.is_live() {
            view.request_render();
        }
    });
    *deferred.borrow_mut() = Some(task);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::view::mount_view;

    fn setup() {
        scheduler::reset_scheduler();
        view::reset_view_state();
    }

    fn tagged_map(count: i64) -> ReactiveMap {
        let tagged =
            crate::create_sub_state(Value::map([("count", Value::from(count))])).unwrap();
        ReactiveMap::from_value(tagged).unwrap()
    }

    #[test]
    fn test_burst_of_reports_yields_one_render() {
        setup();

        let pending: PendingUpdates = Rc::new(RefCell::new(HashSet::new()));
        let sub_state = tagged_map(1);
        let target = sub_state.clone();
        let view = mount_view(move || {
            subscribe(pending.clone(), view::current_view().unwrap(), &[target], &[]);
        });

        sub_state.set("count", 2);
        sub_state.set("count", 3);
        sub_state.set("count", 4);
        assert_eq!(view.render_count(), 0, "renders wait for the window");

        scheduler::flush();
        assert_eq!(view.render_count(), 1);
    }

    #[test]
    fn test_windows_reopen_after_flush() {
        setup();

        let pending: PendingUpdates = Rc::new(RefCell::new(HashSet::new()));
        let sub_state = tagged_map(1);
        let target = sub_state.clone();
        let view = mount_view(move || {
            subscribe(pending.clone(), view::current_view().unwrap(), &[target], &[]);
        });

        sub_state.set("count", 2);
        scheduler::flush();
        assert_eq!(view.render_count(), 1);

        sub_state.set("count", 3);
        scheduler::flush();
        assert_eq!(view.render_count(), 2);
    }

    #[test]
    fn test_unmount_cancels_pending_render() {
        setup();

        let pending: PendingUpdates = Rc::new(RefCell::new(HashSet::new()));
        let pending_probe = pending.clone();
        let sub_state = tagged_map(1);
        let target = sub_state.clone();
        let view = mount_view(move || {
            subscribe(pending.clone(), view::current_view().unwrap(), &[target], &[]);
        });

        sub_state.set("count", 2);
        assert_eq!(pending_probe.borrow().len(), 1);

        let probe = view.clone();
        view.unmount();
        assert!(pending_probe.borrow().is_empty(), "pending entry removed");

        scheduler::flush();
        assert_eq!(probe.render_count(), 0, "cancelled render never lands");

        sub_state.set("count", 3);
        scheduler::flush();
        assert_eq!(probe.render_count(), 0, "watches disposed at unmount");
    }

    #[test]
    fn test_two_views_coalesce_independently() {
        setup();

        let pending: PendingUpdates = Rc::new(RefCell::new(HashSet::new()));
        let sub_state = tagged_map(1);

        let target = sub_state.clone();
        let pending_a = pending.clone();
        let first = mount_view(move || {
            subscribe(pending_a.clone(), view::current_view().unwrap(), &[target], &[]);
        });
        let target = sub_state.clone();
        let pending_b = pending.clone();
        let second = mount_view(move || {
            subscribe(pending_b.clone(), view::current_view().unwrap(), &[target], &[]);
        });

        sub_state.set("count", 2);
        sub_state.set("count", 3);
        scheduler::flush();

        assert_eq!(first.render_count(), 1);
        assert_eq!(second.render_count(), 1);
    }
}
