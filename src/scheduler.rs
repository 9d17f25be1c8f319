//! Deferred task queue - the coalescing window boundary.
//!
//! Change listeners fire synchronously inside the mutating call stack;
//! re-renders are pushed through this queue so a burst of mutations lands
//! as one deliverable per view. The queue is thread-local and explicit:
//! an embedding event loop calls [`flush`] once per tick, and tests call
//! it wherever a timer framework would run its zero-delay timers.
//!
//! Tasks are cancellable through the [`DeferredTask`] handle, which is
//! what lets a subscription teardown retract a scheduled re-render
//! instead of letting it fire against an unmounted view.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

// =============================================================================
// Deferred Task Handle
// =============================================================================

/// Handle to a task queued by [`defer`].
///
/// Dropping the handle does not cancel the task; only [`cancel`] does.
///
/// [`cancel`]: DeferredTask::cancel
pub struct DeferredTask {
    cancelled: Rc<Cell<bool>>,
}

impl DeferredTask {
    /// Retract the task. A cancelled task is skipped by [`flush`].
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Check whether the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct QueuedTask {
    cancelled: Rc<Cell<bool>>,
    run: Box<dyn FnOnce()>,
}

thread_local! {
    static QUEUE: RefCell<VecDeque<QueuedTask>> = RefCell::new(VecDeque::new());
}

// =============================================================================
// Queue Operations
// =============================================================================

/// Queue a task for the next [`flush`].
pub fn defer(task: impl FnOnce() + 'static) -> DeferredTask {
    let cancelled = Rc::new(Cell::new(false));
    QUEUE.with(|queue| {
        queue.borrow_mut().push_back(QueuedTask {
            cancelled: cancelled.clone(),
            run: Box::new(task),
        });
    });
    trace!("deferred task queued");
    DeferredTask { cancelled }
}

/// Run every queued task in FIFO order.
///
/// Tasks queued while flushing run in the same flush, mirroring how a
/// zero-delay timer scheduled from a timer callback still runs when a
/// test framework drains all timers. Cancelled tasks are skipped.
pub fn flush() {
    loop {
        let task = QUEUE.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = task else { break };
        if !task.cancelled.get() {
            (task.run)();
        }
    }
}

/// Number of queued, not-yet-cancelled tasks.
pub fn pending() -> usize {
    QUEUE.with(|queue| {
        queue
            .borrow()
            .iter()
            .filter(|task| !task.cancelled.get())
            .count()
    })
}

/// Drop every queued task (for testing).
pub fn reset_scheduler() {
    QUEUE.with(|queue| queue.borrow_mut().clear());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() {
        reset_scheduler();
    }

    #[test]
    fn test_flush_runs_tasks_in_order() {
        setup();

        let order = Rc::new(RefCell::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        defer(move || first.borrow_mut().push(1));
        defer(move || second.borrow_mut().push(2));

        assert_eq!(pending(), 2);
        flush();
        assert_eq!(*order.borrow(), vec![1, 2]);
        assert_eq!(pending(), 0);
    }

    #[test]
    fn test_cancelled_tasks_are_skipped() {
        setup();

        let ran = Rc::new(Cell::new(false));
        let ran_inner = ran.clone();
        let task = defer(move || ran_inner.set(true));

        task.cancel();
        assert!(task.is_cancelled());
        assert_eq!(pending(), 0);

        flush();
        assert!(!ran.get());
    }

    #[test]
    fn test_tasks_deferred_during_flush_run_in_same_flush() {
        setup();

        let count = Rc::new(Cell::new(0));
        let outer = count.clone();
        defer(move || {
            outer.set(outer.get() + 1);
            let inner = outer.clone();
            defer(move || inner.set(inner.get() + 1));
        });

        flush();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_reset_drops_queued_tasks() {
        setup();

        let ran = Rc::new(Cell::new(false));
        let ran_inner = ran.clone();
        defer(move || ran_inner.set(true));

        reset_scheduler();
        flush();
        assert!(!ran.get());
        assert_eq!(pending(), 0);
    }
}
