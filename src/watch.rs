//! Watch primitive - change listeners over the observable mirror.
//!
//! A watch registers one listener over a tree node or a read function and
//! reports every subsequent change; it is a thin skin over
//! `spark_signals::effect`. The engine runs the effect body once at
//! registration (that run establishes the dependencies and is never
//! reported) and re-runs it synchronously inside the mutating call stack
//! whenever a tracked cell changes.
//!
//! Delivery is synchronous by default - the coalescer depends on that, so
//! a batch of assignments within one logical operation is observed
//! mutation by mutation rather than sampled afterwards. Deferred delivery
//! pushes each report through the [`scheduler`](crate::scheduler) instead.
//!
//! Callbacks must not write to their own watched sources; the engine
//! re-runs the effect synchronously on such writes and the callback would
//! re-enter itself.

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::effect;

use crate::observable::ReactiveValue;
use crate::scheduler;
use crate::value::Value;

/// Teardown function returned by watch registration and component-style
/// setups. Call it to release the underlying listener.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Watch Configuration
// =============================================================================

/// What a watch observes.
#[derive(Clone)]
pub enum WatchSource {
    /// A node of an observable tree.
    Node(ReactiveValue),
    /// An arbitrary read function; whatever reactive cells it reads
    /// become the watch's dependencies.
    Read(Rc<dyn Fn() -> Value>),
}

/// When the callback runs relative to the mutation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Delivery {
    /// Inside the mutating call stack, immediately.
    Sync,
    /// Through the deferred-task queue, once per change report.
    Deferred,
}

/// Watch configuration.
#[derive(Clone, Copy, Debug)]
pub struct WatchOptions {
    /// Track the entire subtree of a [`WatchSource::Node`] (every nested
    /// cell) instead of only its top-level cell. Ignored for
    /// [`WatchSource::Read`], which tracks whatever it reads.
    pub deep: bool,
    /// Callback delivery mode.
    pub delivery: Delivery,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            deep: true,
            delivery: Delivery::Sync,
        }
    }
}

// =============================================================================
// watch()
// =============================================================================

/// Register a change listener over `source`.
///
/// `callback` runs on every change report after the initial
/// dependency-establishing run. The returned disposer releases the
/// listener; reports already queued by deferred delivery still run unless
/// the queue is flushed after disposal with the callback's captures gone.
pub fn watch(
    source: WatchSource,
    callback: impl FnMut() + 'static,
    options: WatchOptions,
) -> Cleanup {
    let callback: Rc<RefCell<dyn FnMut()>> = Rc::new(RefCell::new(callback));
    let mut first_run = true;

    let stop = effect(move || {
        match &source {
            WatchSource::Node(node) => {
                if options.deep {
                    node.track();
                } else {
                    node.track_shallow();
                }
            }
            WatchSource::Read(read) => {
                let _ = read();
            }
        }

        if first_run {
            first_run = false;
            return;
        }

        match options.delivery {
            Delivery::Sync => (callback.borrow_mut())(),
            Delivery::Deferred => {
                let callback = callback.clone();
                let _ = scheduler::defer(move || (callback.borrow_mut())());
            }
        }
    });

    Box::new(stop)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::ReactiveMap;
    use std::cell::Cell;

    fn setup() {
        scheduler::reset_scheduler();
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_inner = count.clone();
        (count, move || count_inner.set(count_inner.get() + 1))
    }

    fn sample_map() -> ReactiveMap {
        ReactiveMap::from_value(Value::map([
            ("count", Value::from(1)),
            ("nested", Value::map([("value", Value::from(1))])),
        ]))
        .unwrap()
    }

    #[test]
    fn test_first_run_is_not_reported() {
        setup();

        let map = sample_map();
        let (count, callback) = counter();
        let stop = watch(
            WatchSource::Node(ReactiveValue::Map(map.clone())),
            callback,
            WatchOptions::default(),
        );

        assert_eq!(count.get(), 0, "registration run is silent");
        map.set("count", 2);
        assert_eq!(count.get(), 1);
        stop();
    }

    #[test]
    fn test_deep_watch_sees_nested_writes() {
        setup();

        let map = sample_map();
        let (count, callback) = counter();
        let stop = watch(
            WatchSource::Node(ReactiveValue::Map(map.clone())),
            callback,
            WatchOptions::default(),
        );

        map.sub("nested").unwrap().set("value", 2);
        assert_eq!(count.get(), 1, "deep watch reports nested scalar writes");
        stop();
    }

    #[test]
    fn test_shallow_watch_ignores_nested_writes() {
        setup();

        let map = sample_map();
        let (count, callback) = counter();
        let stop = watch(
            WatchSource::Node(ReactiveValue::Map(map.clone())),
            callback,
            WatchOptions {
                deep: false,
                delivery: Delivery::Sync,
            },
        );

        map.sub("nested").unwrap().set("value", 2);
        assert_eq!(count.get(), 0, "shallow watch skips nested scalar writes");

        map.set("extra", 1);
        assert_eq!(count.get(), 1, "shallow watch reports shape changes");
        stop();
    }

    #[test]
    fn test_read_source_tracks_what_it_reads() {
        setup();

        let map = sample_map();
        let read_map = map.clone();
        let (count, callback) = counter();
        let stop = watch(
            WatchSource::Read(Rc::new(move || {
                Value::from(read_map.get_path(&["count"]).and_then(|v| v.as_int()))
            })),
            callback,
            WatchOptions::default(),
        );

        map.set("count", 2);
        assert_eq!(count.get(), 1);

        // A field the read never touches does not report
        map.sub("nested").unwrap().set("value", 9);
        assert_eq!(count.get(), 1);
        stop();
    }

    #[test]
    fn test_deferred_delivery_goes_through_the_scheduler() {
        setup();

        let map = sample_map();
        let (count, callback) = counter();
        let stop = watch(
            WatchSource::Node(ReactiveValue::Map(map.clone())),
            callback,
            WatchOptions {
                deep: true,
                delivery: Delivery::Deferred,
            },
        );

        map.set("count", 2);
        assert_eq!(count.get(), 0, "nothing delivered before the flush");
        assert_eq!(scheduler::pending(), 1);

        scheduler::flush();
        assert_eq!(count.get(), 1);
        stop();
    }

    #[test]
    fn test_disposed_watch_stops_reporting() {
        setup();

        let map = sample_map();
        let (count, callback) = counter();
        let stop = watch(
            WatchSource::Node(ReactiveValue::Map(map.clone())),
            callback,
            WatchOptions::default(),
        );

        map.set("count", 2);
        assert_eq!(count.get(), 1);

        stop();
        map.set("count", 3);
        assert_eq!(count.get(), 1, "no reports after disposal");
    }
}
