//! Metrics sink boundary.
//!
//! Range and builder logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// LookupKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LookupKind {
    General,
    Equality,
    Spatial,
}

///
/// RegistryAction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegistryAction {
    Retain,
    Release,
    Delete,
    DeferredDelete,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    LookupBuilt {
        kind: LookupKind,
        index: &'a str,
        ranges: u64,
        empty: bool,
    },
    BuilderInvalidated {
        index: &'a str,
    },
    BuilderErrored {
        index: &'a str,
    },
    OverlapRemoval {
        ranges_in: u64,
        ranges_out: u64,
    },
    Registry {
        action: RegistryAction,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::LookupBuilt {
                kind,
                index,
                ranges,
                empty,
            } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        LookupKind::General => {
                            m.ops.lookups_general = m.ops.lookups_general.saturating_add(1);
                        }
                        LookupKind::Equality => {
                            m.ops.lookups_equality = m.ops.lookups_equality.saturating_add(1);
                        }
                        LookupKind::Spatial => {
                            m.ops.lookups_spatial = m.ops.lookups_spatial.saturating_add(1);
                        }
                    }
                    if empty {
                        m.ops.lookups_empty = m.ops.lookups_empty.saturating_add(1);
                    }

                    let entry = m.indexes.entry(index.to_string()).or_default();
                    entry.lookups = entry.lookups.saturating_add(1);
                    entry.ranges = entry.ranges.saturating_add(ranges);
                    if empty {
                        entry.empty_lookups = entry.empty_lookups.saturating_add(1);
                    }
                });
            }

            MetricsEvent::BuilderInvalidated { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.builders_invalidated = m.ops.builders_invalidated.saturating_add(1);
                });
            }

            MetricsEvent::BuilderErrored { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.builders_errored = m.ops.builders_errored.saturating_add(1);
                });
            }

            MetricsEvent::OverlapRemoval {
                ranges_in,
                ranges_out,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.overlap_removals = m.ops.overlap_removals.saturating_add(1);
                    m.ops.overlap_ranges_in = m.ops.overlap_ranges_in.saturating_add(ranges_in);
                    m.ops.overlap_ranges_out = m.ops.overlap_ranges_out.saturating_add(ranges_out);
                });
            }

            MetricsEvent::Registry { action } => {
                metrics::with_state_mut(|m| match action {
                    RegistryAction::Retain => {
                        m.ops.registry_retains = m.ops.registry_retains.saturating_add(1);
                    }
                    RegistryAction::Release => {
                        m.ops.registry_releases = m.ops.registry_releases.saturating_add(1);
                    }
                    RegistryAction::Delete => {
                        m.ops.registry_deletes = m.ops.registry_deletes.saturating_add(1);
                    }
                    RegistryAction::DeferredDelete => {
                        m.ops.registry_deferred_deletes =
                            m.ops.registry_deferred_deletes.saturating_add(1);
                    }
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - Only a shared reference is materialized, matching the borrow used
        //   to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the current thread's metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // Preconditions:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` always restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    //
    // What would break this:
    // - Any async/deferred use of `sink_ptr` beyond this scope.
    // - Any path that bypasses Guard restoration.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lookup(index: &str, ranges: u64, empty: bool) -> MetricsEvent<'_> {
        MetricsEvent::LookupBuilt {
            kind: LookupKind::General,
            index,
            ranges,
            empty,
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        with_metrics_sink(&outer, || {
            record(lookup("idx", 1, false));
            assert_eq!(outer_calls.load(Ordering::SeqCst), 1);

            with_metrics_sink(&inner, || {
                record(lookup("idx", 1, false));
            });

            // Inner override was restored to outer override.
            record(lookup("idx", 1, false));
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::BuilderErrored { index: "idx" });
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();
        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn lookup_events_accumulate_per_index() {
        metrics_reset_all();

        record(lookup("db.t.a", 3, false));
        record(lookup("db.t.a", 1, true));
        record(lookup("db.t.b", 2, false));
        record(MetricsEvent::OverlapRemoval {
            ranges_in: 4,
            ranges_out: 3,
        });

        let report = metrics_report();
        assert_eq!(report.ops.lookups_general, 3);
        assert_eq!(report.ops.lookups_empty, 1);
        assert_eq!(report.ops.overlap_ranges_in, 4);
        assert_eq!(report.ops.overlap_ranges_out, 3);

        let first = &report.indexes[0];
        assert_eq!(first.index, "db.t.a");
        assert_eq!(first.lookups, 2);
        assert_eq!(first.empty_lookups, 1);
        assert!((first.avg_ranges_per_lookup - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn registry_actions_count_separately() {
        metrics_reset_all();

        for action in [
            RegistryAction::Retain,
            RegistryAction::Retain,
            RegistryAction::Release,
            RegistryAction::DeferredDelete,
        ] {
            record(MetricsEvent::Registry { action });
        }

        let ops = metrics_report().ops;
        assert_eq!(ops.registry_retains, 2);
        assert_eq!(ops.registry_releases, 1);
        assert_eq!(ops.registry_deferred_deletes, 1);
        assert_eq!(ops.registry_deletes, 0);
    }
}
