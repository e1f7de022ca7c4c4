use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for builder, range and registry activity.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub(crate) ops: EventOps,
    pub(crate) indexes: BTreeMap<String, IndexCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Lookups by builder kind
    pub lookups_general: u64,
    pub lookups_equality: u64,
    pub lookups_spatial: u64,
    pub lookups_empty: u64,

    // Builder state transitions
    pub builders_invalidated: u64,
    pub builders_errored: u64,

    // Overlap removal
    pub overlap_removals: u64,
    pub overlap_ranges_in: u64,
    pub overlap_ranges_out: u64,

    // Registry
    pub registry_retains: u64,
    pub registry_releases: u64,
    pub registry_deletes: u64,
    pub registry_deferred_deletes: u64,
}

///
/// IndexCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct IndexCounters {
    pub(crate) lookups: u64,
    pub(crate) empty_lookups: u64,
    pub(crate) ranges: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub indexes: Vec<IndexSummary>,
}

///
/// IndexSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IndexSummary {
    pub index: String,
    pub lookups: u64,
    pub empty_lookups: u64,
    pub avg_ranges_per_lookup: f64,
}

/// Build a metrics report by inspecting in-memory counters only.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut indexes: Vec<IndexSummary> = snap
        .indexes
        .iter()
        .map(|(index, counters)| {
            let avg_ranges = if counters.lookups > 0 {
                counters.ranges as f64 / counters.lookups as f64
            } else {
                0.0
            };

            IndexSummary {
                index: index.clone(),
                lookups: counters.lookups,
                empty_lookups: counters.empty_lookups,
                avg_ranges_per_lookup: avg_ranges,
            }
        })
        .collect();

    // Busiest indexes first; ties by name for a stable report.
    indexes.sort_by(|a, b| b.lookups.cmp(&a.lookups).then_with(|| a.index.cmp(&b.index)));

    EventReport {
        ops: snap.ops,
        indexes,
    }
}
