//! Observability: range-engine telemetry (metrics) and sink abstractions.
//!
//! Diagnostic logging goes through `tracing` at the call sites; this module
//! only owns counters.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, IndexSummary};
pub use sink::{
    LookupKind, MetricsEvent, MetricsSink, RegistryAction, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
