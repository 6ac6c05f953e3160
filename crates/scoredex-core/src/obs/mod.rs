//! Observability: maintenance and query telemetry through a sink.
//!
//! Index and query code never touch counters directly; every
//! instrumentation point emits a `MetricsEvent` into a `MetricsSink`.

mod counters;
mod sink;

pub use counters::{EventCounters, EventReport};
pub use sink::{MetricsEvent, MetricsSink, NoopSink, QueryKind};
