//! Metrics sink boundary.

use crate::error::MaintenancePhase;

///
/// QueryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    RangeByScore,
    RangeByRank,
    Cardinality,
    CountInRange,
    Membership,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent {
    IndexAdd,
    IndexRemove,
    GroupMigration,
    MissingAttribute,
    MaintenanceFailed { phase: MaintenancePhase },
    Query { kind: QueryKind },
    RecordsResolved { resolved: u64, missing: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _: MetricsEvent) {}
}
