use crate::{
    error::MaintenancePhase,
    obs::sink::{MetricsEvent, MetricsSink, QueryKind},
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// EventCounters
/// Process-local counters fed through `MetricsSink`.
///

#[derive(Debug, Default)]
pub struct EventCounters {
    index_adds: AtomicU64,
    index_removes: AtomicU64,
    group_migrations: AtomicU64,
    missing_attributes: AtomicU64,
    prune_failures: AtomicU64,
    install_failures: AtomicU64,
    remove_failures: AtomicU64,
    range_queries: AtomicU64,
    rank_queries: AtomicU64,
    size_queries: AtomicU64,
    membership_queries: AtomicU64,
    records_resolved: AtomicU64,
    records_missing: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl EventCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn report(&self) -> EventReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        EventReport {
            index_adds: load(&self.index_adds),
            index_removes: load(&self.index_removes),
            group_migrations: load(&self.group_migrations),
            missing_attributes: load(&self.missing_attributes),
            prune_failures: load(&self.prune_failures),
            install_failures: load(&self.install_failures),
            remove_failures: load(&self.remove_failures),
            range_queries: load(&self.range_queries),
            rank_queries: load(&self.rank_queries),
            size_queries: load(&self.size_queries),
            membership_queries: load(&self.membership_queries),
            records_resolved: load(&self.records_resolved),
            records_missing: load(&self.records_missing),
        }
    }
}

impl MetricsSink for EventCounters {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::IndexAdd => bump(&self.index_adds, 1),
            MetricsEvent::IndexRemove => bump(&self.index_removes, 1),
            MetricsEvent::GroupMigration => bump(&self.group_migrations, 1),
            MetricsEvent::MissingAttribute => bump(&self.missing_attributes, 1),
            MetricsEvent::MaintenanceFailed { phase } => match phase {
                MaintenancePhase::Prune => bump(&self.prune_failures, 1),
                MaintenancePhase::Install => bump(&self.install_failures, 1),
                MaintenancePhase::Remove => bump(&self.remove_failures, 1),
            },
            MetricsEvent::Query { kind } => match kind {
                QueryKind::RangeByScore => bump(&self.range_queries, 1),
                QueryKind::RangeByRank => bump(&self.rank_queries, 1),
                QueryKind::Cardinality | QueryKind::CountInRange => bump(&self.size_queries, 1),
                QueryKind::Membership => bump(&self.membership_queries, 1),
            },
            MetricsEvent::RecordsResolved { resolved, missing } => {
                bump(&self.records_resolved, resolved);
                bump(&self.records_missing, missing);
            }
        }
    }
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventReport {
    // maintenance
    pub index_adds: u64,
    pub index_removes: u64,
    pub group_migrations: u64,
    pub missing_attributes: u64,
    pub prune_failures: u64,
    pub install_failures: u64,
    pub remove_failures: u64,

    // queries
    pub range_queries: u64,
    pub rank_queries: u64,
    pub size_queries: u64,
    pub membership_queries: u64,
    pub records_resolved: u64,
    pub records_missing: u64,
}
