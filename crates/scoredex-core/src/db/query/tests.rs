use super::*;
use crate::{
    config::IndexConfig,
    db::{
        GroupSelector,
        record::{ReadConsistency, RecordLayer},
        store::SortedSetStore,
    },
    error::ErrorClass,
    obs::EventCounters,
    test_support::{FaultyStore, MemoryRecords, TestHost, TestRecord, post, post_indexes},
};
use proptest::prelude::*;
use std::sync::Arc;

fn ids_of(records: &[TestRecord]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}

fn draft() -> GroupSelector {
    GroupSelector::by("status", "draft")
}

fn id_at<S, L>(view: &SortedSet<'_, S, L>, position: usize) -> Option<String>
where
    S: SortedSetStore,
    L: RecordLayer<Record = TestRecord>,
{
    view.nth(position).unwrap().map(|record| record.id)
}

// ----------------------------------------------------------------------
// Descriptor
// ----------------------------------------------------------------------

#[test]
fn base_query_is_full_ascending_and_unwindowed() {
    let query = SortedQuery::new(IndexKey::from_raw("Post:sorted:order"));

    assert_eq!(query.physical_range(), ScoreRange::UNBOUNDED);
    assert_eq!(query.direction(), Direction::Asc);
    assert!(query.window().is_all());
    assert_eq!(query.to_string(), "Post:sorted:order");
}

#[test]
fn reverse_and_between_commute() {
    let base = SortedQuery::new(IndexKey::from_raw("Post:sorted:order"));

    let left = base.clone().between(1, 2).reverse();
    let right = base.reverse().between(1, 2);

    assert_eq!(left, right);
    assert_eq!(left.score_range(), Some((2.0, 1.0)));
    assert_eq!(left.physical_range(), ScoreRange::new(1.0, 2.0));
    assert_eq!(left.to_string(), "Post:sorted:order [2, 1] desc");
}

#[test]
fn reverse_is_an_involution() {
    let query = SortedQuery::new(IndexKey::from_raw("k"))
        .between(-3.5, 9)
        .slice(2, Some(4));

    assert_eq!(query.clone().reverse().reverse(), query);
}

#[test]
fn offset_and_limit_edit_the_window() {
    let query = SortedQuery::new(IndexKey::from_raw("k")).offset(1).limit(2);

    assert_eq!(query.window(), Window::new(1, Some(2)));
    assert_eq!(query.to_string(), "k offset 1 limit 2");
    assert_eq!(
        query.slice(0, None).window(),
        Window::ALL,
        "slice replaces the whole window"
    );
}

#[test]
fn range_literal_is_between() {
    let query = SortedQuery::new(IndexKey::from_raw("k"));

    assert_eq!(query.clone().range(2..=3), query.between(2, 3));
}

// ----------------------------------------------------------------------
// Bound views
// ----------------------------------------------------------------------

#[test]
fn views_iterate_by_score_in_either_direction() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("A", "draft", 2)).unwrap();
    host.create(&post("B", "draft", 3)).unwrap();
    host.create(&post("C", "draft", 1)).unwrap();

    let set = indexes.sorted_find("order", &draft()).unwrap();

    assert_eq!(set.key().as_str(), "Post:sorted:order:status:draft");
    assert_eq!(ids_of(&set.to_vec().unwrap()), ["C", "A", "B"]);
    assert_eq!(ids_of(&set.clone().reverse().all().unwrap()), ["B", "A", "C"]);
    assert_eq!(ids_of(&set.clone().between(1, 2).to_vec().unwrap()), ["C", "A"]);
    assert_eq!(
        ids_of(&set.clone().between(1, 2).reverse().to_vec().unwrap()),
        ["A", "C"]
    );
}

#[test]
fn ranges_are_inclusive_and_scoped_to_the_group() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("1", "draft", 1)).unwrap();
    host.create(&post("2", "draft", 2)).unwrap();
    host.create(&post("3", "draft", 3)).unwrap();
    host.create(&post("4", "published", 4)).unwrap();
    host.create(&post("5", "draft", 5)).unwrap();

    let all = indexes.sorted_find("order", &GroupSelector::none()).unwrap();
    assert_eq!(ids_of(&all.clone().range(2..=3).to_vec().unwrap()), ["2", "3"]);

    let published = indexes
        .sorted_find("order", &GroupSelector::by("status", "published"))
        .unwrap();
    assert_eq!(ids_of(&published.range(2..=4).to_vec().unwrap()), ["4"]);
}

#[test]
fn windows_apply_after_the_range() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    for order in 1..=5 {
        host.create(&post(&order.to_string(), "draft", order)).unwrap();
    }

    let set = indexes.sorted_find("order", &GroupSelector::none()).unwrap();

    assert_eq!(ids_of(&set.clone().limit(2).to_vec().unwrap()), ["1", "2"]);
    assert_eq!(ids_of(&set.clone().offset(3).to_vec().unwrap()), ["4", "5"]);
    assert_eq!(
        ids_of(&set.clone().between(2, 5).slice(1, Some(2)).to_vec().unwrap()),
        ["3", "4"]
    );
    assert_eq!(
        ids_of(&set.clone().reverse().slice(1, Some(2)).to_vec().unwrap()),
        ["4", "3"]
    );
    assert_eq!(set.clone().offset(4).size().unwrap(), 1);
    assert_eq!(set.clone().between(2, 4).limit(2).size().unwrap(), 2);
    assert_eq!(set.clone().offset(9).size().unwrap(), 0);
}

#[test]
fn size_never_fetches_members() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("1", "draft", 1)).unwrap();
    host.create(&post("2", "draft", 7)).unwrap();

    let set = indexes.sorted_find("order", &draft()).unwrap();
    let before = store.log().len();

    assert_eq!(set.size().unwrap(), 2);
    assert_eq!(set.clone().between(5, 10).size().unwrap(), 1);

    let issued = &store.log()[before..];
    assert_eq!(
        issued,
        [
            "cardinality Post:sorted:order:status:draft",
            "count_in_range Post:sorted:order:status:draft",
        ]
    );
}

#[test]
fn empty_until_a_record_is_indexed() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    let set = indexes.sorted_find("order", &GroupSelector::none()).unwrap();
    assert!(set.is_empty().unwrap());
    assert!(set.first().unwrap().is_none());

    host.create(&post("1", "draft", 1)).unwrap();
    assert!(!set.is_empty().unwrap());
}

#[test]
fn first_is_the_lowest_score_of_the_range() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("a", "draft", 2)).unwrap();
    host.create(&post("b", "draft", 1)).unwrap();
    host.create(&post("c", "draft", 5)).unwrap();

    let set = indexes.sorted_find("order", &draft()).unwrap();

    assert_eq!(set.first().unwrap().map(|r| r.id), Some("b".to_string()));
    assert_eq!(
        set.clone().reverse().first().unwrap().map(|r| r.id),
        Some("c".to_string())
    );
    assert_eq!(
        set.clone().between(2, 9).offset(1).first().unwrap().map(|r| r.id),
        Some("a".to_string()),
        "first ignores the window but keeps the range"
    );
}

#[test]
fn membership_lookups_respect_the_range() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    let low = post("low", "draft", 1);
    host.create(&low).unwrap();
    host.create(&post("high", "draft", 10)).unwrap();

    let set = indexes.sorted_find("order", &draft()).unwrap();
    assert!(set.contains("low").unwrap());
    assert!(set.contains_record(&low).unwrap());
    assert!(!set.contains("ghost").unwrap());
    assert_eq!(set.get("low").unwrap(), Some(low.clone()));
    assert_eq!(set.score_of("high").unwrap(), Some(10.0));
    assert_eq!(set.score_of("ghost").unwrap(), None);

    let ranged = set.between(5, 20);
    assert!(!ranged.contains("low").unwrap());
    assert!(ranged.contains("high").unwrap());
    assert_eq!(ranged.get("low").unwrap(), None);
}

#[test]
fn nth_addresses_positions_within_the_view() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    for (id, order) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        host.create(&post(id, "draft", order)).unwrap();
    }

    let set = indexes.sorted_find("order", &draft()).unwrap();

    assert_eq!(id_at(&set, 0).as_deref(), Some("a"));
    assert_eq!(id_at(&set, 3).as_deref(), Some("d"));
    assert_eq!(id_at(&set, 4), None);

    let reversed = set.clone().reverse();
    assert_eq!(id_at(&reversed, 0).as_deref(), Some("d"));
    assert_eq!(id_at(&reversed, 3).as_deref(), Some("a"));

    let ranged = set.clone().between(2, 4).reverse();
    assert_eq!(id_at(&ranged, 1).as_deref(), Some("c"));

    let windowed = set.offset(1).limit(2);
    assert_eq!(id_at(&windowed, 0).as_deref(), Some("b"));
    assert_eq!(id_at(&windowed, 2), None);

    assert!(store.log().iter().any(|op| op.starts_with("range_by_rank")));
}

#[test]
fn slice_args_dispatches_on_arity() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    for (id, order) in [("a", 1), ("b", 2), ("c", 3)] {
        host.create(&post(id, "draft", order)).unwrap();
    }
    let set = indexes.sorted_find("order", &draft()).unwrap();

    let element = set.slice_args(&[1]).unwrap().into_element();
    assert_eq!(element.map(|r| r.id).as_deref(), Some("b"));

    let view = set.slice_args(&[1, -1]).unwrap().into_view().unwrap();
    assert_eq!(ids_of(&view.to_vec().unwrap()), ["b", "c"]);

    let calls = store.calls();
    let cases: [&[i64]; 5] = [&[], &[1, 2, 3], &[-1], &[-1, 2], &[0, -2]];
    for args in cases {
        let err = set.slice_args(args).map(|_| ()).unwrap_err();
        assert!(err.is_invalid_argument(), "{args:?}");
    }
    assert_eq!(store.calls(), calls, "invalid slices never reach the store");
}

#[test]
fn iteration_is_lazy_and_restartable() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("a", "draft", 1)).unwrap();
    let set = indexes.sorted_find("order", &draft()).unwrap();

    let calls = store.calls();
    let mut iter = set.iter();
    assert_eq!(store.calls(), calls);

    assert!(iter.next().is_some());
    assert!(iter.next().is_none());
    assert_eq!(store.calls(), calls + 1);

    host.create(&post("b", "draft", 2)).unwrap();
    let again = (&set).into_iter().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(ids_of(&again), ["a", "b"], "each traversal re-reads the store");
}

#[test]
fn stale_members_follow_read_consistency() {
    let store = FaultyStore::new();
    let records = MemoryRecords::new();
    let counters = Arc::new(EventCounters::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), counters.clone());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("a", "draft", 1)).unwrap();
    host.create(&post("b", "draft", 2)).unwrap();
    records.forget("a");

    let set = indexes.sorted_find("order", &draft()).unwrap();
    assert_eq!(ids_of(&set.to_vec().unwrap()), ["b"]);

    let report = counters.report();
    assert_eq!(report.records_resolved, 1);
    assert_eq!(report.records_missing, 1);

    let strict = post_indexes(
        &store,
        &records,
        IndexConfig::new().with_read_consistency(ReadConsistency::Strict),
        Arc::default(),
    );
    let err = strict
        .sorted_find("order", &draft())
        .unwrap()
        .to_vec()
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn store_failures_surface_once_and_end_iteration() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
    let host = TestHost::new(&indexes, &records);

    host.create(&post("a", "draft", 1)).unwrap();
    store.fail_reads(true);

    let set = indexes.sorted_find("order", &draft()).unwrap();
    let mut iter = set.iter();

    let err = iter.next().unwrap().unwrap_err();
    assert_eq!(err.class, ErrorClass::Unavailable);
    assert!(err.is_retryable());
    assert!(iter.next().is_none());

    assert!(set.size().is_err());
    assert!(set.contains("a").is_err());
}

#[test]
fn unknown_indexes_fail_before_io() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());

    for (attribute, selector) in [
        ("foo", draft()),
        ("order", GroupSelector::by("foo", "bar")),
    ] {
        let err = indexes.sorted_find(attribute, &selector).unwrap_err();
        assert!(err.is_index_not_found());
    }

    let err = indexes
        .sorted_find("order", &draft().and("kind", "x"))
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(store.calls(), 0);
}

#[test]
fn sets_render_their_descriptor() {
    let (store, records) = (FaultyStore::new(), MemoryRecords::new());
    let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());

    let set = indexes
        .sorted_find("order", &draft())
        .unwrap()
        .between(1, 2)
        .limit(5);

    assert_eq!(
        set.to_string(),
        "SortedSet(Post:sorted:order:status:draft [1, 2] offset 0 limit 5)"
    );
    assert!(format!("{set:?}").starts_with("SortedSet { query: SortedQuery"));
    assert_eq!(store.calls(), 0);
}

// ----------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------

fn arb_members() -> impl Strategy<Value = Vec<(String, i8)>> {
    prop::collection::btree_map("[a-e]{1,3}", -5i8..5, 0..24)
        .prop_map(|members| members.into_iter().collect::<Vec<_>>())
}

fn seeded(members: &[(String, i8)]) -> FaultyStore {
    let store = FaultyStore::new();
    for (member, score) in members {
        store
            .inner
            .add("Post:sorted:order", f64::from(*score), member)
            .unwrap();
    }

    store
}

proptest! {
    #[test]
    fn ids_follow_score_then_member(members in arb_members()) {
        let store = seeded(&members);
        let records = MemoryRecords::new();
        let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
        let set = indexes.sorted_find("order", &GroupSelector::none()).unwrap();

        let mut expected = members.clone();
        expected.sort_by(|(a, x), (b, y)| x.cmp(y).then_with(|| a.cmp(b)));
        let expected = expected.into_iter().map(|(member, _)| member).collect::<Vec<_>>();

        prop_assert_eq!(set.ids().unwrap(), expected.clone());

        let mut reversed = expected;
        reversed.reverse();
        prop_assert_eq!(set.clone().reverse().ids().unwrap(), reversed);
    }

    #[test]
    fn windows_slice_the_full_listing(
        members in arb_members(),
        offset in 0usize..30,
        count in prop::option::of(0usize..30),
        reversed in any::<bool>(),
    ) {
        let store = seeded(&members);
        let records = MemoryRecords::new();
        let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
        let mut set = indexes.sorted_find("order", &GroupSelector::none()).unwrap();
        if reversed {
            set = set.reverse();
        }

        let full = set.ids().unwrap();
        let expected = full
            .iter()
            .skip(offset)
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect::<Vec<_>>();
        let windowed = set.slice(offset, count);

        prop_assert_eq!(windowed.size().unwrap(), expected.len());
        prop_assert_eq!(windowed.ids().unwrap(), expected);
    }

    #[test]
    fn between_selects_the_same_members_in_both_directions(
        members in arb_members(),
        low in -6i8..6,
        high in -6i8..6,
    ) {
        let store = seeded(&members);
        let records = MemoryRecords::new();
        let indexes = post_indexes(&store, &records, IndexConfig::default(), Arc::default());
        let set = indexes.sorted_find("order", &GroupSelector::none()).unwrap();

        let forward = set.clone().between(low, high).ids().unwrap();
        let mut backward = set.clone().reverse().between(low, high).ids().unwrap();
        backward.reverse();
        prop_assert_eq!(&forward, &backward);

        let expected = members
            .iter()
            .filter(|(_, score)| low <= *score && *score <= high)
            .count();
        prop_assert_eq!(forward.len(), expected);
        prop_assert_eq!(set.between(low, high).size().unwrap(), expected);
    }
}
