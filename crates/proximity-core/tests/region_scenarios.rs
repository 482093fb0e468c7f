// crates/proximity-core/tests/region_scenarios.rs
use proximity_core::{
    ActiveConnection, ConnectionId, ConnectionRegistry, CoreError, LocationUpdate, Position,
    Profile, QueryOptions, RegionIndex, Relocation, SelfPolicy, UserId, MAX_QUERY_RADIUS,
};

const SAN_FRANCISCO: (f64, f64) = (37.7749, -122.4194);
const OAKLAND: (f64, f64) = (37.8044, -122.2712);
const NEW_YORK: (f64, f64) = (40.7128, -74.0060);

/// ~39 km x 20 km buckets.
const PRECISION: usize = 4;

fn pos((lat, lon): (f64, f64)) -> Position {
    Position::new(lat, lon).unwrap()
}

fn conn(id: u64) -> ActiveConnection<()> {
    ActiveConnection::new(
        ConnectionId(id),
        UserId(format!("user-{}", id)),
        Profile::new(format!("User {}", id), format!("avatars/{}.png", id)),
        (),
    )
}

fn registry(self_policy: SelfPolicy) -> ConnectionRegistry<()> {
    let index = RegionIndex::new(PRECISION).unwrap();
    ConnectionRegistry::new(
        index,
        QueryOptions {
            radius: 1,
            self_policy,
        },
    )
    .unwrap()
}

fn admit(reg: &mut ConnectionRegistry<()>, id: u64) {
    let c = conn(id);
    reg.admit(c.id(), c.user().clone(), c.profile().clone(), ())
        .unwrap();
}

fn uid(id: u64) -> UserId {
    UserId(format!("user-{}", id))
}

// -----------------------------------------------------------------------------
// RegionIndex
// -----------------------------------------------------------------------------

#[test]
fn membership_follows_latest_position() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);

    let path = [SAN_FRANCISCO, OAKLAND, NEW_YORK, (37.7750, -122.4195), NEW_YORK];
    for p in path {
        let position = pos(p);
        let expected = index.bucket_of(&position);
        index.place(&mut a, position.clone());

        assert_eq!(index.buckets_containing(a.id()), vec![&expected]);
        assert_eq!(a.placement().position(), Some(&position));
        assert_eq!(index.len(), 1);
    }
}

#[test]
fn jitter_inside_a_bucket_is_unchanged() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);

    let first = index.place(&mut a, pos(SAN_FRANCISCO));
    assert!(matches!(first, Relocation::Placed { .. }));

    let second = index.place(&mut a, pos((37.7750, -122.4193)));
    assert!(matches!(second, Relocation::Unchanged { .. }));
    assert_eq!(first.bucket(), second.bucket());
    // position is still replaced
    assert_eq!(a.placement().position().unwrap().lat(), 37.7750);
}

#[test]
fn moved_connection_leaves_its_old_bucket() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    let mut b = conn(2);
    index.place(&mut b, pos(SAN_FRANCISCO));

    let Relocation::Placed { bucket: sf } = index.place(&mut a, pos(SAN_FRANCISCO)) else {
        panic!("first placement should be Placed");
    };
    let mut members: Vec<_> = index.members(&sf).collect();
    members.sort();
    assert_eq!(members, vec![a.id(), b.id()]);

    let Relocation::Moved { from, to } = index.place(&mut a, pos(NEW_YORK)) else {
        panic!("cross-country move should be Moved");
    };
    assert_eq!(from, sf);
    assert_eq!(index.members(&sf).collect::<Vec<_>>(), vec![b.id()]);
    assert_eq!(index.members(&to).collect::<Vec<_>>(), vec![a.id()]);

    index.remove(&mut b);
    assert_eq!(index.members(&sf).count(), 0);
}

#[test]
fn remove_is_idempotent() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    let mut b = conn(2);
    index.place(&mut a, pos(SAN_FRANCISCO));
    index.place(&mut b, pos(SAN_FRANCISCO));

    assert!(index.remove(&mut a));
    assert!(!index.remove(&mut a));
    assert!(!a.placement().is_placed());

    let left: Vec<_> = index.query(&pos(SAN_FRANCISCO), 1).collect();
    assert_eq!(left, vec![ConnectionId(2)]);
}

#[test]
fn remove_never_placed_is_noop() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut b = conn(2);
    index.place(&mut b, pos(OAKLAND));

    let mut x = conn(9);
    assert!(!index.remove(&mut x));
    assert_eq!(index.len(), 1);
    assert_eq!(index.bucket_count(), 1);
}

#[test]
fn empty_buckets_are_dropped() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    index.place(&mut a, pos(SAN_FRANCISCO));
    index.place(&mut a, pos(NEW_YORK));

    assert_eq!(index.bucket_count(), 1);
    index.remove(&mut a);
    assert!(index.is_empty());
}

#[test]
fn place_then_query_round_trip() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    index.place(&mut a, pos(NEW_YORK));

    let found: Vec<_> = index.query(&pos(NEW_YORK), 1).collect();
    assert_eq!(found, vec![a.id()]);
}

#[test]
fn query_is_recomputed_each_call() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    index.place(&mut a, pos(SAN_FRANCISCO));
    assert_eq!(index.query(&pos(SAN_FRANCISCO), 1).count(), 1);

    let mut b = conn(2);
    index.place(&mut b, pos(OAKLAND));
    assert_eq!(index.query(&pos(SAN_FRANCISCO), 1).count(), 2);
}

#[test]
fn radius_zero_only_sees_own_bucket() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    let mut b = conn(2);
    index.place(&mut a, pos(SAN_FRANCISCO));
    index.place(&mut b, pos(OAKLAND));

    let sf = pos(SAN_FRANCISCO);
    let same_bucket = index.bucket_of(&sf) == index.bucket_of(&pos(OAKLAND));
    let found: Vec<_> = index.query(&sf, 0).collect();

    assert!(found.contains(&a.id()));
    assert_eq!(found.contains(&b.id()), same_bucket);
}

#[test]
fn huge_query_radius_is_capped() {
    let mut index = RegionIndex::new(PRECISION).unwrap();
    let mut a = conn(1);
    let mut b = conn(2);
    index.place(&mut a, pos(SAN_FRANCISCO));
    index.place(&mut b, pos(NEW_YORK));

    let found: Vec<_> = index.query(&pos(SAN_FRANCISCO), 50_000_000).collect();
    assert_eq!(found, vec![a.id()]);
}

#[test]
fn registry_rejects_oversized_radius() {
    let options = QueryOptions {
        radius: 50_000_000,
        ..QueryOptions::default()
    };
    let err = ConnectionRegistry::<()>::new(RegionIndex::new(PRECISION).unwrap(), options)
        .unwrap_err();
    assert_eq!(err, CoreError::InvalidRadius(50_000_000));

    let widest = QueryOptions {
        radius: MAX_QUERY_RADIUS,
        ..QueryOptions::default()
    };
    let mut reg = ConnectionRegistry::new(RegionIndex::new(PRECISION).unwrap(), widest).unwrap();
    admit(&mut reg, 1);
    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    assert!(reg.query_nearby(&pos(SAN_FRANCISCO), None).contains_key(&uid(1)));
}

#[test]
fn rejects_bad_precision() {
    assert_eq!(
        RegionIndex::new(0).unwrap_err(),
        CoreError::InvalidPrecision(0)
    );
    assert!(RegionIndex::new(10).is_err());
    assert!(RegionIndex::new(9).is_ok());
}

// -----------------------------------------------------------------------------
// ConnectionRegistry
// -----------------------------------------------------------------------------

#[test]
fn san_francisco_and_oakland_are_neighbours() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    admit(&mut reg, 2);

    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    reg.report_location(ConnectionId(2), OAKLAND.0, OAKLAND.1)
        .unwrap();

    let nearby = reg.query_nearby(&pos(SAN_FRANCISCO), Some(ConnectionId(1)));
    assert_eq!(nearby.len(), 2);
    assert!(nearby.contains_key(&uid(1)));
    assert_eq!(nearby[&uid(2)].display_name, "User 2");
}

#[test]
fn new_york_is_not_near_san_francisco() {
    let mut reg = registry(SelfPolicy::Include);
    for id in 1..=3 {
        admit(&mut reg, id);
    }
    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    reg.report_location(ConnectionId(2), OAKLAND.0, OAKLAND.1)
        .unwrap();
    reg.report_location(ConnectionId(3), NEW_YORK.0, NEW_YORK.1)
        .unwrap();

    let nearby = reg.query_nearby_of(ConnectionId(1));
    assert!(!nearby.contains_key(&uid(3)));

    let east = reg.query_nearby_of(ConnectionId(3));
    assert_eq!(east.keys().collect::<Vec<_>>(), vec![&uid(3)]);
}

#[test]
fn exclude_policy_drops_requester() {
    let mut reg = registry(SelfPolicy::Exclude);
    admit(&mut reg, 1);
    admit(&mut reg, 2);
    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    reg.report_location(ConnectionId(2), OAKLAND.0, OAKLAND.1)
        .unwrap();

    let nearby = reg.query_nearby_of(ConnectionId(1));
    assert_eq!(nearby.keys().collect::<Vec<_>>(), vec![&uid(2)]);

    // no requester: nothing to exclude
    assert_eq!(reg.query_nearby(&pos(SAN_FRANCISCO), None).len(), 2);
}

#[test]
fn admit_then_evict_without_location() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    admit(&mut reg, 7);
    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    let buckets_before = reg.index().bucket_count();

    let gone = reg.evict(ConnectionId(7));
    assert!(gone.is_some());
    assert_eq!(reg.index().bucket_count(), buckets_before);
    assert_eq!(reg.index().len(), 1);
    assert_eq!(reg.len(), 1);
}

#[test]
fn evict_twice_and_unknown_are_noops() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    reg.report_location(ConnectionId(1), OAKLAND.0, OAKLAND.1)
        .unwrap();

    assert!(reg.evict(ConnectionId(1)).is_some());
    assert!(reg.evict(ConnectionId(1)).is_none());
    assert!(reg.evict(ConnectionId(42)).is_none());
    assert!(reg.index().is_empty());
    assert!(reg.is_empty());
}

#[test]
fn evicted_connection_is_never_returned() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    admit(&mut reg, 2);
    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    reg.report_location(ConnectionId(2), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();

    reg.evict(ConnectionId(2));

    let nearby = reg.query_nearby(&pos(SAN_FRANCISCO), None);
    assert!(!nearby.contains_key(&uid(2)));
    assert!(reg.neighbours_of(ConnectionId(1)).is_empty());
}

#[test]
fn moving_between_buckets_updates_visibility() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);

    let first = reg
        .report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    assert!(matches!(
        first,
        LocationUpdate::Relocated(Relocation::Placed { .. })
    ));

    let second = reg
        .report_location(ConnectionId(1), NEW_YORK.0, NEW_YORK.1)
        .unwrap();
    assert!(matches!(
        second,
        LocationUpdate::Relocated(Relocation::Moved { .. })
    ));

    assert!(reg.query_nearby(&pos(SAN_FRANCISCO), None).is_empty());
    assert!(reg.query_nearby(&pos(NEW_YORK), None).contains_key(&uid(1)));
}

#[test]
fn invalid_coordinates_change_nothing() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    reg.report_location(ConnectionId(1), OAKLAND.0, OAKLAND.1)
        .unwrap();

    let err = reg.report_location(ConnectionId(1), 123.0, 0.0).unwrap_err();
    assert!(matches!(err, CoreError::InvalidCoordinates { .. }));
    assert!(reg.report_location(ConnectionId(1), f64::NAN, 0.0).is_err());

    let placed = reg.get(ConnectionId(1)).unwrap().placement().position().unwrap();
    assert_eq!(placed.lat(), OAKLAND.0);
}

#[test]
fn unknown_connection_location_is_noop() {
    let mut reg = registry(SelfPolicy::Include);
    let update = reg.report_location(ConnectionId(5), 0.0, 0.0).unwrap();
    assert_eq!(update, LocationUpdate::UnknownConnection);
    assert!(reg.index().is_empty());
}

#[test]
fn duplicate_admit_is_rejected() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    let err = reg
        .admit(ConnectionId(1), uid(1), Profile::new("again", ""), ())
        .unwrap_err();
    assert_eq!(err, CoreError::DuplicateConnection(ConnectionId(1)));
}

#[test]
fn unplaced_requester_sees_nobody() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    admit(&mut reg, 2);
    reg.report_location(ConnectionId(2), OAKLAND.0, OAKLAND.1)
        .unwrap();

    assert!(reg.query_nearby_of(ConnectionId(1)).is_empty());
    assert!(reg.neighbours_of(ConnectionId(1)).is_empty());
}

#[test]
fn refreshed_profile_shows_in_results() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    reg.report_location(ConnectionId(1), OAKLAND.0, OAKLAND.1)
        .unwrap();

    assert!(reg.refresh_profile(ConnectionId(1), Profile::new("Renamed", "new.png")));
    assert!(!reg.refresh_profile(ConnectionId(99), Profile::new("x", "y")));

    let nearby = reg.query_nearby_of(ConnectionId(1));
    assert_eq!(nearby[&uid(1)], Profile::new("Renamed", "new.png"));
}

#[test]
fn neighbours_exclude_sender_even_under_include_policy() {
    let mut reg = registry(SelfPolicy::Include);
    admit(&mut reg, 1);
    admit(&mut reg, 2);
    admit(&mut reg, 3);
    reg.report_location(ConnectionId(1), SAN_FRANCISCO.0, SAN_FRANCISCO.1)
        .unwrap();
    reg.report_location(ConnectionId(2), OAKLAND.0, OAKLAND.1)
        .unwrap();
    reg.report_location(ConnectionId(3), NEW_YORK.0, NEW_YORK.1)
        .unwrap();

    let ids: Vec<_> = reg
        .neighbours_of(ConnectionId(1))
        .iter()
        .map(|c| c.id())
        .collect();
    assert_eq!(ids, vec![ConnectionId(2)]);
}
