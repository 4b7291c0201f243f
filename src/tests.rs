use super::*;

fn build(tiers: &[TierSpec], max_entities: usize) -> (Vec<u8>, usize) {
    let size = needed_size(max_entities, tiers).unwrap();
    (vec![0u8; size], size)
}

fn small_tiers() -> [TierSpec; 3] {
    [TierSpec::new(4, 4), TierSpec::new(16, 2), TierSpec::new(256, 2)]
}

/// S1 — basic add/get.
#[test]
fn basic_add_and_get() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(3).unwrap();
    c.add_child(3, 10).unwrap();

    assert_eq!(c.num_children(3).unwrap(), 1);
    assert_eq!(&*c.get_children(3).unwrap(), &[10][..]);
    assert_eq!(c.get_parent(10).unwrap(), 3);
}

/// S2 — up-migration: the third child added to a tier-0 (B=4) bucket
/// pushes it to tier 1 before insertion.
#[test]
fn up_migration_on_third_child() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(5).unwrap();
    c.add_child(5, 100).unwrap();
    c.add_child(5, 101).unwrap();
    c.add_child(5, 102).unwrap();

    assert_eq!(c.num_children(5).unwrap(), 3);
    assert_eq!(&*c.get_children(5).unwrap(), &[100, 101, 102][..]);
}

/// S3 — continuing S2, removing back down to 2 children migrates the
/// bucket back to tier 0.
#[test]
fn down_migration_after_removal() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(5).unwrap();
    c.add_child(5, 100).unwrap();
    c.add_child(5, 101).unwrap();
    c.add_child(5, 102).unwrap();

    c.remove_child(5, 102).unwrap();
    c.remove_child(5, 101).unwrap();

    assert_eq!(c.num_children(5).unwrap(), 1);
    assert_eq!(&*c.get_children(5).unwrap(), &[100][..]);
    assert_eq!(c.get_parent(101).unwrap(), NONE_ENTITY);
    assert_eq!(c.get_parent(102).unwrap(), NONE_ENTITY);
}

/// S4 — freelist reuse is LIFO.
#[test]
fn freelist_reuse_is_lifo() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(1).unwrap();
    c.add_entity(2).unwrap();
    let bucket_of_one = {
        // Same trick as the freelist unit tests: encode/decode via the
        // public API is not exposed, so we infer reuse by observing that
        // entity 7 behaves exactly like entity 1 did (same empty bucket).
        c.num_children(1).unwrap()
    };
    assert_eq!(bucket_of_one, 0);

    c.remove_entity(1).unwrap();
    c.add_entity(7).unwrap();

    // Entity 7 must have received a fresh, empty bucket (the one entity
    // 1 released), not failed due to tier exhaustion.
    assert_eq!(c.num_children(7).unwrap(), 0);
    c.add_child(7, 50).unwrap();
    assert_eq!(&*c.get_children(7).unwrap(), &[50][..]);
}

/// S5 — removal preserves order of surviving children.
#[test]
fn remove_child_preserves_order() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(9).unwrap();
    c.add_child(9, 20).unwrap();
    c.add_child(9, 21).unwrap();
    c.add_child(9, 22).unwrap();
    c.remove_child(9, 21).unwrap();

    assert_eq!(&*c.get_children(9).unwrap(), &[20, 22][..]);
}

/// S6 — reverse lookup survives migration in both directions.
#[test]
fn reverse_lookup_survives_migration() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(5).unwrap();
    for child in [100, 101, 102] {
        c.add_child(5, child).unwrap();
        assert_eq!(c.get_parent(child).unwrap(), 5);
    }
    c.remove_child(5, 102).unwrap();
    c.remove_child(5, 101).unwrap();
    assert_eq!(c.get_parent(100).unwrap(), 5);
}

#[test]
fn remove_entity_detaches_it_from_its_parent() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(1).unwrap();
    c.add_entity(2).unwrap();
    c.add_child(1, 2).unwrap();

    c.remove_entity(2).unwrap();
    assert_eq!(&*c.get_children(1).unwrap(), &[][..]);
}

#[test]
fn remove_entity_eagerly_detaches_its_children() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(1).unwrap();
    c.add_entity(2).unwrap();
    c.add_entity(3).unwrap();
    c.add_child(1, 2).unwrap();
    c.add_child(1, 3).unwrap();

    c.remove_entity(1).unwrap();

    assert_eq!(c.get_parent(2).unwrap(), NONE_ENTITY);
    assert_eq!(c.get_parent(3).unwrap(), NONE_ENTITY);
}

#[test]
fn add_entity_rejects_duplicate() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(4).unwrap();
    assert_eq!(c.add_entity(4), Err(EntitytainerError::DuplicateAdd(4)));
}

#[test]
fn add_entity_rejects_out_of_range_entity() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 8);
    let mut c = Entitytainer::create(&mut memory, 8, &tiers).unwrap();

    assert_eq!(c.add_entity(0), Err(EntitytainerError::InvalidEntity(0)));
    assert_eq!(c.add_entity(8), Err(EntitytainerError::InvalidEntity(8)));
}

#[test]
fn add_child_without_parent_bucket_errors() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(2).unwrap();
    assert_eq!(c.add_child(1, 2), Err(EntitytainerError::NoChildrenBucket(1)));
}

#[test]
fn remove_child_not_present_errors() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(1).unwrap();
    c.add_entity(2).unwrap();
    assert_eq!(
        c.remove_child(1, 2),
        Err(EntitytainerError::ChildNotPresent { parent: 1, child: 2 })
    );
}

#[test]
fn capacity_exceeded_at_top_tier() {
    // A single tier with bucket_size 4: the 3rd child (n+1 == B-1) would
    // need to migrate to tier 1, which does not exist.
    let tiers = [TierSpec::new(4, 2)];
    let (mut memory, _) = build(&tiers, 16);
    let mut c = Entitytainer::create(&mut memory, 16, &tiers).unwrap();

    c.add_entity(1).unwrap();
    c.add_child(1, 2).unwrap();
    c.add_child(1, 3).unwrap();
    assert_eq!(c.add_child(1, 4), Err(EntitytainerError::CapacityExceeded { tier: 0 }));
}

#[test]
fn tier_exhausted_when_no_buckets_remain() {
    let tiers = [TierSpec::new(4, 1)];
    let (mut memory, _) = build(&tiers, 16);
    let mut c = Entitytainer::create(&mut memory, 16, &tiers).unwrap();

    // Tier 0 reserves bucket 0 as the sentinel, so total_buckets=1 means
    // no bucket is available for add_entity.
    assert_eq!(c.add_entity(1), Err(EntitytainerError::TierExhausted { tier: 0 }));
}

#[test]
fn get_child_index_finds_position() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(9).unwrap();
    c.add_child(9, 20).unwrap();
    c.add_child(9, 21).unwrap();

    assert_eq!(c.get_child_index(9, 21).unwrap(), Some(1));
    assert_eq!(c.get_child_index(9, 99).unwrap(), None);
}

#[test]
fn needs_realloc_percent_threshold() {
    let tiers = [TierSpec::new(4, 4)];
    let (mut memory, _) = build(&tiers, 16);
    let mut c = Entitytainer::create(&mut memory, 16, &tiers).unwrap();

    // 1 of 4 buckets reserved as sentinel, none used yet: 3 free of 4.
    assert!(!c.needs_realloc(ReallocThreshold::Percent(0.5)));
    c.add_entity(1).unwrap();
    c.add_entity(2).unwrap();
    // 1 free of 4 left now.
    assert!(c.needs_realloc(ReallocThreshold::Percent(0.5)));
    assert!(c.needs_realloc(ReallocThreshold::Absolute(1)));
    assert!(!c.needs_realloc(ReallocThreshold::Absolute(0)));
}

/// Round-trip property (spec §8): add then remove restores child count
/// and clears the reverse lookup, independent of how many times the
/// bucket migrated in between.
#[test]
fn round_trip_add_then_remove_restores_state() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(5).unwrap();
    for child in [100, 101, 102, 103, 104] {
        c.add_child(5, child).unwrap();
    }
    for child in [100, 101, 102, 103, 104] {
        c.remove_child(5, child).unwrap();
    }

    assert_eq!(c.num_children(5).unwrap(), 0);
    for child in [100, 101, 102, 103, 104] {
        assert_eq!(c.get_parent(child).unwrap(), NONE_ENTITY);
    }
}

/// Migration monotonicity (spec §8): after every add_child, the parent's
/// bucket lives in the smallest tier whose capacity still has room.
#[test]
fn migration_keeps_bucket_in_smallest_fitting_tier() {
    let tiers = small_tiers();
    let (mut memory, _) = build(&tiers, 1024);
    let mut c = Entitytainer::create(&mut memory, 1024, &tiers).unwrap();

    c.add_entity(1).unwrap();
    let mut next_child: Entity = 10;
    // Push well past the tier-1 boundary (bucket size 16) into tier 2.
    for _ in 0..20 {
        c.add_child(1, next_child).unwrap();
        next_child += 1;
    }
    assert_eq!(c.num_children(1).unwrap(), 20);
    assert_eq!(&*c.get_children(1).unwrap(), (10..30).collect::<Vec<Entity>>().as_slice());
}

#[test]
fn create_rejects_buffer_too_small() {
    let tiers = small_tiers();
    let mut memory = vec![0u8; 4];
    assert!(matches!(
        Entitytainer::create(&mut memory, 1024, &tiers),
        Err(EntitytainerError::BufferTooSmall { .. })
    ));
}

#[test]
fn create_rejects_too_many_tiers() {
    let tiers = [TierSpec::new(2, 1); 5];
    let mut memory = vec![0u8; 4096];
    assert_eq!(
        Entitytainer::create(&mut memory, 16, &tiers),
        Err(EntitytainerError::TooManyTiers { got: 5 })
    );
}
