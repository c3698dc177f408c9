//! Tests for the merge path
//!
//! These tests verify:
//! - New rows precede stored rows on equal positions
//! - Multiplicity is preserved
//! - Output equals a stable sort of new ++ old
//! - All three columns move together

use hitstore::{Hit, HitStore, HitStoreError, Strand};

use crate::helpers::*;

#[test]
fn test_merge_tie_break_scenario() {
    let (_temp, paths) = setup_temp_store();
    // Old rows tagged 1..4, new rows tagged 100, 101
    let store = HitStore::create(paths.clone(), &tagged_hits(&[10, 20, 20, 30], 1.0), options()).unwrap();

    let store = store.merge(&tagged_hits(&[20, 25], 100.0), options()).unwrap();

    assert_eq!(positions_of(&store), vec![10, 20, 20, 20, 25, 30]);
    assert_eq!(weights_of(&store), vec![1.0, 100.0, 2.0, 3.0, 101.0, 4.0]);
    assert!(!temporaries_exist(&paths));
}

#[test]
fn test_merge_batch_entirely_before() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths, &tagged_hits(&[50, 60], 0.0), options()).unwrap();

    let store = store.merge(&tagged_hits(&[-5, 1], 10.0), options()).unwrap();

    assert_eq!(positions_of(&store), vec![-5, 1, 50, 60]);
    assert_eq!(weights_of(&store), vec![10.0, 11.0, 0.0, 1.0]);
}

#[test]
fn test_merge_all_equal_positions() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths, &tagged_hits(&[7, 7, 7], 0.0), options()).unwrap();

    let store = store.merge(&tagged_hits(&[7, 7], 10.0), options()).unwrap();

    assert_eq!(weights_of(&store), vec![10.0, 11.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_merge_moves_rows_as_units() {
    let (_temp, paths) = setup_temp_store();
    let old = vec![
        Hit::new(10, Strand::Plus, 30, 0.5),
        Hit::new(30, Strand::Minus, 31, 1.5),
    ];
    let new = vec![
        Hit::new(20, Strand::Minus, 40, 2.5),
        Hit::new(30, Strand::Plus, 41, 3.5),
    ];
    let store = HitStore::create(paths, &old, options()).unwrap();

    let store = store.merge(&new, options()).unwrap();

    assert_eq!(
        store.iter().collect::<Vec<_>>(),
        vec![old[0], new[0], new[1], old[1]]
    );
}

#[test]
fn test_merge_empty_batch_is_noop() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths.clone(), &tagged_hits(&[1, 2], 0.0), options()).unwrap();
    let before = file_bytes(&paths);

    let store = store.merge(&[], options()).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(file_bytes(&paths), before);
    assert!(!temporaries_exist(&paths));
}

#[test]
fn test_merge_rejects_unsorted_batch() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths.clone(), &tagged_hits(&[1, 2], 0.0), options()).unwrap();
    let before = file_bytes(&paths);

    let result = store.merge(&tagged_hits(&[5, 4, 6], 0.0), options());

    assert!(matches!(result, Err(HitStoreError::UnsortedBatch { index: 1 })));
    assert_eq!(file_bytes(&paths), before);
    assert!(!temporaries_exist(&paths));
}

#[test]
fn test_merge_into_missing_store() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::open(paths).unwrap();

    let store = store.merge(&tagged_hits(&[3, 3], 0.0), options()).unwrap();

    assert_eq!(positions_of(&store), vec![3, 3]);
}

#[test]
fn test_merge_equals_stable_sort_of_new_then_old() {
    let mut rng = Rng::new(0x5eed);

    for round in 0..20 {
        let (_temp, paths) = setup_temp_store();
        let old_count = rng.below(200) as usize;
        let new_count = rng.below(200) as usize + 1;
        let old_positions = rng.sorted_positions(old_count, 100);
        let new_positions = rng.sorted_positions(new_count, 100);
        let old = tagged_hits(&old_positions, 0.0);
        let new = tagged_hits(&new_positions, 10_000.0);

        let mut expected: Vec<Hit> = new.iter().chain(old.iter()).copied().collect();
        expected.sort_by_key(|hit| hit.position);

        let store = HitStore::create(paths, &old, options())
            .unwrap()
            .merge(&new, options())
            .unwrap();

        assert_eq!(store.len(), old.len() + new.len(), "round {round}");
        assert_eq!(store.iter().collect::<Vec<_>>(), expected, "round {round}");
        assert_sorted(&store);
    }
}

#[test]
fn test_repeated_merge_is_deterministic() {
    let (_temp_a, paths_a) = setup_temp_store();
    let (_temp_b, paths_b) = setup_temp_store();
    let old = tagged_hits(&[1, 2, 2, 3], 0.0);
    let batch = tagged_hits(&[2, 3], 50.0);

    let a = HitStore::create(paths_a, &old, options())
        .unwrap()
        .merge(&batch, options())
        .unwrap()
        .merge(&batch, options())
        .unwrap();
    let b = HitStore::create(paths_b, &old, options())
        .unwrap()
        .merge(&batch, options())
        .unwrap()
        .merge(&batch, options())
        .unwrap();

    assert_eq!(a.iter().collect::<Vec<_>>(), b.iter().collect::<Vec<_>>());
    assert_eq!(weights_of(&a), vec![0.0, 50.0, 50.0, 1.0, 2.0, 51.0, 51.0, 3.0]);
}
