//! Tests for the commit protocol
//!
//! These tests verify:
//! - Rewrites leave no temporaries behind
//! - Column files always hold whole, equal record counts after a commit
//! - A rewrite that fails before rename never touches canonical files
//! - A rename failing part way keeps the published column and the
//!   remaining temporaries, and recovery finishes the commit
//! - Stale temporaries from an earlier crash are overwritten, not trusted

use std::fs;

use hitstore::format::Column;
use hitstore::store::{PendingCommit, StagedStore, StoreRecovery};
use hitstore::{HitStore, HitStoreError};

use crate::helpers::*;

#[test]
fn test_commit_leaves_whole_equal_columns() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths.clone(), &tagged_hits(&[1, 2, 3], 0.0), options()).unwrap();

    let _store = store.merge(&tagged_hits(&[2, 4], 10.0), options()).unwrap();

    for (_, path) in paths.column_paths() {
        assert_eq!(fs::metadata(path).unwrap().len(), 5 * 4, "{}", path.display());
    }
    assert!(!temporaries_exist(&paths));
}

#[test]
fn test_failed_staging_keeps_canonical_files() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths.clone(), &tagged_hits(&[1, 2, 3], 0.0), options()).unwrap();
    let before = file_bytes(&paths);

    // A directory in the way makes the weights temporary impossible to create
    fs::create_dir(paths.temporary(Column::Weights)).unwrap();

    let result = store.merge(&tagged_hits(&[2], 10.0), options());

    match result {
        Err(HitStoreError::Io { op, path, .. }) => {
            assert_eq!(op, "merge");
            assert_eq!(path, paths.temporary(Column::Weights));
        }
        Err(other) => panic!("expected Io error, got {other}"),
        Ok(_) => panic!("expected Io error, merge succeeded"),
    }
    assert_eq!(file_bytes(&paths), before);
    assert!(!paths.temporary(Column::Positions).exists());

    let reopened = HitStore::open(paths).unwrap();
    assert_eq!(positions_of(&reopened), vec![1, 2, 3]);
}

#[test]
fn test_failed_resort_keeps_canonical_files() {
    let (_temp, paths) = setup_temp_store();
    write_raw_hits(&paths, &tagged_hits(&[3, 1, 2], 0.0));
    let before = file_bytes(&paths);
    fs::create_dir(paths.temporary(Column::Las)).unwrap();

    let result = HitStore::open(paths.clone()).unwrap().resort(options());

    assert!(matches!(result, Err(HitStoreError::Io { op: "resort", .. })));
    assert_eq!(file_bytes(&paths), before);
    assert!(!paths.temporary(Column::Positions).exists());
    assert!(!paths.temporary(Column::Weights).exists());
}

#[test]
fn test_stale_temporaries_are_overwritten() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths.clone(), &tagged_hits(&[1, 2], 0.0), options()).unwrap();
    for column in Column::ALL {
        fs::write(paths.temporary(column), [0xEEu8; 7]).unwrap();
    }

    let store = store.merge(&tagged_hits(&[1], 5.0), options()).unwrap();

    assert_eq!(positions_of(&store), vec![1, 1, 2]);
    assert_eq!(weights_of(&store), vec![5.0, 0.0, 1.0]);
    assert!(!temporaries_exist(&paths));
}

#[test]
fn test_dropped_staging_removes_temporaries() {
    let (_temp, paths) = setup_temp_store();

    {
        let mut staged = StagedStore::create(&paths, 2, "test").unwrap();
        staged.put_hit(0, &tagged(1, 0.0));
        assert!(temporaries_exist(&paths));
    }

    assert!(!temporaries_exist(&paths));
    assert!(!paths.positions.exists());
}

#[test]
fn test_staged_commit_publishes_all_columns() {
    let (_temp, paths) = setup_temp_store();

    let mut staged = StagedStore::create(&paths, 2, "test").unwrap();
    assert_eq!(staged.len(), 2);
    staged.put_hit(0, &tagged(4, 1.0));
    staged.put_hit(1, &tagged(8, 2.0));
    staged.commit(options()).unwrap();

    let store = HitStore::open(paths.clone()).unwrap();
    assert_eq!(positions_of(&store), vec![4, 8]);
    assert!(!temporaries_exist(&paths));
}

#[test]
fn test_rename_failure_part_way_then_recover() {
    let (_temp, paths) = setup_temp_store();
    let store = HitStore::create(paths.clone(), &tagged_hits(&[10, 20, 30], 1.0), options()).unwrap();

    // A directory where the weights file belongs makes the second rename fail
    fs::remove_file(&paths.weights).unwrap();
    fs::create_dir(&paths.weights).unwrap();

    let result = store.merge(&tagged_hits(&[5], 100.0), options());

    match result {
        Err(HitStoreError::Io { op, path, .. }) => {
            assert_eq!(op, "merge");
            assert_eq!(path, paths.weights);
        }
        Err(other) => panic!("expected Io error, got {other}"),
        Ok(_) => panic!("expected Io error, merge succeeded"),
    }

    // Positions were published, weights and las are still staged
    assert!(!paths.temporary(Column::Positions).exists());
    assert!(paths.temporary(Column::Weights).exists());
    assert!(paths.temporary(Column::Las).exists());
    assert_eq!(fs::metadata(&paths.positions).unwrap().len(), 4 * 4);
    assert_eq!(fs::metadata(&paths.las).unwrap().len(), 3 * 4);

    fs::remove_dir(&paths.weights).unwrap();
    assert!(matches!(
        HitStore::open(paths.clone()),
        Err(HitStoreError::Inconsistent { .. })
    ));
    let report = StoreRecovery::verify(&paths).unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.pending_commit, PendingCommit::Publishing);

    let report = StoreRecovery::recover(&paths).unwrap();

    assert!(report.rolled_forward);
    assert!(!report.was_truncated);
    assert!(!temporaries_exist(&paths));
    let store = HitStore::open(paths.clone()).unwrap();
    assert_eq!(positions_of(&store), vec![5, 10, 20, 30]);
    assert_eq!(weights_of(&store), vec![100.0, 1.0, 2.0, 3.0]);
    assert!(StoreRecovery::verify(&paths).unwrap().is_clean());
}
