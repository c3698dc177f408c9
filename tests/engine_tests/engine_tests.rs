//! Tests for Engine
//!
//! These tests verify:
//! - Opening creates the prefix directory
//! - ingest appends or merges as the data allows
//! - Unsorted batches are rejected or sorted per config
//! - Primary and type-2 stores are independent
//! - Store discovery under a prefix
//! - Concurrent ingest into one store is serialized

use std::thread;

use hitstore::config::{Config, SyncStrategy};
use hitstore::engine::Engine;
use hitstore::{Hit, HitStoreError, HitType, Strand};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    setup_temp_engine_with(false)
}

fn setup_temp_engine_with(sort_incoming: bool) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .prefix(format!("{}/aln_", temp_dir.path().display()))
        .sync_strategy(SyncStrategy::Always)
        .write_buffer_size(256)
        .sort_incoming(sort_incoming)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn hits(positions: &[i32], first_tag: f32) -> Vec<Hit> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &p)| Hit::new(p, Strand::Minus, 50, first_tag + i as f32))
        .collect()
}

fn positions(engine: &Engine, chrom: u32, hit_type: HitType) -> Vec<i32> {
    engine
        .open_store(chrom, hit_type)
        .unwrap()
        .iter()
        .map(|hit| hit.position)
        .collect()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_prefix_dir() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("nested").join("run");
    let config = Config::builder()
        .prefix(format!("{}/sample_", dir.display()))
        .build();

    let _engine = Engine::open(config).unwrap();

    assert!(dir.is_dir());
}

#[test]
fn test_engine_rejects_invalid_config() {
    let config = Config::builder().prefix("").build();
    assert!(matches!(Engine::open(config), Err(HitStoreError::Config(_))));

    let config = Config::builder().prefix("/tmp/x_").write_buffer_size(0).build();
    assert!(matches!(Engine::open(config), Err(HitStoreError::Config(_))));
}

#[test]
fn test_engine_paths_follow_prefix() {
    let (temp, engine) = setup_temp_engine();

    let paths = engine.paths(3, HitType::Secondary);

    assert_eq!(paths.positions, temp.path().join("aln_3.st2positions"));
}

// =============================================================================
// Ingest Tests
// =============================================================================

#[test]
fn test_ingest_creates_then_extends() {
    let (_temp, engine) = setup_temp_engine();

    engine.ingest(1, HitType::Primary, &hits(&[10, 20], 0.0)).unwrap();
    engine.ingest(1, HitType::Primary, &hits(&[30], 0.0)).unwrap();
    let store = engine.ingest(1, HitType::Primary, &hits(&[15, 20], 0.0)).unwrap();

    assert_eq!(store.len(), 5);
    assert_eq!(positions(&engine, 1, HitType::Primary), vec![10, 15, 20, 20, 30]);
}

#[test]
fn test_ingest_empty_batch() {
    let (_temp, engine) = setup_temp_engine();

    let store = engine.ingest(1, HitType::Primary, &[]).unwrap();

    assert!(store.is_empty());
    assert!(!engine.paths(1, HitType::Primary).positions.exists());
}

#[test]
fn test_ingest_rejects_unsorted_by_default() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.ingest(1, HitType::Primary, &hits(&[5, 1], 0.0));

    assert!(matches!(result, Err(HitStoreError::UnsortedBatch { index: 1 })));
}

#[test]
fn test_ingest_sorts_when_configured() {
    let (_temp, engine) = setup_temp_engine_with(true);

    let store = engine
        .ingest(1, HitType::Primary, &hits(&[5, 1, 5, 3], 0.0))
        .unwrap();

    let rows: Vec<(i32, f32)> = store.iter().map(|h| (h.position, h.weight)).collect();
    // Stable: the two 5s keep arrival order
    assert_eq!(rows, vec![(1, 1.0), (3, 3.0), (5, 0.0), (5, 2.0)]);
}

#[test]
fn test_write_replaces_store() {
    let (_temp, engine) = setup_temp_engine();
    engine.ingest(2, HitType::Primary, &hits(&[1, 2, 3], 0.0)).unwrap();

    engine.write(2, HitType::Primary, &hits(&[9], 0.0)).unwrap();

    assert_eq!(positions(&engine, 2, HitType::Primary), vec![9]);
}

#[test]
fn test_hit_types_are_independent() {
    let (_temp, engine) = setup_temp_engine();

    engine.ingest(1, HitType::Primary, &hits(&[1, 2], 0.0)).unwrap();
    engine.ingest(1, HitType::Secondary, &hits(&[100], 0.0)).unwrap();
    engine.ingest(1, HitType::Secondary, &hits(&[50], 0.0)).unwrap();

    assert_eq!(positions(&engine, 1, HitType::Primary), vec![1, 2]);
    assert_eq!(positions(&engine, 1, HitType::Secondary), vec![50, 100]);
}

#[test]
fn test_resort_through_engine() {
    let (_temp, engine) = setup_temp_engine();
    engine.write(4, HitType::Primary, &hits(&[1, 2, 3], 0.0)).unwrap();

    let store = engine.resort(4, HitType::Primary).unwrap();

    assert_eq!(store.len(), 3);
    assert!(store.is_sorted());
}

#[test]
fn test_verify_and_recover_through_engine() {
    let (_temp, engine) = setup_temp_engine();
    engine.write(4, HitType::Primary, &hits(&[1, 2], 0.0)).unwrap();
    // Leftover of a rewrite interrupted while staging its first column
    std::fs::write(
        engine.paths(4, HitType::Primary).temporary(hitstore::format::Column::Positions),
        b"x",
    )
    .unwrap();

    assert!(!engine.verify(4, HitType::Primary).unwrap().is_clean());
    let report = engine.recover(4, HitType::Primary).unwrap();

    assert!(report.temporaries_removed);
    assert!(engine.verify(4, HitType::Primary).unwrap().is_clean());
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[test]
fn test_stores_lists_written_stores() {
    let (_temp, engine) = setup_temp_engine();
    engine.write(10, HitType::Primary, &hits(&[1], 0.0)).unwrap();
    engine.write(2, HitType::Secondary, &hits(&[1], 0.0)).unwrap();
    engine.write(2, HitType::Primary, &hits(&[1], 0.0)).unwrap();

    let stores = engine.stores().unwrap();

    assert_eq!(
        stores,
        vec![
            (2, HitType::Primary),
            (2, HitType::Secondary),
            (10, HitType::Primary),
        ]
    );
}

#[test]
fn test_stores_ignores_other_prefixes() {
    let (temp, engine) = setup_temp_engine();
    engine.write(1, HitType::Primary, &hits(&[1], 0.0)).unwrap();
    std::fs::write(temp.path().join("other_5.spositions"), b"").unwrap();
    std::fs::write(temp.path().join("aln_6.spositions.tmp"), b"").unwrap();

    assert_eq!(engine.stores().unwrap(), vec![(1, HitType::Primary)]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_ingest_same_store() {
    let (_temp, engine) = setup_temp_engine();

    thread::scope(|scope| {
        for t in 0..4 {
            let engine = &engine;
            scope.spawn(move || {
                for round in 0..5 {
                    let base = round * 10 + t;
                    engine
                        .ingest(1, HitType::Primary, &hits(&[base, base + 40], 0.0))
                        .unwrap();
                }
            });
        }
    });

    let store = engine.open_store(1, HitType::Primary).unwrap();
    assert_eq!(store.len(), 4 * 5 * 2);
    assert!(store.is_sorted());
}

#[test]
fn test_concurrent_ingest_different_stores() {
    let (_temp, engine) = setup_temp_engine();

    thread::scope(|scope| {
        for chrom in 0..4u32 {
            let engine = &engine;
            scope.spawn(move || {
                for round in 0..5 {
                    engine
                        .ingest(chrom, HitType::Primary, &hits(&[round], 0.0))
                        .unwrap();
                }
            });
        }
    });

    for chrom in 0..4 {
        assert_eq!(positions(&engine, chrom, HitType::Primary), vec![0, 1, 2, 3, 4]);
    }
}
