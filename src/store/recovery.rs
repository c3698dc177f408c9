//! Store Recovery
//!
//! Inspects, and on request repairs, a store left behind by an interrupted
//! write. Write paths never call this themselves.
//!
//! ## What an interruption leaves behind
//! ```text
//! append            columns of different lengths, maybe a partial element
//!                   → trim every column to the shortest whole-record length
//!
//! commit, staging   .tmp for positions / positions+weights / all three
//!                   (created in column order) → canonical files are intact,
//!                   discard the temporaries
//!
//! commit, renaming  .tmp for weights+las / las only (renamed in column
//!                   order) → the renamed columns already hold the new rows,
//!                   finish the renames
//!
//! anything else     refuse with Inconsistent, touch nothing
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{HitStoreError, Result};
use crate::format::{temporary_path, Column, StorePaths, ELEMENT_WIDTH};

use super::commit::{publish_column, sync_published};

/// State of one column file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnStatus {
    pub column: Column,
    pub path: PathBuf,
    pub exists: bool,
    /// File size in bytes
    pub bytes: u64,
    /// Whole records in the file
    pub records: u64,
    /// Bytes past the last whole record
    pub trailing_bytes: u64,
}

/// Which step of a commit the temporaries on disk point to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommit {
    /// No temporaries
    Absent,
    /// Temporaries were still being written; canonical files are untouched
    Staging,
    /// Some columns were renamed into place, the rest are still `.tmp`
    Publishing,
    /// A set of temporaries no commit produces
    Unrecognized,
}

impl PendingCommit {
    /// Temporaries are created and renamed in column order, so a commit
    /// interrupted while staging leaves a prefix of the columns and one
    /// interrupted while renaming leaves a suffix.
    fn classify(pending: [bool; 3]) -> Self {
        match pending {
            [false, false, false] => PendingCommit::Absent,
            [true, false, false] | [true, true, false] | [true, true, true] => {
                PendingCommit::Staging
            }
            [false, true, true] | [false, false, true] => PendingCommit::Publishing,
            _ => PendingCommit::Unrecognized,
        }
    }
}

/// Result of a verify or recover pass
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    /// Positions, weights, las
    pub columns: Vec<ColumnStatus>,

    /// Records every column agrees on (shortest column)
    pub consistent_records: u64,

    /// `.tmp` files found next to the store
    pub stale_temporaries: Vec<PathBuf>,

    pub pending_commit: PendingCommit,

    /// Whether recover trimmed any column
    pub was_truncated: bool,

    /// Whether recover deleted the stale temporaries
    pub temporaries_removed: bool,

    /// Whether recover finished an interrupted rename sequence
    pub rolled_forward: bool,
}

impl RecoveryReport {
    /// True when no column is ragged, all agree, and no temporaries linger
    pub fn is_clean(&self) -> bool {
        let existing = self.columns.iter().filter(|c| c.exists).count();
        self.stale_temporaries.is_empty()
            && (existing == 0 || existing == self.columns.len())
            && self
                .columns
                .iter()
                .all(|c| c.trailing_bytes == 0 && c.records == self.consistent_records)
    }

    /// Whether no column file exists at all
    pub fn is_absent(&self) -> bool {
        self.columns.iter().all(|c| !c.exists)
    }
}

/// Verifies and repairs stores after crashes
pub struct StoreRecovery;

impl StoreRecovery {
    /// Inspect a store without modifying it
    pub fn verify(paths: &StorePaths) -> Result<RecoveryReport> {
        let mut columns = Vec::with_capacity(3);
        let mut stale_temporaries = Vec::new();
        let mut pending = [false; 3];

        for (slot, (column, path)) in paths.column_paths().into_iter().enumerate() {
            columns.push(column_status(column, path)?);

            let tmp = temporary_path(path);
            if tmp.exists() {
                pending[slot] = true;
                stale_temporaries.push(tmp);
            }
        }

        let consistent_records = columns.iter().map(|c| c.records).min().unwrap_or(0);

        Ok(RecoveryReport {
            columns,
            consistent_records,
            stale_temporaries,
            pending_commit: PendingCommit::classify(pending),
            was_truncated: false,
            temporaries_removed: false,
            rolled_forward: false,
        })
    }

    /// Repair a store left by an interrupted write.
    ///
    /// - interrupted staging: temporaries removed, then the append repair below
    /// - interrupted renaming: remaining renames finished when every
    ///   temporary holds exactly as many records as the renamed columns,
    ///   otherwise `Inconsistent` and nothing is changed
    /// - no temporaries: every column trimmed to the shortest whole-record
    ///   length. A column missing while others exist is recreated empty,
    ///   which empties the store.
    pub fn recover(paths: &StorePaths) -> Result<RecoveryReport> {
        let mut report = Self::verify(paths)?;

        match report.pending_commit {
            PendingCommit::Absent => {}
            PendingCommit::Staging => {
                for tmp in &report.stale_temporaries {
                    warn!(path = %tmp.display(), "removing temporary of unfinished commit");
                    fs::remove_file(tmp).map_err(HitStoreError::io("recover", tmp))?;
                }
                report.temporaries_removed = true;
            }
            PendingCommit::Publishing => {
                roll_forward(paths, &report)?;
                report.rolled_forward = true;
                report.columns = column_statuses(paths)?;
                report.consistent_records = report.columns[0].records;
                info!(
                    chrom = paths.chrom,
                    hit_type = %paths.hit_type,
                    records = report.consistent_records,
                    "finished interrupted commit"
                );
                return Ok(report);
            }
            PendingCommit::Unrecognized => {
                error!(
                    chrom = paths.chrom,
                    hit_type = %paths.hit_type,
                    temporaries = report.stale_temporaries.len(),
                    "temporaries match no interrupted commit; leaving store untouched"
                );
                return Err(inconsistent(paths, &report.columns, &pending_statuses(paths)?));
            }
        }

        if report.is_absent() {
            return Ok(report);
        }

        let target_bytes = report.consistent_records * ELEMENT_WIDTH as u64;
        for status in &report.columns {
            if status.exists && status.bytes == target_bytes {
                continue;
            }
            truncate_column(&status.path, target_bytes)?;
            warn!(
                column = %status.column,
                from_bytes = status.bytes,
                to_bytes = target_bytes,
                "trimmed column"
            );
            report.was_truncated = true;
        }

        if report.was_truncated {
            info!(
                chrom = paths.chrom,
                hit_type = %paths.hit_type,
                records = report.consistent_records,
                "recovered store"
            );
            report.columns = column_statuses(paths)?;
        }

        Ok(report)
    }
}

/// Finish the renames of a commit interrupted part way through publishing
fn roll_forward(paths: &StorePaths, report: &RecoveryReport) -> Result<()> {
    let staged = pending_statuses(paths)?;

    // The renamed columns and the leftover temporaries must all describe the
    // same whole number of rows
    let mut expected = None;
    let mut agree = true;
    for (canonical, tmp) in report.columns.iter().zip(&staged) {
        let status = tmp.as_ref().unwrap_or(canonical);
        if !status.exists || status.trailing_bytes != 0 {
            agree = false;
            break;
        }
        match expected {
            None => expected = Some(status.records),
            Some(records) if records != status.records => {
                agree = false;
                break;
            }
            Some(_) => {}
        }
    }

    if !agree {
        error!(
            chrom = paths.chrom,
            hit_type = %paths.hit_type,
            "staged columns disagree with published ones; leaving store untouched"
        );
        return Err(inconsistent(paths, &report.columns, &staged));
    }

    for (column, dest) in paths.column_paths() {
        let tmp = temporary_path(dest);
        if tmp.exists() {
            warn!(column = %column, "publishing column left by interrupted commit");
            publish_column(&tmp, dest, "recover")?;
        }
    }
    sync_published(paths.dir(), "recover");
    Ok(())
}

/// Status of each column's `.tmp` sibling, where one exists
fn pending_statuses(paths: &StorePaths) -> Result<Vec<Option<ColumnStatus>>> {
    paths
        .column_paths()
        .into_iter()
        .map(|(column, path)| {
            let status = column_status(column, &temporary_path(path))?;
            Ok(status.exists.then_some(status))
        })
        .collect()
}

fn column_statuses(paths: &StorePaths) -> Result<Vec<ColumnStatus>> {
    paths
        .column_paths()
        .into_iter()
        .map(|(column, path)| column_status(column, path))
        .collect()
}

/// Record counts the store would have, preferring staged columns
fn inconsistent(
    paths: &StorePaths,
    columns: &[ColumnStatus],
    staged: &[Option<ColumnStatus>],
) -> HitStoreError {
    let records = |slot: usize| {
        staged[slot]
            .as_ref()
            .map_or(columns[slot].records, |tmp| tmp.records)
    };
    HitStoreError::Inconsistent {
        path: paths.positions.clone(),
        positions: records(0),
        weights: records(1),
        las: records(2),
    }
}

fn column_status(column: Column, path: &Path) -> Result<ColumnStatus> {
    let bytes = match fs::metadata(path) {
        Ok(meta) => Some(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(HitStoreError::io("recover", path)(e)),
    };

    let width = ELEMENT_WIDTH as u64;
    let size = bytes.unwrap_or(0);
    Ok(ColumnStatus {
        column,
        path: path.to_path_buf(),
        exists: bytes.is_some(),
        bytes: size,
        records: size / width,
        trailing_bytes: size % width,
    })
}

fn truncate_column(path: &Path, bytes: u64) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(HitStoreError::io("recover", path))?;
    file.set_len(bytes)
        .and_then(|_| file.sync_all())
        .map_err(HitStoreError::io("recover", path))
}
