//! Commit protocol
//!
//! Full rewrites (create, merge, resort) write all three columns to `.tmp`
//! siblings, flush and close them, check their sizes, and only then rename
//! each one over its canonical file.
//!
//! The three renames are not one transaction. A crash between them leaves
//! some columns new and some old; `StoreRecovery::verify` reports that state.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::column::ColumnWriter;
use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};
use crate::format::{Column, StorePaths, ELEMENT_WIDTH};
use crate::hit::Hit;

use super::las_of;

/// Pre-sized temporary output for a full rewrite of one store
pub struct StagedStore {
    paths: StorePaths,
    op: &'static str,
    len: usize,
    positions: ColumnWriter<i32>,
    weights: ColumnWriter<f32>,
    las: ColumnWriter<i32>,
    /// Declared last so the writers are closed before their files are removed
    guard: TempGuard,
}

impl StagedStore {
    /// Create the three `.tmp` columns, each sized for `len` records
    pub fn create(paths: &StorePaths, len: usize, op: &'static str) -> Result<Self> {
        let mut guard = TempGuard::default();

        let positions_tmp = paths.temporary(Column::Positions);
        guard.track(&positions_tmp);
        let positions = ColumnWriter::create(&positions_tmp, len, op)?;

        let weights_tmp = paths.temporary(Column::Weights);
        guard.track(&weights_tmp);
        let weights = ColumnWriter::create(&weights_tmp, len, op)?;

        let las_tmp = paths.temporary(Column::Las);
        guard.track(&las_tmp);
        let las = ColumnWriter::create(&las_tmp, len, op)?;

        debug!(chrom = paths.chrom, hit_type = %paths.hit_type, records = len, op, "staged rewrite");

        Ok(Self {
            paths: paths.clone(),
            op,
            len,
            positions,
            weights,
            las,
            guard,
        })
    }

    /// Write one row to all three columns
    #[inline]
    pub fn put_row(&mut self, index: usize, position: i32, weight: f32, las: i32) {
        self.positions.put(index, position);
        self.weights.put(index, weight);
        self.las.put(index, las);
    }

    /// Write one validated hit as a row
    #[inline]
    pub fn put_hit(&mut self, index: usize, hit: &Hit) {
        self.put_row(index, hit.position, hit.weight, las_of(hit));
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flush and close the temporaries, then rename each over its canonical file
    pub fn commit(self, options: WriteOptions) -> Result<()> {
        let Self {
            paths,
            op,
            len,
            positions,
            weights,
            las,
            mut guard,
        } = self;

        positions.finish(options)?;
        weights.finish(options)?;
        las.finish(options)?;

        // Nothing is renamed until every temporary checks out
        for (column, dest) in paths.column_paths() {
            verify_staged(&temporary_of(dest), len, ELEMENT_WIDTH, op)
                .inspect_err(|_| warn!(column = %column, op, "staged column failed verification"))?;
        }

        // From here on the temporaries belong to the rename sequence: a failed
        // rename must leave the rest in place for inspection.
        guard.disarm();

        let mut published = 0;
        for (column, dest) in paths.column_paths() {
            if let Err(e) = publish_column(&temporary_of(dest), dest, op) {
                error!(
                    column = %column,
                    published,
                    op,
                    "rename failed part way through commit; recover finishes it"
                );
                return Err(e);
            }
            published += 1;
        }

        if options.should_sync() {
            sync_published(paths.dir(), op);
        }

        debug!(chrom = paths.chrom, hit_type = %paths.hit_type, records = len, op, "committed");
        Ok(())
    }
}

/// Check that a temporary column holds exactly `records` elements of `element_width` bytes
pub fn verify_staged(path: &Path, records: usize, element_width: usize, op: &'static str) -> Result<()> {
    let bytes = fs::metadata(path).map_err(HitStoreError::io(op, path))?.len();
    let expected = records
        .checked_mul(element_width)
        .map(|b| b as u64)
        .ok_or(HitStoreError::TooManyRecords {
            count: records as u64,
        })?;

    if bytes != expected {
        return Err(HitStoreError::TornColumn {
            path: path.to_path_buf(),
            bytes,
        });
    }
    Ok(())
}

/// Promote one temporary over its canonical path
pub fn publish_column(tmp: &Path, dest: &Path, op: &'static str) -> Result<()> {
    fs::rename(tmp, dest).map_err(HitStoreError::io(op, dest))
}

fn temporary_of(path: &Path) -> PathBuf {
    crate::format::temporary_path(path)
}

/// Sync the directory of a store whose columns are already live.
/// The commit has happened, so a failure is logged rather than returned.
pub(super) fn sync_published(dir: &Path, op: &'static str) {
    if let Err(e) = sync_dir(dir, op) {
        warn!(op, error = %e, "directory sync failed after publishing store");
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path, op: &'static str) -> Result<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(HitStoreError::io(op, dir))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path, _op: &'static str) -> Result<()> {
    Ok(())
}

/// Removes tracked temporaries on drop unless disarmed
#[derive(Default)]
struct TempGuard {
    paths: Vec<PathBuf>,
    armed: bool,
}

impl TempGuard {
    fn track(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Reverse creation order: whatever an interrupted cleanup leaves is
        // still a prefix of the columns, which recovery reads as staging
        for path in self.paths.iter().rev() {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed abandoned temporary"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove temporary"),
            }
        }
    }
}
