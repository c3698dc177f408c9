//! Merge path
//!
//! Two-way merge of the stored rows with a new sorted batch into a fresh
//! store of `old + new` rows. On equal positions the new row goes first,
//! so re-ingesting overlapping batches always yields the same order.

use tracing::{debug, info};

use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};
use crate::hit::Hit;

use super::{validate_batch, HitStore, StagedStore};

impl HitStore {
    /// Merge a sorted batch into the store and commit the result
    pub fn merge(self, hits: &[Hit], options: WriteOptions) -> Result<Self> {
        if hits.is_empty() {
            return Ok(self);
        }
        validate_batch(hits)?;

        let old_len = self.len();
        let total = old_len
            .checked_add(hits.len())
            .ok_or(HitStoreError::TooManyRecords {
                count: old_len as u64 + hits.len() as u64,
            })?;

        debug!(
            chrom = self.paths.chrom,
            hit_type = %self.paths.hit_type,
            old_len,
            batch = hits.len(),
            "merging"
        );

        let mut staged = StagedStore::create(&self.paths, total, "merge")?;

        let (mut old, mut new) = (0, 0);
        for out in 0..total {
            let take_new = new < hits.len()
                && (old == old_len || hits[new].position <= self.position(old));

            if take_new {
                staged.put_hit(out, &hits[new]);
                new += 1;
            } else {
                staged.put_row(out, self.position(old), self.weight(old), self.las(old));
                old += 1;
            }
        }
        debug_assert!(old == old_len && new == hits.len());

        let paths = self.paths.clone();
        drop(self);
        staged.commit(options)?;

        info!(
            chrom = paths.chrom,
            hit_type = %paths.hit_type,
            merged = hits.len(),
            records = total,
            "merged into store"
        );
        Self::open(paths)
    }
}
