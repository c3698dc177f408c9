//! Resort path
//!
//! Rebuilds sort order when `positions` may be unordered. Each row gets a
//! 64-bit key `position << 32 | original_index`; sorting the keys orders rows
//! by position and breaks ties by original index, which makes the result
//! stable without a comparator.

use tracing::{debug, info};

use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};

use super::{HitStore, StagedStore};

/// Largest row count whose indices fit the low 32 bits of a key
const MAX_RESORT_RECORDS: u64 = 1 << 32;

/// Composite key: position in the high half, row index in the low half
#[inline]
pub(crate) fn sort_key(position: i32, index: u32) -> i64 {
    ((position as i64) << 32) | index as i64
}

/// Inverse of [`sort_key`]
#[inline]
pub(crate) fn split_key(key: i64) -> (i32, usize) {
    ((key >> 32) as i32, (key & 0xFFFF_FFFF) as usize)
}

impl HitStore {
    /// Rewrite the store in stable position order and commit the result
    pub fn resort(self, options: WriteOptions) -> Result<Self> {
        let len = self.len();
        if len == 0 {
            return Ok(self);
        }
        if len as u64 > MAX_RESORT_RECORDS {
            return Err(HitStoreError::TooManyRecords { count: len as u64 });
        }

        debug!(chrom = self.paths.chrom, hit_type = %self.paths.hit_type, records = len, "resorting");

        let mut keys: Vec<i64> = self
            .positions()
            .iter()
            .enumerate()
            .map(|(index, position)| sort_key(position, index as u32))
            .collect();
        // Keys are unique, so an unstable sort is still stable on rows
        keys.sort_unstable();

        let mut staged = StagedStore::create(&self.paths, len, "resort")?;
        for (out, &key) in keys.iter().enumerate() {
            let (position, index) = split_key(key);
            staged.put_row(out, position, self.weight(index), self.las(index));
        }

        let paths = self.paths.clone();
        drop(self);
        staged.commit(options)?;

        info!(chrom = paths.chrom, hit_type = %paths.hit_type, records = len, "resorted store");
        Self::open(paths)
    }
}
