//! Append path
//!
//! Extends the three column files in place when the batch sorts entirely
//! after the stored data. No temporaries and no rename: a crash mid-append
//! leaves the old records intact plus a possibly ragged tail, which
//! `StoreRecovery` trims back to the shortest column.

use tracing::{debug, info};

use crate::column::ColumnAppender;
use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};
use crate::hit::Hit;

use super::{las_of, validate_batch, HitStore};

impl HitStore {
    /// Append a sorted batch whose first position is `>=` the last stored position
    pub fn append(self, hits: &[Hit], options: WriteOptions) -> Result<Self> {
        if hits.is_empty() {
            return Ok(self);
        }
        validate_batch(hits)?;

        if let Some(last) = self.last_position() {
            let first = hits[0].position;
            if first < last {
                return Err(HitStoreError::AppendOutOfOrder { first, last });
            }
        }

        let old_len = self.len();
        let paths = self.paths.clone();
        // Release the maps before the files grow underneath them
        drop(self);

        debug!(chrom = paths.chrom, hit_type = %paths.hit_type, old_len, batch = hits.len(), "appending");

        let mut positions = ColumnAppender::<i32>::open(&paths.positions, options)?;
        let mut weights = ColumnAppender::<f32>::open(&paths.weights, options)?;
        let mut las = ColumnAppender::<i32>::open(&paths.las, options)?;

        for hit in hits {
            positions.push(hit.position)?;
            weights.push(hit.weight)?;
            las.push(las_of(hit))?;
        }

        positions.finish(options)?;
        weights.finish(options)?;
        las.finish(options)?;

        info!(
            chrom = paths.chrom,
            hit_type = %paths.hit_type,
            appended = hits.len(),
            records = old_len + hits.len(),
            "appended to store"
        );
        Self::open(paths)
    }
}
