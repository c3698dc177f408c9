//! Column Writer
//!
//! Pre-sized, randomly addressable output region for a rewritten column.
//! The final record count is always known up front (old + new for merge,
//! old for resort), so the file is sized once and filled through a map.

use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};
use crate::format::ELEMENT_WIDTH;

use super::{byte_len, Element};

/// Writable view over a freshly sized column file
pub struct ColumnWriter<T: Element> {
    path: PathBuf,
    file: File,
    /// None when `len == 0`
    map: Option<MmapMut>,
    len: usize,
    op: &'static str,
    _marker: PhantomData<T>,
}

impl<T: Element> ColumnWriter<T> {
    /// Create (or truncate) `path` and size it to exactly `len` elements
    pub fn create(path: &Path, len: usize, op: &'static str) -> Result<Self> {
        let bytes = byte_len(len).ok_or(HitStoreError::TooManyRecords { count: len as u64 })?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(HitStoreError::io(op, path))?;

        file.set_len(bytes).map_err(HitStoreError::io(op, path))?;

        // SAFETY: the file was just created by this writer and is not
        // visible under any canonical name until commit.
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { MmapMut::map_mut(&file) }.map_err(HitStoreError::io(op, path))?)
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            len,
            op,
            _marker: PhantomData,
        })
    }

    /// Store `value` at `index`
    ///
    /// # Panics
    /// If `index >= self.len()`.
    #[inline]
    pub fn put(&mut self, index: usize, value: T) {
        let offset = index * ELEMENT_WIDTH;
        let region = match self.map.as_deref_mut() {
            Some(region) => region,
            None => panic!("put({index}) on an empty column"),
        };
        region[offset..offset + ELEMENT_WIDTH].copy_from_slice(&value.to_le());
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the region and close the file
    pub fn finish(self, options: WriteOptions) -> Result<()> {
        let Self {
            path, file, map, op, ..
        } = self;

        if let Some(map) = map {
            if options.should_sync() {
                map.flush().map_err(HitStoreError::io(op, &path))?;
            }
            drop(map);
        }

        if options.should_sync() {
            file.sync_all().map_err(HitStoreError::io(op, &path))?;
        }

        Ok(())
    }
}
