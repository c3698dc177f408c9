//! Column Reader
//!
//! Read-only memory-mapped view of an existing column file.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{HitStoreError, Result};
use crate::format::ELEMENT_WIDTH;

use super::{read_element, Element};

/// Read-only view over one column with O(1) random access
pub struct ColumnReader<T: Element> {
    path: PathBuf,
    /// None for empty files (zero-length maps are not portable)
    map: Option<Mmap>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Element> ColumnReader<T> {
    /// Map an existing column file.
    ///
    /// Fails with `TornColumn` when the file is not a whole number of elements.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(HitStoreError::io("open", path))?;
        let bytes = file
            .metadata()
            .map_err(HitStoreError::io("open", path))?
            .len();

        if bytes % ELEMENT_WIDTH as u64 != 0 {
            return Err(HitStoreError::TornColumn {
                path: path.to_path_buf(),
                bytes,
            });
        }

        let count = bytes / ELEMENT_WIDTH as u64;
        let len = usize::try_from(count).map_err(|_| HitStoreError::TooManyRecords { count })?;

        // SAFETY: the map is read-only and rewrites never touch a canonical
        // file in place; they land in a `.tmp` sibling that is renamed over it.
        // Appends only write past the mapped length.
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file) }.map_err(HitStoreError::io("open", path))?)
        };

        Ok(Self {
            path: path.to_path_buf(),
            map,
            len,
            _marker: PhantomData,
        })
    }

    /// A view for a column whose file does not exist yet
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            map: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Element at `index`
    ///
    /// # Panics
    /// If `index >= self.len()`, like slice indexing.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        read_element(self.bytes(), index)
    }

    /// Element at `index`, or None when out of bounds
    pub fn try_get(&self, index: usize) -> Option<T> {
        (index < self.len).then(|| self.get(index))
    }

    /// Last element, if any
    pub fn last(&self) -> Option<T> {
        self.len.checked_sub(1).map(|index| self.get(index))
    }

    /// Iterate over every element in file order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |index| self.get(index))
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

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}
