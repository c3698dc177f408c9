//! Column Appender
//!
//! Extends an existing column file in place. Used only by the append path,
//! which trades commit atomicity for not rewriting the store.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};
use crate::format::ELEMENT_WIDTH;

use super::Element;

/// Buffered writer positioned at the end of a column file
pub struct ColumnAppender<T: Element> {
    path: PathBuf,
    file: File,
    /// Staging buffer, drained whenever it reaches `capacity`
    buffer: BytesMut,
    capacity: usize,
    appended: usize,
    _marker: PhantomData<T>,
}

impl<T: Element> ColumnAppender<T> {
    /// Open `path` for appending, creating it if missing
    pub fn open(path: &Path, options: WriteOptions) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(HitStoreError::io("append", path))?;

        // Round down to whole elements so a drain never splits one
        let capacity = (options.write_buffer_size / ELEMENT_WIDTH).max(1) * ELEMENT_WIDTH;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            appended: 0,
            _marker: PhantomData,
        })
    }

    /// Queue one element
    pub fn push(&mut self, value: T) -> Result<()> {
        self.buffer.put_slice(&value.to_le());
        self.appended += 1;
        if self.buffer.len() >= self.capacity {
            self.drain()?;
        }
        Ok(())
    }

    /// Number of elements pushed so far
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write any staged bytes and optionally fsync
    pub fn finish(mut self, options: WriteOptions) -> Result<()> {
        self.drain()?;
        if options.should_sync() {
            self.file
                .sync_all()
                .map_err(HitStoreError::io("append", &self.path))?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.file
            .write_all(&self.buffer)
            .map_err(HitStoreError::io("append", &self.path))?;
        self.buffer.clear();
        Ok(())
    }
}
