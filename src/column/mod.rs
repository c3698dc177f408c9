//! Column Module
//!
//! Fixed-width views over the three parallel arrays of a store.
//!
//! ## Responsibilities
//! - Read-only, O(1) random access over existing column files (mmap)
//! - Pre-sized writable regions for rewrite output (mmap on a `.tmp` file)
//! - Buffered tail extension of existing column files (append path)
//!
//! Every column is a flat run of 4-byte little-endian elements. The element
//! type only decides how those 4 bytes are interpreted.

mod appender;
mod reader;
mod writer;

pub use appender::ColumnAppender;
pub use reader::ColumnReader;
pub use writer::ColumnWriter;

use crate::format::ELEMENT_WIDTH;

/// A value stored in one column slot
pub trait Element: Copy + std::fmt::Debug + 'static {
    fn from_le(raw: [u8; ELEMENT_WIDTH]) -> Self;
    fn to_le(self) -> [u8; ELEMENT_WIDTH];
}

impl Element for i32 {
    #[inline]
    fn from_le(raw: [u8; ELEMENT_WIDTH]) -> Self {
        i32::from_le_bytes(raw)
    }

    #[inline]
    fn to_le(self) -> [u8; ELEMENT_WIDTH] {
        self.to_le_bytes()
    }
}

impl Element for f32 {
    #[inline]
    fn from_le(raw: [u8; ELEMENT_WIDTH]) -> Self {
        f32::from_le_bytes(raw)
    }

    #[inline]
    fn to_le(self) -> [u8; ELEMENT_WIDTH] {
        self.to_le_bytes()
    }
}

/// Byte length of `len` elements, or None on overflow
pub(crate) fn byte_len(len: usize) -> Option<u64> {
    len.checked_mul(ELEMENT_WIDTH).map(|bytes| bytes as u64)
}

#[inline]
pub(crate) fn read_element<T: Element>(bytes: &[u8], index: usize) -> T {
    let offset = index * ELEMENT_WIDTH;
    let mut raw = [0u8; ELEMENT_WIDTH];
    raw.copy_from_slice(&bytes[offset..offset + ELEMENT_WIDTH]);
    T::from_le(raw)
}
