//! Format Module
//!
//! On-disk layout of a hit store.
//!
//! ## File Format
//! ```text
//! One store = three parallel files, no header, no footer.
//! Element i of every file describes hit i.
//!
//! {P}{C}.spositions   ┌──────────┬──────────┬─────┐
//!                     │ i32 (LE) │ i32 (LE) │ ... │   5' position
//!                     └──────────┴──────────┴─────┘
//! {P}{C}.sweights     ┌──────────┬──────────┬─────┐
//!                     │ f32 (LE) │ f32 (LE) │ ... │   weight
//!                     └──────────┴──────────┴─────┘
//! {P}{C}.slas         ┌──────────┬──────────┬─────┐
//!                     │ LAS word │ LAS word │ ... │   length << 1 | strand
//!                     └──────────┴──────────┴─────┘
//!
//! Record count = file_size / ELEMENT_WIDTH
//! Type-2 stores use the .st2positions / .st2weights / .st2las suffixes.
//! ```

mod las;
mod paths;

pub use las::{decode_las, encode_las, MAX_LENGTH};
pub use paths::{temporary_path, Column, StorePaths, TMP_SUFFIX};

// =============================================================================
// Shared Constants
// =============================================================================

/// Width in bytes of every element in every column
pub const ELEMENT_WIDTH: usize = 4;
