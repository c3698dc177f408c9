//! Packed length/strand word
//!
//! ```text
//!  31                              1   0
//! ┌─────────────────────────────────┬───┐
//! │ length (31 bits)                │ s │   s: 0 = '+', 1 = '-'
//! └─────────────────────────────────┴───┘
//! ```
//!
//! Every reader and writer of the format goes through these two functions.

use crate::hit::Strand;

/// Largest length the packed word can hold
pub const MAX_LENGTH: u32 = u32::MAX >> 1;

const STRAND_BIT: u32 = 1;

/// Pack a length and strand into one word.
///
/// Lengths above [`MAX_LENGTH`] lose their top bit; callers validate first.
#[inline]
pub fn encode_las(length: u32, strand: Strand) -> i32 {
    debug_assert!(length <= MAX_LENGTH, "length {length} exceeds MAX_LENGTH");
    let strand_bit = match strand {
        Strand::Plus => 0,
        Strand::Minus => STRAND_BIT,
    };
    ((length << 1) | strand_bit) as i32
}

/// Unpack a word into (length, strand)
#[inline]
pub fn decode_las(word: i32) -> (u32, Strand) {
    let word = word as u32;
    let strand = if word & STRAND_BIT == 0 {
        Strand::Plus
    } else {
        Strand::Minus
    };
    (word >> 1, strand)
}
