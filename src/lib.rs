//! # hitstore
//!
//! A per-chromosome, on-disk sorted store for aligned sequencing hits with:
//! - Three parallel fixed-width column files per store (positions, weights, length/strand)
//! - Append fast path for batches that sort after existing data
//! - Out-of-core two-way merge for overlapping batches
//! - Stable resort for stores whose order cannot be assumed
//! - Temp-file-then-rename commit for every full rewrite
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │          (prefix, per-store write locks, discovery)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  (chrom, hit type)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       HitStore                               │
//! │        create / extend / append / merge / resort             │
//! └──────────┬───────────────────────────────┬──────────────────┘
//!            │                               │
//!            ▼                               ▼
//!   ┌─────────────────┐            ┌───────────────────┐
//!   │  Column views   │            │  Commit protocol  │
//!   │ (mmap read/     │            │ (*.tmp → rename)  │
//!   │  pre-sized out) │            └───────────────────┘
//!   └────────┬────────┘
//!            ▼
//!   ┌─────────────────┐
//!   │     Format      │
//!   │ (LAS word, file │
//!   │  naming)        │
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hit;
pub mod format;
pub mod column;
pub mod store;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HitStoreError, Result};
pub use config::{Config, SyncStrategy, WriteOptions};
pub use engine::Engine;
pub use hit::{Hit, HitType, Strand};
pub use store::HitStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hitstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
