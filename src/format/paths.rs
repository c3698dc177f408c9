//! Store file naming
//!
//! Maps (prefix, chromosome, hit type) to the three canonical column paths
//! and their `.tmp` siblings.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::hit::HitType;

/// Suffix appended to a canonical path while a rewrite is in flight
pub const TMP_SUFFIX: &str = ".tmp";

/// One of the three parallel arrays of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Positions,
    Weights,
    Las,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Positions, Column::Weights, Column::Las];

    /// File name suffix for this column under the given hit type
    pub fn suffix(self, hit_type: HitType) -> &'static str {
        match (self, hit_type) {
            (Column::Positions, HitType::Primary) => ".spositions",
            (Column::Weights, HitType::Primary) => ".sweights",
            (Column::Las, HitType::Primary) => ".slas",
            (Column::Positions, HitType::Secondary) => ".st2positions",
            (Column::Weights, HitType::Secondary) => ".st2weights",
            (Column::Las, HitType::Secondary) => ".st2las",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Positions => write!(f, "positions"),
            Column::Weights => write!(f, "weights"),
            Column::Las => write!(f, "las"),
        }
    }
}

/// Canonical file paths of one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub chrom: u32,
    pub hit_type: HitType,
    pub positions: PathBuf,
    pub weights: PathBuf,
    pub las: PathBuf,
}

impl StorePaths {
    /// Build paths by concatenating `prefix`, the chromosome id, and the column suffix.
    ///
    /// The prefix is not treated as a directory: `"/data/run1_"` yields
    /// `/data/run1_7.spositions`.
    pub fn new(prefix: &str, chrom: u32, hit_type: HitType) -> Self {
        let build = |column: Column| PathBuf::from(format!("{prefix}{chrom}{}", column.suffix(hit_type)));
        Self {
            chrom,
            hit_type,
            positions: build(Column::Positions),
            weights: build(Column::Weights),
            las: build(Column::Las),
        }
    }

    /// Path of a single column
    pub fn column(&self, column: Column) -> &Path {
        match column {
            Column::Positions => &self.positions,
            Column::Weights => &self.weights,
            Column::Las => &self.las,
        }
    }

    /// All (column, path) pairs, positions first
    pub fn column_paths(&self) -> [(Column, &Path); 3] {
        Column::ALL.map(|column| (column, self.column(column)))
    }

    /// Temporary sibling of a column path
    pub fn temporary(&self, column: Column) -> PathBuf {
        temporary_path(self.column(column))
    }

    /// Directory holding the store files
    pub fn dir(&self) -> &Path {
        match self.positions.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// `path` with [`TMP_SUFFIX`] appended to its final component
pub fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}
