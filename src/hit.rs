//! Hit definitions
//!
//! In-memory representation of one aligned sequencing read.

use std::fmt;
use std::str::FromStr;

/// Strand a read aligned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn as_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Error returned when parsing a strand from text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrandError(pub String);

impl fmt::Display for ParseStrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strand {:?}, expected '+' or '-'", self.0)
    }
}

impl std::error::Error for ParseStrandError {}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next().and_then(Strand::from_char), chars.next()) {
            (Some(strand), None) => Ok(strand),
            _ => Err(ParseStrandError(s.to_string())),
        }
    }
}

/// One aligned read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// 5' alignment coordinate on the chromosome
    pub position: i32,
    pub strand: Strand,
    /// Aligned length; must fit in 31 bits to be stored
    pub length: u32,
    pub weight: f32,
}

impl Hit {
    pub fn new(position: i32, strand: Strand, length: u32, weight: f32) -> Self {
        Self {
            position,
            strand,
            length,
            weight,
        }
    }
}

/// Alignment class a store holds.
///
/// Secondary hits (e.g. read 2 of a paired-end ChIP-exo library, where only
/// read 1 carries the exonuclease signal) live in their own independent files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HitType {
    Primary,
    Secondary,
}

impl HitType {
    pub fn from_type2(type2: bool) -> Self {
        if type2 {
            HitType::Secondary
        } else {
            HitType::Primary
        }
    }

    pub fn is_type2(self) -> bool {
        self == HitType::Secondary
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitType::Primary => write!(f, "primary"),
            HitType::Secondary => write!(f, "type2"),
        }
    }
}
