//! CommitId - totally ordered commit identity
//!
//! - Assigned by the commit log, strictly increasing
//! - Never reused, including after retention drops the commit
//! - Independent of wall-clock time

use std::fmt;

use serde::{Deserialize, Serialize};

/// A totally ordered, opaque commit identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(u64);

impl CommitId {
    /// Creates a new CommitId with the given value.
    ///
    /// No Default implementation exists to prevent accidental construction.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The identity assigned after this one.
    #[inline]
    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl std::str::FromStr for CommitId {
    type Err = std::num::ParseIntError;

    /// Accepts both `c42` and `42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('c').unwrap_or(s);
        digits.parse::<u64>().map(CommitId)
    }
}
