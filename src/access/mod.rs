//! # Access Control
//!
//! Per-identity read/write permissions over keys and namespace patterns.
//! Enforcement is opt-in: identities without a Permission Set are
//! unrestricted, identities with one are default-deny.

mod control;
mod pattern;
mod permissions;

pub use control::{AccessControl, AccessDecision};
pub use pattern::NamespacePattern;
pub use permissions::PermissionSet;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation class checked by access control. Deletes check as writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
