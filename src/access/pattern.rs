//! Namespace glob patterns
//!
//! - Segments are dot-delimited
//! - `*` as a whole segment matches exactly one segment
//! - `*` mixed with literal characters, and `**`, are rejected
//! - Exact string equality always matches

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// A validated single-level namespace glob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespacePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl NamespacePattern {
    /// Parse and validate a pattern such as `sales.*` or `*.chat`.
    pub fn parse(pattern: &str) -> StoreResult<Self> {
        if pattern.is_empty() {
            return Err(StoreError::invalid_pattern(pattern, "pattern is empty"));
        }
        let mut segments = Vec::new();
        for (index, segment) in pattern.split('.').enumerate() {
            let parsed = match segment {
                "" => {
                    return Err(StoreError::invalid_pattern(
                        pattern,
                        format!("segment {} is empty", index),
                    ))
                }
                "*" => Segment::Wildcard,
                "**" => {
                    return Err(StoreError::invalid_pattern(
                        pattern,
                        "deep wildcard '**' is not supported",
                    ))
                }
                s if s.contains('*') => {
                    return Err(StoreError::invalid_pattern(
                        pattern,
                        format!("segment '{}' mixes '*' with literal characters", s),
                    ))
                }
                s => Segment::Literal(s.to_string()),
            };
            segments.push(parsed);
        }
        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| *s == Segment::Wildcard)
    }

    /// Whether `namespace` matches this pattern.
    pub fn matches(&self, namespace: &str) -> bool {
        if namespace == self.raw {
            return true;
        }
        let mut parts = namespace.split('.');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (_, Some("")) => return false,
                (Segment::Wildcard, Some(_)) => {}
                (Segment::Literal(lit), Some(part)) => {
                    if lit != part {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

impl fmt::Display for NamespacePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for NamespacePattern {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NamespacePattern {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NamespacePattern> for String {
    fn from(pattern: NamespacePattern) -> Self {
        pattern.raw
    }
}
