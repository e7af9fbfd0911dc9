//! Dot-delimited state paths (`game.credits`, `features.freeSpins.remaining`)

use std::fmt;
use std::str::FromStr;

use crate::error::{StateError, StateResult};

/// Parsed state path. The empty string is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: String,
    segments: Vec<String>,
}

impl StatePath {
    /// Parse a dot-delimited path; empty segments are rejected
    pub fn parse(raw: &str) -> StateResult<Self> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty() || s == "*") {
            return Err(StateError::InvalidPath(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The whole tree
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            segments: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Strict ancestry: `game` is an ancestor of `game.credits`, not of itself
    pub fn is_ancestor_of(&self, other: &StatePath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// `self == other` or one contains the other
    pub fn overlaps(&self, other: &StatePath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    /// Child path
    pub fn join(&self, segment: &str) -> StateResult<Self> {
        if self.is_root() {
            Self::parse(segment)
        } else {
            Self::parse(&format!("{}.{}", self.raw, segment))
        }
    }
}

impl FromStr for StatePath {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
