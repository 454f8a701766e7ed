//! Core types for the patient flow simulation

use petgraph::graph::NodeIndex;
use std::fmt;

/// Identifier of a stage in the process graph
/// This is a thin wrapper around the petgraph node index for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageId(pub NodeIndex);

impl StageId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0.index())
    }
}

/// Identifier of a patient, assigned by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resource handed out by a capacity provider (a clinic, a bed pool, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resource(pub String);

impl Resource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Resource {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default number of days a simulation runs for
pub const DEFAULT_HORIZON: u32 = 300;

/// Default number of stages a single routing call may visit before giving up
pub const DEFAULT_HOP_LIMIT: usize = 10_000;

/// How far transition probabilities may drift from 1.0 and still count as a
/// complete weighted split
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;
