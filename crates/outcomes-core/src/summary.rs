//! Result types for the term-level engines and guarded deletes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  curriculum::{CourseId, ProgramId, SloId},
};

/// Per-level row counts upserted by a term replication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSummary {
  pub programs: usize,
  pub outcomes: usize,
  pub courses:  usize,
  pub sections: usize,
  pub slos:     usize,
}

/// Per-level row counts removed by a term clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearSummary {
  pub programs: usize,
  pub outcomes: usize,
  pub courses:  usize,
  pub sections: usize,
  pub slos:     usize,
}

/// How many rows of each level currently hang off a term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCounts {
  pub programs: usize,
  pub outcomes: usize,
  pub courses:  usize,
  pub sections: usize,
  pub slos:     usize,
}

impl TermCounts {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

/// A reference to a deletable curriculum row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
  Program(ProgramId),
  Course(CourseId),
  Slo(SloId),
}

impl EntityRef {
  /// Build a reference from a kind name (`program`, `course`, `slo`).
  pub fn parse(kind: &str, id: i64) -> Result<Self> {
    match kind.trim().to_ascii_lowercase().as_str() {
      "program" => Ok(Self::Program(id)),
      "course" => Ok(Self::Course(id)),
      "slo" | "cslo" => Ok(Self::Slo(id)),
      other => Err(Error::UnknownEntityKind(other.to_owned())),
    }
  }
}

impl fmt::Display for EntityRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Program(id) => write!(f, "program {id}"),
      Self::Course(id) => write!(f, "course {id}"),
      Self::Slo(id) => write!(f, "SLO {id}"),
    }
  }
}
