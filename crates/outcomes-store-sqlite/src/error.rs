//! Error type for `outcomes-store-sqlite`.

use outcomes_core::{curriculum::TermId, summary::EntityRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] outcomes_core::Error),

  #[error("feed error: {0}")]
  Csv(#[from] outcomes_csv::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("term not found: {0}")]
  TermNotFound(TermId),

  #[error("a term with banner code {0:?} already exists")]
  DuplicateTerm(String),

  /// Replication source and target are the same term.
  #[error("cannot replicate term {0} onto itself")]
  SameTerm(TermId),

  /// The import kind needs a scope value the request did not carry.
  #[error("import requires a selected {0}")]
  MissingScope(&'static str),

  #[error("{0} not found")]
  NotFound(EntityRef),

  /// A delete or clear was refused because dependent rows still exist.
  #[error("cannot delete {entity}: {reason}")]
  HasDependents { entity: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
