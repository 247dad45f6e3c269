//! Error types for `outcomes-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown import kind: {0:?}")]
  UnknownImportKind(String),

  #[error("unknown entity kind: {0:?}")]
  UnknownEntityKind(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
