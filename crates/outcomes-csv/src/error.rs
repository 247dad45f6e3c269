//! Error types for the outcomes-csv codec.
//!
//! Every variant here is fatal for the whole feed. Row-level problems are
//! [`RowProblem`](crate::RowProblem)s and never surface as an `Error`.

use outcomes_core::import::ImportKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read upload: {0}")]
  Io(#[from] std::io::Error),

  #[error("upload is not valid UTF-8 (first bad byte at offset {offset})")]
  Encoding { offset: usize },

  #[error("upload is empty; expected a header row")]
  EmptyInput,

  #[error("{kind} header is missing required column(s): {}", missing.join(", "))]
  MissingColumns {
    kind:    ImportKind,
    missing: Vec<&'static str>,
  },

  #[error("quoted field starting on line {line} is never closed")]
  UnterminatedQuote { line: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
