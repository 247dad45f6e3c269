//! Term rows: creation, lookup, and the existence check shared by the
//! engines.

use rusqlite::{Connection, OptionalExtension as _};

use outcomes_core::curriculum::{NewTerm, Term, TermId};

use crate::{
  Error, Result,
  encode::{Stamp, TERM_COLUMNS, term_from_row},
};

pub fn create_term(conn: &Connection, input: NewTerm, stamp: &Stamp) -> Result<Term> {
  let banner_term = input.banner_term.trim().to_owned();
  if find_term(conn, &banner_term)?.is_some() {
    return Err(Error::DuplicateTerm(banner_term));
  }
  conn.execute(
    "INSERT INTO terms (banner_term, academic_year, term_name, is_active,
                        created_by, updated_by, created_at, updated_at)
     VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5, ?5)",
    rusqlite::params![
      banner_term,
      input.academic_year,
      input.name,
      stamp.by,
      stamp.at
    ],
  )?;
  Ok(Term {
    id: conn.last_insert_rowid(),
    banner_term,
    academic_year: input.academic_year,
    name: input.name,
    is_active: true,
  })
}

pub fn get_term(conn: &Connection, id: TermId) -> rusqlite::Result<Option<Term>> {
  conn
    .query_row(
      &format!("SELECT {TERM_COLUMNS} FROM terms WHERE term_id = ?1"),
      [id],
      term_from_row,
    )
    .optional()
}

pub fn find_term(
  conn: &Connection,
  banner_term: &str,
) -> rusqlite::Result<Option<Term>> {
  conn
    .query_row(
      &format!("SELECT {TERM_COLUMNS} FROM terms WHERE banner_term = ?1"),
      [banner_term],
      term_from_row,
    )
    .optional()
}

pub fn list_terms(conn: &Connection) -> rusqlite::Result<Vec<Term>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TERM_COLUMNS} FROM terms ORDER BY banner_term"
  ))?;
  stmt
    .query_map([], term_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

/// Fail with [`Error::TermNotFound`] unless `id` names a term.
pub fn require_term(conn: &Connection, id: TermId) -> Result<()> {
  let exists = conn
    .query_row("SELECT 1 FROM terms WHERE term_id = ?1", [id], |_| Ok(()))
    .optional()?
    .is_some();
  if exists { Ok(()) } else { Err(Error::TermNotFound(id)) }
}
