//! Per-parent sequence numbers and the generated codes built from them.

use rusqlite::{Connection, OptionalExtension as _};

use outcomes_core::curriculum::{CourseId, InstitutionId, ProgramId};

/// The row whose children share one `sequence_num` series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceParent {
  Institution(InstitutionId),
  Program(ProgramId),
  Course(CourseId),
}

impl SequenceParent {
  /// `(table, parent column, code column, parent id)`.
  fn target(self) -> (&'static str, &'static str, &'static str, i64) {
    match self {
      Self::Institution(id) => {
        ("institutional_outcomes", "institution_fk", "islo_code", id)
      }
      Self::Program(id) => {
        ("program_outcomes", "program_fk", "outcome_code", id)
      }
      Self::Course(id) => {
        ("student_learning_outcomes", "course_fk", "slo_code", id)
      }
    }
  }
}

/// `MAX(sequence_num) + 1` among the parent's children, or `1` when it has
/// none.
///
/// Must be called on the same connection, inside the same transaction, as
/// the insert that uses the result.
pub fn next_sequence(
  conn: &Connection,
  parent: SequenceParent,
) -> rusqlite::Result<i64> {
  let (table, column, _, id) = parent.target();
  let max: i64 = conn.query_row(
    &format!("SELECT COALESCE(MAX(sequence_num), 0) FROM {table} WHERE {column} = ?1"),
    [id],
    |r| r.get(0),
  )?;
  Ok(max + 1)
}

/// Allocate the next sequence number together with a code produced by
/// `make_code` that no sibling uses yet.
///
/// Starts at [`next_sequence`]; when a hand-assigned code already occupies
/// that slot, moves on to the following number.
pub fn allocate_code(
  conn: &Connection,
  parent: SequenceParent,
  make_code: impl Fn(i64) -> String,
) -> rusqlite::Result<(i64, String)> {
  let (table, column, code_column, id) = parent.target();
  let taken_sql =
    format!("SELECT 1 FROM {table} WHERE {column} = ?1 AND {code_column} = ?2");

  let mut n = next_sequence(conn, parent)?;
  loop {
    let code = make_code(n);
    let taken = conn
      .query_row(&taken_sql, rusqlite::params![id, code], |_| Ok(()))
      .optional()?
      .is_some();
    if !taken {
      return Ok((n, code));
    }
    n += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch(
        "CREATE TABLE student_learning_outcomes (
           course_fk INTEGER, slo_code TEXT, sequence_num INTEGER
         );",
      )
      .unwrap();
    conn
  }

  #[test]
  fn empty_parent_starts_at_one() {
    let conn = conn();
    assert_eq!(next_sequence(&conn, SequenceParent::Course(7)).unwrap(), 1);
  }

  #[test]
  fn follows_the_highest_sibling_only() {
    let conn = conn();
    conn
      .execute_batch(
        "INSERT INTO student_learning_outcomes VALUES (7, 'A', 1), (7, 'B', 4),
                                                      (8, 'C', 9);",
      )
      .unwrap();
    assert_eq!(next_sequence(&conn, SequenceParent::Course(7)).unwrap(), 5);
  }

  #[test]
  fn allocated_code_skips_hand_assigned_collisions() {
    let conn = conn();
    conn
      .execute_batch(
        "INSERT INTO student_learning_outcomes VALUES (7, 'S-1', 1), (7, 'S-3', 2);",
      )
      .unwrap();
    let (n, code) =
      allocate_code(&conn, SequenceParent::Course(7), |n| format!("S-{n}"))
        .unwrap();
    assert_eq!((n, code.as_str()), (4, "S-4"));
  }
}
