//! Removing curriculum: whole-term clears and guarded single deletes.
//!
//! Both run in one transaction and delete leaves first, so foreign keys are
//! never violated mid-way. Assessments are never deleted here; any
//! assessment hanging off an affected SLO refuses the whole operation.
//! Enrollments survive with their section and course links set to NULL.

use rusqlite::{Connection, OptionalExtension as _};
use tracing::info;

use outcomes_core::{
  curriculum::{CourseId, ProgramId, SloId, TermId},
  summary::{ClearSummary, EntityRef},
};

use crate::{Error, Result, terms::require_term};

fn ids(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map([id], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<_>>>()
}

fn count(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<usize> {
  let n: i64 = conn.query_row(sql, [id], |r| r.get(0))?;
  Ok(n as usize)
}

/// Run the prepared `sql` once per id and total the affected rows.
fn delete_each(conn: &Connection, sql: &str, ids: &[i64]) -> rusqlite::Result<usize> {
  let mut stmt = conn.prepare(sql)?;
  let mut total = 0;
  for id in ids {
    total += stmt.execute([id])?;
  }
  Ok(total)
}

/// Assessments recorded against any SLO of `course`.
fn course_assessments(conn: &Connection, course: CourseId) -> rusqlite::Result<usize> {
  count(
    conn,
    "SELECT COUNT(*) FROM assessments a
     JOIN student_learning_outcomes s ON s.slo_id = a.slo_fk
     WHERE s.course_fk = ?1",
    course,
  )
}

// ─── Term clear ──────────────────────────────────────────────────────────────

pub fn clear_term(conn: &mut Connection, term: TermId) -> Result<ClearSummary> {
  let tx = conn.transaction()?;
  require_term(&tx, term)?;

  let programs = ids(
    &tx,
    "SELECT program_id FROM programs WHERE term_fk = ?1 ORDER BY program_id",
    term,
  )?;
  let courses = ids(
    &tx,
    "SELECT course_id FROM courses
     WHERE term_fk = ?1
        OR program_fk IN (SELECT program_id FROM programs WHERE term_fk = ?1)
     ORDER BY course_id",
    term,
  )?;
  if programs.is_empty() && courses.is_empty() {
    info!(term, "nothing to clear");
    return Ok(ClearSummary::default());
  }

  let mut assessed = 0;
  for &course in &courses {
    assessed += course_assessments(&tx, course)?;
  }
  if assessed > 0 {
    return Err(Error::HasDependents {
      entity: format!("term {term}"),
      reason: format!("{assessed} assessment(s) reference its outcomes"),
    });
  }

  info!(term, programs = programs.len(), courses = courses.len(), "clear started");
  let summary = ClearSummary {
    slos:     delete_each(
      &tx,
      "DELETE FROM student_learning_outcomes WHERE course_fk = ?1",
      &courses,
    )?,
    sections: delete_each(&tx, "DELETE FROM course_sections WHERE course_fk = ?1", &courses)?,
    courses:  delete_each(&tx, "DELETE FROM courses WHERE course_id = ?1", &courses)?,
    outcomes: delete_each(
      &tx,
      "DELETE FROM program_outcomes WHERE program_fk = ?1",
      &programs,
    )?,
    programs: delete_each(&tx, "DELETE FROM programs WHERE program_id = ?1", &programs)?,
  };
  tx.commit()?;

  info!(
    term,
    programs = summary.programs,
    outcomes = summary.outcomes,
    courses = summary.courses,
    sections = summary.sections,
    slos = summary.slos,
    "clear finished"
  );
  Ok(summary)
}

// ─── Guarded deletes ─────────────────────────────────────────────────────────

pub fn delete_entity(conn: &mut Connection, entity: EntityRef) -> Result<()> {
  let tx = conn.transaction()?;
  match entity {
    EntityRef::Program(id) => delete_program(&tx, id)?,
    EntityRef::Course(id) => delete_course(&tx, id)?,
    EntityRef::Slo(id) => delete_slo(&tx, id)?,
  }
  tx.commit()?;
  info!(%entity, "deleted");
  Ok(())
}

fn exists(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

fn refuse(entity: EntityRef, reason: String) -> Error {
  Error::HasDependents { entity: entity.to_string(), reason }
}

fn delete_program(conn: &Connection, id: ProgramId) -> Result<()> {
  let entity = EntityRef::Program(id);
  if !exists(conn, "SELECT 1 FROM programs WHERE program_id = ?1", id)? {
    return Err(Error::NotFound(entity));
  }
  let outcomes = count(
    conn,
    "SELECT COUNT(*) FROM program_outcomes WHERE program_fk = ?1",
    id,
  )?;
  if outcomes > 0 {
    return Err(refuse(entity, format!("it has {outcomes} outcome(s)")));
  }
  let courses = count(conn, "SELECT COUNT(*) FROM courses WHERE program_fk = ?1", id)?;
  if courses > 0 {
    return Err(refuse(entity, format!("it has {courses} course(s)")));
  }
  conn.execute("DELETE FROM programs WHERE program_id = ?1", [id])?;
  Ok(())
}

/// Delete a course with its sections and SLOs, unless any of those SLOs has
/// been assessed.
fn delete_course(conn: &Connection, id: CourseId) -> Result<()> {
  let entity = EntityRef::Course(id);
  if !exists(conn, "SELECT 1 FROM courses WHERE course_id = ?1", id)? {
    return Err(Error::NotFound(entity));
  }
  let assessed = course_assessments(conn, id)?;
  if assessed > 0 {
    return Err(refuse(
      entity,
      format!("{assessed} assessment(s) reference its outcomes"),
    ));
  }
  conn.execute("DELETE FROM student_learning_outcomes WHERE course_fk = ?1", [id])?;
  conn.execute("DELETE FROM course_sections WHERE course_fk = ?1", [id])?;
  conn.execute("DELETE FROM courses WHERE course_id = ?1", [id])?;
  Ok(())
}

fn delete_slo(conn: &Connection, id: SloId) -> Result<()> {
  let entity = EntityRef::Slo(id);
  if !exists(conn, "SELECT 1 FROM student_learning_outcomes WHERE slo_id = ?1", id)? {
    return Err(Error::NotFound(entity));
  }
  let assessed = count(conn, "SELECT COUNT(*) FROM assessments WHERE slo_fk = ?1", id)?;
  if assessed > 0 {
    return Err(refuse(entity, format!("it has {assessed} assessment(s)")));
  }
  conn.execute("DELETE FROM student_learning_outcomes WHERE slo_id = ?1", [id])?;
  Ok(())
}
