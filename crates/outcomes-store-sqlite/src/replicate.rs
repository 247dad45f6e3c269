//! Term replication: a deep copy of one term's curriculum graph into
//! another, inside a single transaction.
//!
//! Every level is written with an upsert keyed on its natural key in the
//! target term, so replaying a replication refreshes the rows it wrote the
//! first time instead of adding more. Section CRNs are globally unique and
//! cannot be copied; the target gets `{course}-{section}-T{target_term}`.

use rusqlite::Connection;
use tracing::{debug, info};

use outcomes_core::{
  curriculum::{
    Course, CourseSection, Program, ProgramId, ProgramOutcome, TermId,
  },
  summary::ReplicationSummary,
};

use crate::{
  Error, Result,
  encode::{
    COURSE_COLUMNS, PROGRAM_COLUMNS, PROGRAM_OUTCOME_COLUMNS, SECTION_COLUMNS,
    SLO_COLUMNS, Stamp, course_from_row, program_from_row,
    program_outcome_from_row, section_from_row, slo_from_row,
  },
  terms::require_term,
};

/// The CRN given to a copy of `section` (of course `course_number`) in
/// `target`.
pub fn replicated_crn(
  course_number: &str,
  section: &CourseSection,
  target: TermId,
) -> String {
  let part = section.section_number.as_deref().unwrap_or(&section.crn);
  format!("{course_number}-{part}-T{target}")
}

pub fn replicate_term(
  conn: &mut Connection,
  source: TermId,
  target: TermId,
  stamp: &Stamp,
) -> Result<ReplicationSummary> {
  if source == target {
    return Err(Error::SameTerm(source));
  }

  let tx = conn.transaction()?;
  require_term(&tx, source)?;
  require_term(&tx, target)?;
  info!(source, target, "replication started");

  let mut summary = ReplicationSummary::default();
  let mut copier = Copier { tx: &tx, target, stamp, summary: &mut summary };

  for program in load_programs(&tx, source)? {
    let copy = copier.program(&program)?;
    for outcome in query_all(
      &tx,
      &format!(
        "SELECT {PROGRAM_OUTCOME_COLUMNS} FROM program_outcomes
         WHERE program_fk = ?1 ORDER BY sequence_num, program_outcome_id"
      ),
      program.id,
      program_outcome_from_row,
    )? {
      copier.program_outcome(copy, &outcome)?;
    }
    for course in query_all(
      &tx,
      &format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE program_fk = ?1 ORDER BY course_id"
      ),
      program.id,
      course_from_row,
    )? {
      copier.course(Some(copy), &course)?;
    }
  }

  // Courses attached to the term but to no program.
  for course in query_all(
    &tx,
    &format!(
      "SELECT {COURSE_COLUMNS} FROM courses
       WHERE term_fk = ?1 AND program_fk IS NULL ORDER BY course_id"
    ),
    source,
    course_from_row,
  )? {
    copier.course(None, &course)?;
  }

  tx.commit()?;
  info!(
    source,
    target,
    programs = summary.programs,
    outcomes = summary.outcomes,
    courses = summary.courses,
    sections = summary.sections,
    slos = summary.slos,
    "replication finished"
  );
  Ok(summary)
}

fn load_programs(tx: &Connection, term: TermId) -> rusqlite::Result<Vec<Program>> {
  query_all(
    tx,
    &format!(
      "SELECT {PROGRAM_COLUMNS} FROM programs WHERE term_fk = ?1 ORDER BY program_id"
    ),
    term,
    program_from_row,
  )
}

fn query_all<T>(
  conn: &Connection,
  sql: &str,
  id: i64,
  map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map([id], map)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

// ─── Copier ──────────────────────────────────────────────────────────────────

struct Copier<'a> {
  tx:      &'a Connection,
  target:  TermId,
  stamp:   &'a Stamp,
  summary: &'a mut ReplicationSummary,
}

impl Copier<'_> {
  fn program(&mut self, program: &Program) -> rusqlite::Result<ProgramId> {
    let id = self.tx.query_row(
      "INSERT INTO programs (
         term_fk, program_code, program_name, degree_type, is_active,
         created_by, updated_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)
       ON CONFLICT (term_fk, program_code) DO UPDATE SET
         program_name = excluded.program_name,
         degree_type  = excluded.degree_type,
         is_active    = excluded.is_active,
         updated_by   = excluded.updated_by,
         updated_at   = excluded.updated_at
       RETURNING program_id",
      rusqlite::params![
        self.target,
        program.program_code,
        program.name,
        program.degree_type,
        program.is_active,
        self.stamp.by,
        self.stamp.at
      ],
      |r| r.get(0),
    )?;
    self.summary.programs += 1;
    debug!(from = program.id, to = id, code = %program.program_code, "program copied");
    Ok(id)
  }

  fn program_outcome(
    &mut self,
    program: ProgramId,
    outcome: &ProgramOutcome,
  ) -> rusqlite::Result<()> {
    self.tx.execute(
      "INSERT INTO program_outcomes (
         program_fk, islo_fk, outcome_code, description, sequence_num,
         is_active, created_by, updated_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?8)
       ON CONFLICT (program_fk, outcome_code) DO UPDATE SET
         islo_fk      = excluded.islo_fk,
         description  = excluded.description,
         sequence_num = excluded.sequence_num,
         is_active    = excluded.is_active,
         updated_by   = excluded.updated_by,
         updated_at   = excluded.updated_at",
      rusqlite::params![
        program,
        outcome.institutional_outcome_id,
        outcome.outcome_code,
        outcome.description,
        outcome.sequence_num,
        outcome.is_active,
        self.stamp.by,
        self.stamp.at
      ],
    )?;
    self.summary.outcomes += 1;
    Ok(())
  }

  fn course(
    &mut self,
    program: Option<ProgramId>,
    course: &Course,
  ) -> rusqlite::Result<()> {
    let id: i64 = self.tx.query_row(
      "INSERT INTO courses (
         program_fk, term_fk, course_number, course_name, is_active,
         created_by, updated_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)
       ON CONFLICT (term_fk, course_number) DO UPDATE SET
         program_fk  = excluded.program_fk,
         course_name = excluded.course_name,
         is_active   = excluded.is_active,
         updated_by  = excluded.updated_by,
         updated_at  = excluded.updated_at
       RETURNING course_id",
      rusqlite::params![
        program,
        self.target,
        course.course_number,
        course.name,
        course.is_active,
        self.stamp.by,
        self.stamp.at
      ],
      |r| r.get(0),
    )?;
    self.summary.courses += 1;

    for section in query_all(
      self.tx,
      &format!(
        "SELECT {SECTION_COLUMNS} FROM course_sections
         WHERE course_fk = ?1 ORDER BY section_id"
      ),
      course.id,
      section_from_row,
    )? {
      self.tx.execute(
        "INSERT INTO course_sections (
           course_fk, term_fk, crn, section_number, instructor, is_active,
           created_by, updated_by, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?8)
         ON CONFLICT (crn) DO UPDATE SET
           course_fk      = excluded.course_fk,
           term_fk        = excluded.term_fk,
           section_number = excluded.section_number,
           instructor     = excluded.instructor,
           is_active      = excluded.is_active,
           updated_by     = excluded.updated_by,
           updated_at     = excluded.updated_at",
        rusqlite::params![
          id,
          self.target,
          replicated_crn(&course.course_number, &section, self.target),
          section.section_number,
          section.instructor,
          section.is_active,
          self.stamp.by,
          self.stamp.at
        ],
      )?;
      self.summary.sections += 1;
    }

    for slo in query_all(
      self.tx,
      &format!(
        "SELECT {SLO_COLUMNS} FROM student_learning_outcomes
         WHERE course_fk = ?1 ORDER BY sequence_num, slo_id"
      ),
      course.id,
      slo_from_row,
    )? {
      self.tx.execute(
        "INSERT INTO student_learning_outcomes (
           course_fk, slo_code, description, sequence_num, is_active,
           created_by, updated_by, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)
         ON CONFLICT (course_fk, slo_code) DO UPDATE SET
           description  = excluded.description,
           sequence_num = excluded.sequence_num,
           is_active    = excluded.is_active,
           updated_by   = excluded.updated_by,
           updated_at   = excluded.updated_at",
        rusqlite::params![
          id,
          slo.slo_code,
          slo.description,
          slo.sequence_num,
          slo.is_active,
          self.stamp.by,
          self.stamp.at
        ],
      )?;
      self.summary.slos += 1;
    }
    Ok(())
  }
}
