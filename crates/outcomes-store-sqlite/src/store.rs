//! [`SqliteStore`]: the SQLite implementation of [`CurriculumStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use outcomes_core::{
  curriculum::{
    Course, CourseId, Institution, InstitutionalOutcome, NewTerm, Program,
    ProgramId, ProgramOutcome, Slo, Term, TermId,
  },
  import::{ImportReport, ImportRequest},
  roster::{Assessment, Enrollment, EnrollmentId, Student},
  store::CurriculumStore,
  summary::{ClearSummary, EntityRef, ReplicationSummary, TermCounts},
};

use crate::{
  Result,
  clear::{clear_term, delete_entity},
  encode::{
    ASSESSMENT_COLUMNS, COURSE_COLUMNS, ENROLLMENT_COLUMNS, INSTITUTION_COLUMNS,
    ISLO_COLUMNS, PROGRAM_COLUMNS, PROGRAM_OUTCOME_COLUMNS, SLO_COLUMNS,
    STUDENT_COLUMNS, Stamp, assessment_from_row, course_from_row,
    enrollment_from_row, institution_from_row, islo_from_row, program_from_row,
    program_outcome_from_row, slo_from_row, student_from_row,
  },
  ingest::run_import,
  replicate::replicate_term,
  schema::SCHEMA,
  terms,
};

/// Courses of a term: attached directly, or through one of its programs.
const TERM_COURSES: &str = "SELECT course_id FROM courses
   WHERE term_fk = ?1
      OR program_fk IN (SELECT program_id FROM programs WHERE term_fk = ?1)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An academic-outcomes store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL; lets tests install failure triggers and flip flags the
  /// public API does not expose.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// First column of every row of `sql`, as text.
  #[cfg(test)]
  pub(crate) async fn query_column(&self, sql: &'static str) -> Result<Vec<String>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(sql)?;
          let rows = stmt
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn query_list<T: Send + 'static>(
    &self,
    sql: String,
    id: i64,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
  ) -> Result<Vec<T>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map([id], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }
}

// ─── CurriculumStore impl ────────────────────────────────────────────────────

impl CurriculumStore for SqliteStore {
  type Error = crate::Error;

  // ── Terms ─────────────────────────────────────────────────────────────────

  async fn create_term(
    &self,
    input: NewTerm,
    acting_user: Option<String>,
  ) -> Result<Term> {
    let stamp = Stamp::now(acting_user);
    self
      .conn
      .call(move |conn| Ok(terms::create_term(conn, input, &stamp)))
      .await?
  }

  async fn get_term(&self, id: TermId) -> Result<Option<Term>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(terms::get_term(conn, id)?))
        .await?,
    )
  }

  async fn find_term(&self, banner_term: &str) -> Result<Option<Term>> {
    let banner_term = banner_term.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| Ok(terms::find_term(conn, &banner_term)?))
        .await?,
    )
  }

  async fn list_terms(&self) -> Result<Vec<Term>> {
    Ok(self.conn.call(|conn| Ok(terms::list_terms(conn)?)).await?)
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  async fn import(&self, request: ImportRequest) -> Result<ImportReport> {
    self
      .conn
      .call(move |conn| Ok(run_import(conn, request)))
      .await?
  }

  async fn replicate_term(
    &self,
    source: TermId,
    target: TermId,
    acting_user: Option<String>,
  ) -> Result<ReplicationSummary> {
    let stamp = Stamp::now(acting_user);
    self
      .conn
      .call(move |conn| Ok(replicate_term(conn, source, target, &stamp)))
      .await?
  }

  async fn clear_term(&self, term: TermId) -> Result<ClearSummary> {
    self
      .conn
      .call(move |conn| Ok(clear_term(conn, term)))
      .await?
  }

  async fn delete(&self, entity: EntityRef) -> Result<()> {
    self
      .conn
      .call(move |conn| Ok(delete_entity(conn, entity)))
      .await?
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn term_counts(&self, term: TermId) -> Result<TermCounts> {
    let counts = self
      .conn
      .call(move |conn| {
        let count = |sql: &str| -> rusqlite::Result<usize> {
          let n: i64 = conn.query_row(sql, [term], |r| r.get(0))?;
          Ok(n as usize)
        };
        Ok(TermCounts {
          programs: count("SELECT COUNT(*) FROM programs WHERE term_fk = ?1")?,
          outcomes: count(
            "SELECT COUNT(*) FROM program_outcomes WHERE program_fk IN
               (SELECT program_id FROM programs WHERE term_fk = ?1)",
          )?,
          courses:  count(&format!(
            "SELECT COUNT(*) FROM courses WHERE course_id IN ({TERM_COURSES})"
          ))?,
          sections: count(&format!(
            "SELECT COUNT(*) FROM course_sections WHERE course_fk IN ({TERM_COURSES})"
          ))?,
          slos:     count(&format!(
            "SELECT COUNT(*) FROM student_learning_outcomes
             WHERE course_fk IN ({TERM_COURSES})"
          ))?,
        })
      })
      .await?;
    Ok(counts)
  }

  async fn list_programs(&self, term: TermId) -> Result<Vec<Program>> {
    self
      .query_list(
        format!(
          "SELECT {PROGRAM_COLUMNS} FROM programs WHERE term_fk = ?1 ORDER BY program_code"
        ),
        term,
        program_from_row,
      )
      .await
  }

  async fn find_program(
    &self,
    term: TermId,
    program_code: &str,
  ) -> Result<Option<Program>> {
    let code = program_code.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT {PROGRAM_COLUMNS} FROM programs
                   WHERE term_fk = ?1 AND program_code = ?2"
                ),
                rusqlite::params![term, code],
                program_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_program_outcomes(
    &self,
    program: ProgramId,
  ) -> Result<Vec<ProgramOutcome>> {
    self
      .query_list(
        format!(
          "SELECT {PROGRAM_OUTCOME_COLUMNS} FROM program_outcomes
           WHERE program_fk = ?1 ORDER BY sequence_num, program_outcome_id"
        ),
        program,
        program_outcome_from_row,
      )
      .await
  }

  async fn find_institution(
    &self,
    institution_code: &str,
  ) -> Result<Option<Institution>> {
    let code = institution_code.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT {INSTITUTION_COLUMNS} FROM institutions
                   WHERE institution_code = ?1"
                ),
                [code],
                institution_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_institutional_outcomes(
    &self,
    institution_code: &str,
  ) -> Result<Vec<InstitutionalOutcome>> {
    let code = institution_code.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {ISLO_COLUMNS} FROM institutional_outcomes
             WHERE institution_fk =
               (SELECT institution_id FROM institutions WHERE institution_code = ?1)
             ORDER BY sequence_num, islo_id"
          ))?;
          let rows = stmt
            .query_map([code], islo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn find_course(
    &self,
    term: TermId,
    course_number: &str,
  ) -> Result<Option<Course>> {
    let number = course_number.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT {COURSE_COLUMNS} FROM courses
                   WHERE term_fk = ?1 AND course_number = ?2"
                ),
                rusqlite::params![term, number],
                course_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_slos(&self, course: CourseId) -> Result<Vec<Slo>> {
    self
      .query_list(
        format!(
          "SELECT {SLO_COLUMNS} FROM student_learning_outcomes
           WHERE course_fk = ?1 ORDER BY sequence_num, slo_id"
        ),
        course,
        slo_from_row,
      )
      .await
  }

  async fn find_student(&self, c_number: &str) -> Result<Option<Student>> {
    let c_number = c_number.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE c_number = ?1"),
                [c_number],
                student_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn find_enrollment(
    &self,
    term: TermId,
    crn: &str,
    c_number: &str,
  ) -> Result<Option<Enrollment>> {
    let crn = crn.to_owned();
    let c_number = c_number.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                   WHERE term_fk = ?1 AND crn = ?2 AND student_fk =
                     (SELECT student_id FROM students WHERE c_number = ?3)"
                ),
                rusqlite::params![term, crn, c_number],
                enrollment_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_assessments(
    &self,
    enrollment: EnrollmentId,
  ) -> Result<Vec<Assessment>> {
    self
      .query_list(
        format!(
          "SELECT {ASSESSMENT_COLUMNS} FROM assessments
           WHERE enrollment_fk = ?1 ORDER BY assessment_id"
        ),
        enrollment,
        assessment_from_row,
      )
      .await
  }
}
