//! The CSV ingestion pipeline.
//!
//! A feed is parsed up front by `outcomes-csv`; only input-level problems
//! abort the run. Each decoded row is then applied inside its own savepoint:
//! a row either lands completely or not at all, and a failing row never
//! undoes the rows before it.

use rusqlite::{Connection, OptionalExtension as _, Savepoint};
use tracing::{debug, info, warn};

use outcomes_core::{
  curriculum::{CourseId, ProgramId, TermId},
  import::{ImportReport, ImportRequest, ReportBuilder},
  roster::StudentId,
};
use outcomes_csv::{
  AssessmentRow, CourseRow, CsloRow, EnrollmentRow, FeedLine, ImportRow,
  IsloRow, ProgramOutcomeRow, PsloRow, SectionRow, SloRow, parse_feed,
};

use crate::{
  Error, Result,
  encode::Stamp,
  resolver::{ProgramFallback, Resolver},
  sequence::{SequenceParent, allocate_code, next_sequence},
  terms::require_term,
};

/// Institution used for ISLO rows when the request names none.
pub const DEFAULT_INSTITUTION: &str = "DEFAULT";

// ─── Row outcomes ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
  imported:   usize,
  updated:    usize,
  duplicates: usize,
}

impl Tally {
  fn add_to(self, report: &mut ReportBuilder) {
    report.add(self.imported, self.updated, self.duplicates);
  }
}

/// What applying one row did. Database failures travel separately as `Err`.
#[derive(Debug)]
enum RowOutcome {
  Applied(Tally),
  /// A business rule refused the row; its writes are rolled back.
  Rejected(String),
}

impl RowOutcome {
  fn imported() -> Self {
    Self::Applied(Tally { imported: 1, ..Default::default() })
  }

  fn duplicate() -> Self {
    Self::Applied(Tally { duplicates: 1, ..Default::default() })
  }

  /// `updated` when the merge changed something, `duplicate` otherwise.
  fn merged(changed: bool) -> Self {
    if changed {
      Self::Applied(Tally { updated: 1, ..Default::default() })
    } else {
      Self::duplicate()
    }
  }

  fn rejected(reason: impl Into<String>) -> Self { Self::Rejected(reason.into()) }
}

type RowResult = rusqlite::Result<RowOutcome>;

// ─── Entry point ─────────────────────────────────────────────────────────────

pub fn run_import(conn: &mut Connection, request: ImportRequest) -> Result<ImportReport> {
  let ImportRequest { kind, scope, data } = request;
  let feed = parse_feed(kind, &data)?;

  let term = match scope.term_id {
    Some(id) => {
      require_term(conn, id)?;
      Some(id)
    }
    None if kind.requires_term() => return Err(Error::MissingScope("term")),
    None => None,
  };

  let stamp = Stamp::now(scope.acting_user.clone());
  let mut importer = Importer {
    term,
    institution_code: scope
      .institution_code
      .filter(|c| !c.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_INSTITUTION.to_owned()),
    resolver: Resolver::new(stamp.clone()),
    stamp,
  };
  let mut report = ReportBuilder::new(kind, scope.max_messages);
  info!(%kind, rows = feed.lines.len(), term_id = ?term, "import started");

  for FeedLine { line, row } in feed.lines {
    let row = match row {
      Ok(row) => row,
      Err(problem) => {
        debug!(line, %problem, "row skipped");
        report.skip(line, problem);
        continue;
      }
    };

    let sp = conn.savepoint()?;
    match importer.apply(&sp, row) {
      Ok(RowOutcome::Applied(tally)) => {
        sp.commit()?;
        importer.resolver.commit_row();
        tally.add_to(&mut report);
      }
      Ok(RowOutcome::Rejected(reason)) => {
        roll_back(sp)?;
        importer.resolver.discard_row();
        debug!(line, %reason, "row rejected");
        report.skip(line, reason);
      }
      Err(e) => {
        roll_back(sp)?;
        importer.resolver.discard_row();
        warn!(line, error = %e, "row rolled back");
        report.skip(line, format!("database error: {e}"));
      }
    }
  }

  let report = report.finish();
  info!(
    %kind,
    imported = report.imported,
    updated = report.updated,
    skipped = report.skipped,
    duplicates = report.duplicates,
    "import finished"
  );
  Ok(report)
}

fn roll_back(mut sp: Savepoint<'_>) -> rusqlite::Result<()> {
  // ROLLBACK TO leaves the savepoint open; commit releases it.
  sp.rollback()?;
  sp.commit()
}

// ─── Importer ────────────────────────────────────────────────────────────────

struct Importer {
  term:             Option<TermId>,
  institution_code: String,
  stamp:            Stamp,
  resolver:         Resolver,
}

impl Importer {
  fn apply(&mut self, conn: &Connection, row: ImportRow) -> RowResult {
    match row {
      ImportRow::Islo(row) => self.islo(conn, row),
      ImportRow::Pslo(row) => self.pslo(conn, row),
      ImportRow::Cslo(row) => self.cslo(conn, row),
      ImportRow::Course(row) => self.course(conn, row),
      ImportRow::Section(row) => self.section(conn, row),
      ImportRow::Slo(row) => self.slo(conn, row),
      ImportRow::ProgramOutcome(row) => self.program_outcome(conn, row),
      ImportRow::Enrollment(row) => self.enrollment(conn, row),
      ImportRow::Assessment(row) => self.assessment(conn, row),
    }
  }

  // ── Outcomes ──────────────────────────────────────────────────────────

  fn islo(&mut self, conn: &Connection, row: IsloRow) -> RowResult {
    let institution = self
      .resolver
      .institution_or_create(conn, &self.institution_code)?
      .id;
    if description_exists(
      conn,
      "institutional_outcomes",
      "institution_fk",
      institution,
      &row.description,
    )? {
      return Ok(RowOutcome::duplicate());
    }

    let (seq, code) =
      allocate_code(conn, SequenceParent::Institution(institution), |n| {
        format!("ISLO-{n}")
      })?;
    conn.execute(
      "INSERT INTO institutional_outcomes (
         institution_fk, islo_code, description, sequence_num, is_active,
         created_by, updated_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5, ?6, ?6)",
      rusqlite::params![
        institution,
        code,
        row.description,
        seq,
        self.stamp.by,
        self.stamp.at
      ],
    )?;
    Ok(RowOutcome::imported())
  }

  fn pslo(&mut self, conn: &Connection, row: PsloRow) -> RowResult {
    let Some(term) = self.term else {
      return Ok(RowOutcome::rejected("no term selected"));
    };
    let Some(program) = self.resolver.program(
      conn,
      term,
      row.program_code.as_deref(),
      row.program_name.as_deref(),
      ProgramFallback::FuzzyOrCreate,
    )?
    else {
      return Ok(RowOutcome::rejected("missing program code or name"));
    };
    let program = program.id;

    if let Some(code) = &row.outcome_code {
      return self.upsert_program_outcome(
        conn,
        program,
        code,
        Some(&row.description),
        None,
      );
    }

    if description_exists(
      conn,
      "program_outcomes",
      "program_fk",
      program,
      &row.description,
    )? {
      return Ok(RowOutcome::duplicate());
    }
    let (seq, code) = allocate_code(conn, SequenceParent::Program(program), |n| {
      format!("PSLO-P{program}-{n}")
    })?;
    self.insert_program_outcome(conn, program, None, &code, &row.description, seq)?;
    Ok(RowOutcome::imported())
  }

  fn cslo(&mut self, conn: &Connection, row: CsloRow) -> RowResult {
    let Some(term) = self.term else {
      return Ok(RowOutcome::rejected("no term selected"));
    };
    let course = self.resolver.course_or_create(
      conn,
      term,
      &row.course_number,
      row.course_title.as_deref(),
    )?;
    if !course.created
      && let Some(title) = &row.course_title
    {
      // Courses created from a bare number carry it as their name.
      conn.execute(
        "UPDATE courses SET course_name = ?2, updated_by = ?3, updated_at = ?4
         WHERE course_id = ?1 AND course_name = course_number",
        rusqlite::params![course.id, title, self.stamp.by, self.stamp.at],
      )?;
    }

    let mut tally = Tally::default();
    for text in &row.outcomes {
      if description_exists(
        conn,
        "student_learning_outcomes",
        "course_fk",
        course.id,
        text,
      )? {
        debug!(course = %row.course_number, outcome = %text, "duplicate outcome");
        tally.duplicates += 1;
        continue;
      }
      let (seq, code) = allocate_code(conn, SequenceParent::Course(course.id), |n| {
        format!("CSLO-{}-{n}", row.course_number)
      })?;
      self.insert_slo(conn, course.id, &code, text, seq, true)?;
      tally.imported += 1;
    }
    Ok(RowOutcome::Applied(tally))
  }

  fn program_outcome(&mut self, conn: &Connection, row: ProgramOutcomeRow) -> RowResult {
    let Some(term) = self.term else {
      return Ok(RowOutcome::rejected("no term selected"));
    };
    let Some(program) = self.resolver.program(
      conn,
      term,
      Some(&row.program_code),
      None,
      ProgramFallback::ExactOnly,
    )?
    else {
      return Ok(RowOutcome::rejected(format!(
        "unknown program {}",
        row.program_code
      )));
    };

    let islo = match &row.islo_code {
      None => None,
      Some(code) => {
        let found: Option<i64> = conn
          .query_row(
            "SELECT io.islo_id FROM institutional_outcomes io
             JOIN institutions i ON i.institution_id = io.institution_fk
             WHERE i.institution_code = ?1 AND io.islo_code = ?2",
            rusqlite::params![self.institution_code, code],
            |r| r.get(0),
          )
          .optional()?;
        match found {
          Some(id) => Some(id),
          None => {
            return Ok(RowOutcome::rejected(format!(
              "unknown institutional outcome {code}"
            )));
          }
        }
      }
    };

    self.upsert_program_outcome(
      conn,
      program.id,
      &row.outcome_code,
      row.description.as_deref(),
      islo,
    )
  }

  fn upsert_program_outcome(
    &self,
    conn: &Connection,
    program: ProgramId,
    code: &str,
    description: Option<&str>,
    islo: Option<i64>,
  ) -> RowResult {
    let existing: Option<(i64, String, Option<i64>)> = conn
      .query_row(
        "SELECT program_outcome_id, description, islo_fk FROM program_outcomes
         WHERE program_fk = ?1 AND outcome_code = ?2",
        rusqlite::params![program, code],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
      )
      .optional()?;

    match existing {
      Some((id, old_description, old_islo)) => {
        let new_description = description.unwrap_or(&old_description);
        let new_islo = islo.or(old_islo);
        let changed = new_description != old_description || new_islo != old_islo;
        if changed {
          conn.execute(
            "UPDATE program_outcomes
             SET description = ?2, islo_fk = ?3, updated_by = ?4, updated_at = ?5
             WHERE program_outcome_id = ?1",
            rusqlite::params![
              id,
              new_description,
              new_islo,
              self.stamp.by,
              self.stamp.at
            ],
          )?;
        }
        Ok(RowOutcome::merged(changed))
      }
      None => {
        let Some(description) = description else {
          return Ok(RowOutcome::rejected(format!(
            "missing description for new outcome {code}"
          )));
        };
        let seq = next_sequence(conn, SequenceParent::Program(program))?;
        self.insert_program_outcome(conn, program, islo, code, description, seq)?;
        Ok(RowOutcome::imported())
      }
    }
  }

  fn insert_program_outcome(
    &self,
    conn: &Connection,
    program: ProgramId,
    islo: Option<i64>,
    code: &str,
    description: &str,
    seq: i64,
  ) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO program_outcomes (
         program_fk, islo_fk, outcome_code, description, sequence_num,
         is_active, created_by, updated_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6, ?7, ?7)",
      rusqlite::params![
        program,
        islo,
        code,
        description,
        seq,
        self.stamp.by,
        self.stamp.at
      ],
    )?;
    Ok(())
  }

  // ── Curriculum ────────────────────────────────────────────────────────

  fn course(&mut self, conn: &Connection, row: CourseRow) -> RowResult {
    let Some(term) = self.term else {
      return Ok(RowOutcome::rejected("no term selected"));
    };
    let program = match &row.program_code {
      None => None,
      Some(code) => match self.resolver.program(
        conn,
        term,
        Some(code),
        None,
        ProgramFallback::ExactOnly,
      )? {
        Some(p) => Some(p.id),
        None => {
          return Ok(RowOutcome::rejected(format!("unknown program {code}")));
        }
      },
    };

    let existing: Option<(CourseId, Option<ProgramId>, String, bool)> = conn
      .query_row(
        "SELECT course_id, program_fk, course_name, is_active FROM courses
         WHERE term_fk = ?1 AND course_number = ?2",
        rusqlite::params![term, row.course_number],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
      )
      .optional()?;

    match existing {
      Some((id, old_program, old_name, old_active)) => {
        let new_program = program.or(old_program);
        let new_name = row.course_name.as_deref().unwrap_or(&old_name);
        let new_active = row.active.unwrap_or(old_active);
        let changed = new_program != old_program
          || new_name != old_name
          || new_active != old_active;
        if changed {
          conn.execute(
            "UPDATE courses
             SET program_fk = ?2, course_name = ?3, is_active = ?4,
                 updated_by = ?5, updated_at = ?6
             WHERE course_id = ?1",
            rusqlite::params![
              id,
              new_program,
              new_name,
              new_active,
              self.stamp.by,
              self.stamp.at
            ],
          )?;
        }
        Ok(RowOutcome::merged(changed))
      }
      None => {
        conn.execute(
          "INSERT INTO courses (
             program_fk, term_fk, course_number, course_name, is_active,
             created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)",
          rusqlite::params![
            program,
            term,
            row.course_number,
            row.course_name.as_deref().unwrap_or(&row.course_number),
            row.active.unwrap_or(true),
            self.stamp.by,
            self.stamp.at
          ],
        )?;
        Ok(RowOutcome::imported())
      }
    }
  }

  fn section(&mut self, conn: &Connection, row: SectionRow) -> RowResult {
    let Some(term) = self.term else {
      return Ok(RowOutcome::rejected("no term selected"));
    };
    let Some(course) = self.resolver.course(conn, term, &row.course_number)? else {
      return Ok(RowOutcome::rejected(format!(
        "unknown course {}",
        row.course_number
      )));
    };

    type Existing = (i64, CourseId, Option<TermId>, Option<String>, Option<String>, bool);
    let existing: Option<Existing> = conn
      .query_row(
        "SELECT section_id, course_fk, term_fk, section_number, instructor, is_active
         FROM course_sections WHERE crn = ?1",
        [&row.crn],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)),
      )
      .optional()?;

    match existing {
      Some((id, old_course, old_term, old_number, old_instructor, old_active)) => {
        let new_number = row.section_number.or(old_number.clone());
        let new_instructor = row.instructor.or(old_instructor.clone());
        let new_active = row.active.unwrap_or(old_active);
        let changed = course != old_course
          || Some(term) != old_term
          || new_number != old_number
          || new_instructor != old_instructor
          || new_active != old_active;
        if changed {
          conn.execute(
            "UPDATE course_sections
             SET course_fk = ?2, term_fk = ?3, section_number = ?4,
                 instructor = ?5, is_active = ?6, updated_by = ?7, updated_at = ?8
             WHERE section_id = ?1",
            rusqlite::params![
              id,
              course,
              term,
              new_number,
              new_instructor,
              new_active,
              self.stamp.by,
              self.stamp.at
            ],
          )?;
        }
        Ok(RowOutcome::merged(changed))
      }
      None => {
        conn.execute(
          "INSERT INTO course_sections (
             course_fk, term_fk, crn, section_number, instructor, is_active,
             created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?8)",
          rusqlite::params![
            course,
            term,
            row.crn,
            row.section_number,
            row.instructor,
            row.active.unwrap_or(true),
            self.stamp.by,
            self.stamp.at
          ],
        )?;
        Ok(RowOutcome::imported())
      }
    }
  }

  fn slo(&mut self, conn: &Connection, row: SloRow) -> RowResult {
    let Some(term) = self.term else {
      return Ok(RowOutcome::rejected("no term selected"));
    };
    let Some(course) = self.resolver.course(conn, term, &row.course_number)? else {
      return Ok(RowOutcome::rejected(format!(
        "unknown course {}",
        row.course_number
      )));
    };

    let existing: Option<(i64, String, bool)> = conn
      .query_row(
        "SELECT slo_id, description, is_active FROM student_learning_outcomes
         WHERE course_fk = ?1 AND slo_code = ?2",
        rusqlite::params![course, row.slo_code],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
      )
      .optional()?;

    match existing {
      Some((id, old_description, old_active)) => {
        let new_description =
          row.description.as_deref().unwrap_or(&old_description);
        let new_active = row.active.unwrap_or(old_active);
        let changed = new_description != old_description || new_active != old_active;
        if changed {
          conn.execute(
            "UPDATE student_learning_outcomes
             SET description = ?2, is_active = ?3, updated_by = ?4, updated_at = ?5
             WHERE slo_id = ?1",
            rusqlite::params![
              id,
              new_description,
              new_active,
              self.stamp.by,
              self.stamp.at
            ],
          )?;
        }
        Ok(RowOutcome::merged(changed))
      }
      None => {
        let Some(description) = &row.description else {
          return Ok(RowOutcome::rejected(format!(
            "missing description for new outcome {}",
            row.slo_code
          )));
        };
        let seq = next_sequence(conn, SequenceParent::Course(course))?;
        self.insert_slo(
          conn,
          course,
          &row.slo_code,
          description,
          seq,
          row.active.unwrap_or(true),
        )?;
        Ok(RowOutcome::imported())
      }
    }
  }

  fn insert_slo(
    &self,
    conn: &Connection,
    course: CourseId,
    code: &str,
    description: &str,
    seq: i64,
    active: bool,
  ) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO student_learning_outcomes (
         course_fk, slo_code, description, sequence_num, is_active,
         created_by, updated_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)",
      rusqlite::params![
        course,
        code,
        description,
        seq,
        active,
        self.stamp.by,
        self.stamp.at
      ],
    )?;
    Ok(())
  }

  // ── Roster ────────────────────────────────────────────────────────────

  fn enrollment(&mut self, conn: &Connection, row: EnrollmentRow) -> RowResult {
    let term = match (&row.banner_term, self.term) {
      (Some(banner), _) => {
        self
          .resolver
          .term_or_create(conn, banner, row.term_code.as_deref())?
          .id
      }
      (None, Some(term)) => term,
      (None, None) => {
        return Ok(RowOutcome::rejected(
          "missing BannerTerm and no term selected",
        ));
      }
    };

    let student = self.resolver.student_or_create(
      conn,
      &row.student_id,
      row.first_name.as_deref(),
      row.last_name.as_deref(),
    )?;
    let mut changed = !student.created
      && self.merge_student_names(
        conn,
        student.id,
        row.first_name.as_deref(),
        row.last_name.as_deref(),
      )?;

    let section: Option<(i64, CourseId)> = conn
      .query_row(
        "SELECT section_id, course_fk FROM course_sections
         WHERE crn = ?1 AND term_fk = ?2",
        rusqlite::params![row.crn, term],
        |r| Ok((r.get(0)?, r.get(1)?)),
      )
      .optional()?;
    let course = match (section, &row.course_number) {
      (Some((_, course)), _) => Some(course),
      (None, Some(number)) => self.resolver.course(conn, term, number)?,
      (None, None) => None,
    };
    let section = section.map(|(id, _)| id);

    type Existing = (i64, Option<i64>, Option<CourseId>, Option<String>, Option<String>);
    let existing: Option<Existing> = conn
      .query_row(
        "SELECT enrollment_id, section_fk, course_fk, part_of_term, discipline
         FROM enrollments WHERE term_fk = ?1 AND crn = ?2 AND student_fk = ?3",
        rusqlite::params![term, row.crn, student.id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
      )
      .optional()?;

    match existing {
      Some((id, old_section, old_course, old_part, old_discipline)) => {
        let new_section = section.or(old_section);
        let new_course = course.or(old_course);
        let new_part = row.part_of_term.or(old_part.clone());
        let new_discipline = row.discipline.or(old_discipline.clone());
        let enrollment_changed = new_section != old_section
          || new_course != old_course
          || new_part != old_part
          || new_discipline != old_discipline;
        if enrollment_changed {
          conn.execute(
            "UPDATE enrollments
             SET section_fk = ?2, course_fk = ?3, part_of_term = ?4,
                 discipline = ?5, updated_by = ?6, updated_at = ?7
             WHERE enrollment_id = ?1",
            rusqlite::params![
              id,
              new_section,
              new_course,
              new_part,
              new_discipline,
              self.stamp.by,
              self.stamp.at
            ],
          )?;
        }
        changed |= enrollment_changed;
        Ok(RowOutcome::merged(changed))
      }
      None => {
        conn.execute(
          "INSERT INTO enrollments (
             term_fk, crn, student_fk, section_fk, course_fk, part_of_term,
             discipline, created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9, ?9)",
          rusqlite::params![
            term,
            row.crn,
            student.id,
            section,
            course,
            row.part_of_term,
            row.discipline,
            self.stamp.by,
            self.stamp.at
          ],
        )?;
        Ok(RowOutcome::imported())
      }
    }
  }

  /// Overwrite name fields only with non-blank incoming values. Returns
  /// whether anything changed.
  fn merge_student_names(
    &self,
    conn: &Connection,
    student: StudentId,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> rusqlite::Result<bool> {
    let (old_first, old_last): (Option<String>, Option<String>) = conn.query_row(
      "SELECT first_name, last_name FROM students WHERE student_id = ?1",
      [student],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let new_first = first_name.or(old_first.as_deref());
    let new_last = last_name.or(old_last.as_deref());
    if new_first == old_first.as_deref() && new_last == old_last.as_deref() {
      return Ok(false);
    }
    conn.execute(
      "UPDATE students
       SET first_name = ?2, last_name = ?3, updated_by = ?4, updated_at = ?5
       WHERE student_id = ?1",
      rusqlite::params![student, new_first, new_last, self.stamp.by, self.stamp.at],
    )?;
    Ok(true)
  }

  fn assessment(&mut self, conn: &Connection, row: AssessmentRow) -> RowResult {
    let term = match (&row.banner_term, self.term) {
      (Some(banner), _) => match self.resolver.term(conn, banner)? {
        Some(term) => term,
        None => return Ok(RowOutcome::rejected(format!("unknown term {banner}"))),
      },
      (None, Some(term)) => term,
      (None, None) => {
        return Ok(RowOutcome::rejected(
          "missing BannerTerm and no term selected",
        ));
      }
    };
    let Some(student) = self.resolver.student(conn, &row.student_id)? else {
      return Ok(RowOutcome::rejected(format!(
        "unknown student {}",
        row.student_id
      )));
    };

    let enrollment: Option<(i64, Option<CourseId>)> = conn
      .query_row(
        "SELECT enrollment_id, course_fk FROM enrollments
         WHERE term_fk = ?1 AND crn = ?2 AND student_fk = ?3",
        rusqlite::params![term, row.crn, student],
        |r| Ok((r.get(0)?, r.get(1)?)),
      )
      .optional()?;
    let Some((enrollment, course)) = enrollment else {
      return Ok(RowOutcome::rejected(format!(
        "student {} is not enrolled in CRN {}",
        row.student_id, row.crn
      )));
    };
    let course = match course {
      Some(course) => Some(course),
      None => conn
        .query_row(
          "SELECT course_fk FROM course_sections WHERE crn = ?1 AND term_fk = ?2",
          rusqlite::params![row.crn, term],
          |r| r.get(0),
        )
        .optional()?,
    };
    let Some(course) = course else {
      return Ok(RowOutcome::rejected(format!("CRN {} has no course", row.crn)));
    };

    let slo: Option<i64> = conn
      .query_row(
        "SELECT slo_id FROM student_learning_outcomes
         WHERE course_fk = ?1 AND slo_code = ?2",
        rusqlite::params![course, row.slo_code],
        |r| r.get(0),
      )
      .optional()?;
    let Some(slo) = slo else {
      return Ok(RowOutcome::rejected(format!("unknown SLO {}", row.slo_code)));
    };

    type Existing = (i64, Option<f64>, Option<String>, Option<String>, Option<String>, bool);
    let existing: Option<Existing> = conn
      .query_row(
        "SELECT assessment_id, score, achievement_level, assessment_method, notes,
                is_finalized
         FROM assessments WHERE enrollment_fk = ?1 AND slo_fk = ?2",
        rusqlite::params![enrollment, slo],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)),
      )
      .optional()?;

    match existing {
      Some((_, _, _, _, _, true)) => Ok(RowOutcome::rejected(format!(
        "assessment of {} for student {} is finalized",
        row.slo_code, row.student_id
      ))),
      Some((id, old_score, old_level, old_method, old_notes, false)) => {
        let new_score = row.score.or(old_score);
        let new_level = row.achievement_level.or(old_level.clone());
        let new_method = row.method.or(old_method.clone());
        let new_notes = row.notes.or(old_notes.clone());
        let changed = new_score != old_score
          || new_level != old_level
          || new_method != old_method
          || new_notes != old_notes;
        if changed {
          conn.execute(
            "UPDATE assessments
             SET score = ?2, achievement_level = ?3, assessment_method = ?4,
                 notes = ?5, updated_by = ?6, updated_at = ?7
             WHERE assessment_id = ?1",
            rusqlite::params![
              id,
              new_score,
              new_level,
              new_method,
              new_notes,
              self.stamp.by,
              self.stamp.at
            ],
          )?;
        }
        Ok(RowOutcome::merged(changed))
      }
      None => {
        conn.execute(
          "INSERT INTO assessments (
             enrollment_fk, slo_fk, score, achievement_level, assessment_method,
             notes, is_finalized, created_by, updated_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7, ?8, ?8)",
          rusqlite::params![
            enrollment,
            slo,
            row.score,
            row.achievement_level,
            row.method,
            row.notes,
            self.stamp.by,
            self.stamp.at
          ],
        )?;
        Ok(RowOutcome::imported())
      }
    }
  }
}

/// Whether `parent` already has a child in `table` with this exact
/// description.
fn description_exists(
  conn: &Connection,
  table: &'static str,
  parent_column: &'static str,
  parent: i64,
  description: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        &format!(
          "SELECT 1 FROM {table} WHERE {parent_column} = ?1 AND description = ?2"
        ),
        rusqlite::params![parent, description],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}
