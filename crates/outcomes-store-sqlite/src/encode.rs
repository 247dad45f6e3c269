//! Mapping between SQLite rows and the domain types of `outcomes-core`.
//!
//! Timestamps are stored as RFC 3339 strings and flags as `0`/`1` integers.
//! Each `*_COLUMNS` constant is the select list its matching `*_from_row`
//! expects, in order.

use chrono::{DateTime, Utc};
use outcomes_core::{
  curriculum::{
    Course, CourseSection, Institution, InstitutionalOutcome, Program,
    ProgramOutcome, Slo, Term,
  },
  roster::{Assessment, Enrollment, Student},
};
use rusqlite::Row;

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Audit stamp ─────────────────────────────────────────────────────────────

/// Who and when, written into the audit columns of every touched row.
#[derive(Debug, Clone)]
pub struct Stamp {
  pub at: String,
  pub by: Option<String>,
}

impl Stamp {
  pub fn now(by: Option<String>) -> Self {
    Self { at: encode_dt(Utc::now()), by }
  }
}

// ─── Terms ───────────────────────────────────────────────────────────────────

pub const TERM_COLUMNS: &str =
  "term_id, banner_term, academic_year, term_name, is_active";

pub fn term_from_row(row: &Row<'_>) -> rusqlite::Result<Term> {
  Ok(Term {
    id:            row.get(0)?,
    banner_term:   row.get(1)?,
    academic_year: row.get(2)?,
    name:          row.get(3)?,
    is_active:     row.get(4)?,
  })
}

// ─── Curriculum ──────────────────────────────────────────────────────────────

pub const INSTITUTION_COLUMNS: &str =
  "institution_id, institution_code, institution_name, is_active";

pub fn institution_from_row(row: &Row<'_>) -> rusqlite::Result<Institution> {
  Ok(Institution {
    id:        row.get(0)?,
    code:      row.get(1)?,
    name:      row.get(2)?,
    is_active: row.get(3)?,
  })
}

pub const ISLO_COLUMNS: &str =
  "islo_id, institution_fk, islo_code, description, sequence_num, is_active";

pub fn islo_from_row(row: &Row<'_>) -> rusqlite::Result<InstitutionalOutcome> {
  Ok(InstitutionalOutcome {
    id:             row.get(0)?,
    institution_id: row.get(1)?,
    code:           row.get(2)?,
    description:    row.get(3)?,
    sequence_num:   row.get(4)?,
    is_active:      row.get(5)?,
  })
}

pub const PROGRAM_COLUMNS: &str =
  "program_id, term_fk, program_code, program_name, degree_type, is_active";

pub fn program_from_row(row: &Row<'_>) -> rusqlite::Result<Program> {
  Ok(Program {
    id:           row.get(0)?,
    term_id:      row.get(1)?,
    program_code: row.get(2)?,
    name:         row.get(3)?,
    degree_type:  row.get(4)?,
    is_active:    row.get(5)?,
  })
}

pub const PROGRAM_OUTCOME_COLUMNS: &str = "program_outcome_id, program_fk, \
   islo_fk, outcome_code, description, sequence_num, is_active";

pub fn program_outcome_from_row(
  row: &Row<'_>,
) -> rusqlite::Result<ProgramOutcome> {
  Ok(ProgramOutcome {
    id:                       row.get(0)?,
    program_id:               row.get(1)?,
    institutional_outcome_id: row.get(2)?,
    outcome_code:             row.get(3)?,
    description:              row.get(4)?,
    sequence_num:             row.get(5)?,
    is_active:                row.get(6)?,
  })
}

pub const COURSE_COLUMNS: &str =
  "course_id, program_fk, term_fk, course_number, course_name, is_active";

pub fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
  Ok(Course {
    id:            row.get(0)?,
    program_id:    row.get(1)?,
    term_id:       row.get(2)?,
    course_number: row.get(3)?,
    name:          row.get(4)?,
    is_active:     row.get(5)?,
  })
}

pub const SECTION_COLUMNS: &str = "section_id, course_fk, term_fk, crn, \
   section_number, instructor, is_active";

pub fn section_from_row(row: &Row<'_>) -> rusqlite::Result<CourseSection> {
  Ok(CourseSection {
    id:             row.get(0)?,
    course_id:      row.get(1)?,
    term_id:        row.get(2)?,
    crn:            row.get(3)?,
    section_number: row.get(4)?,
    instructor:     row.get(5)?,
    is_active:      row.get(6)?,
  })
}

pub const SLO_COLUMNS: &str =
  "slo_id, course_fk, slo_code, description, sequence_num, is_active";

pub fn slo_from_row(row: &Row<'_>) -> rusqlite::Result<Slo> {
  Ok(Slo {
    id:           row.get(0)?,
    course_id:    row.get(1)?,
    slo_code:     row.get(2)?,
    description:  row.get(3)?,
    sequence_num: row.get(4)?,
    is_active:    row.get(5)?,
  })
}

// ─── Roster ──────────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str =
  "student_id, c_number, first_name, last_name, is_active";

pub fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
  Ok(Student {
    id:         row.get(0)?,
    c_number:   row.get(1)?,
    first_name: row.get(2)?,
    last_name:  row.get(3)?,
    is_active:  row.get(4)?,
  })
}

pub const ENROLLMENT_COLUMNS: &str = "enrollment_id, term_fk, crn, student_fk, \
   section_fk, course_fk, part_of_term, discipline";

pub fn enrollment_from_row(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
  Ok(Enrollment {
    id:           row.get(0)?,
    term_id:      row.get(1)?,
    crn:          row.get(2)?,
    student_id:   row.get(3)?,
    section_id:   row.get(4)?,
    course_id:    row.get(5)?,
    part_of_term: row.get(6)?,
    discipline:   row.get(7)?,
  })
}

pub const ASSESSMENT_COLUMNS: &str = "assessment_id, enrollment_fk, slo_fk, \
   score, achievement_level, assessment_method, notes, is_finalized";

pub fn assessment_from_row(row: &Row<'_>) -> rusqlite::Result<Assessment> {
  Ok(Assessment {
    id:                row.get(0)?,
    enrollment_id:     row.get(1)?,
    slo_id:            row.get(2)?,
    score:             row.get(3)?,
    achievement_level: row.get(4)?,
    method:            row.get(5)?,
    notes:             row.get(6)?,
    is_finalized:      row.get(7)?,
  })
}
