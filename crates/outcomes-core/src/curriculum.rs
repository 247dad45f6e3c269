//! Curriculum graph types: terms, programs, outcomes, courses and sections.
//!
//! Every row carries an integer surrogate key assigned by the store plus a
//! human-facing natural key. Natural keys of outcomes are unique within their
//! parent only, never globally.

use serde::{Deserialize, Serialize};

// ─── Identifiers ─────────────────────────────────────────────────────────────

pub type TermId = i64;
pub type InstitutionId = i64;
pub type InstitutionalOutcomeId = i64;
pub type ProgramId = i64;
pub type ProgramOutcomeId = i64;
pub type CourseId = i64;
pub type SectionId = i64;
pub type SloId = i64;

// ─── Term ────────────────────────────────────────────────────────────────────

/// The academic-calendar scope under which all curriculum data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
  pub id:            TermId,
  /// Banner term code, e.g. `202510`.
  pub banner_term:   String,
  pub academic_year: Option<String>,
  pub name:          Option<String>,
  pub is_active:     bool,
}

/// Input for [`CurriculumStore::create_term`](crate::store::CurriculumStore::create_term).
#[derive(Debug, Clone, Default)]
pub struct NewTerm {
  pub banner_term:   String,
  pub academic_year: Option<String>,
  pub name:          Option<String>,
}

impl NewTerm {
  pub fn new(banner_term: impl Into<String>) -> Self {
    Self { banner_term: banner_term.into(), ..Default::default() }
  }
}

// ─── Institution level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
  pub id:        InstitutionId,
  pub code:      String,
  pub name:      Option<String>,
  pub is_active: bool,
}

/// An institution-wide learning outcome (ISLO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionalOutcome {
  pub id:             InstitutionalOutcomeId,
  pub institution_id: InstitutionId,
  pub code:           String,
  pub description:    String,
  pub sequence_num:   i64,
  pub is_active:      bool,
}

// ─── Program level ───────────────────────────────────────────────────────────

/// An academic program, scoped to a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
  pub id:           ProgramId,
  pub term_id:      Option<TermId>,
  pub program_code: String,
  pub name:         String,
  /// Trailing degree suffix such as `AS` or `BS`.
  pub degree_type:  Option<String>,
  pub is_active:    bool,
}

/// A program-level learning outcome (PSLO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramOutcome {
  pub id:                       ProgramOutcomeId,
  pub program_id:               ProgramId,
  pub institutional_outcome_id: Option<InstitutionalOutcomeId>,
  pub outcome_code:             String,
  pub description:              String,
  pub sequence_num:             i64,
  pub is_active:                bool,
}

// ─── Course level ────────────────────────────────────────────────────────────

/// A course. Courses imported without a program hang directly off the term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub id:            CourseId,
  pub program_id:    Option<ProgramId>,
  pub term_id:       Option<TermId>,
  pub course_number: String,
  pub name:          String,
  pub is_active:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSection {
  pub id:             SectionId,
  pub course_id:      CourseId,
  pub term_id:        Option<TermId>,
  /// Course reference number; globally unique.
  pub crn:            String,
  pub section_number: Option<String>,
  pub instructor:     Option<String>,
  pub is_active:      bool,
}

/// A course-level student learning outcome (CSLO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slo {
  pub id:           SloId,
  pub course_id:    CourseId,
  pub slo_code:     String,
  pub description:  String,
  pub sequence_num: i64,
  pub is_active:    bool,
}
