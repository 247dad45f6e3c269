//! Roster types: students, their enrollments, and per-outcome assessments.

use serde::{Deserialize, Serialize};

use crate::curriculum::{CourseId, SectionId, SloId, TermId};

pub type StudentId = i64;
pub type EnrollmentId = i64;
pub type AssessmentId = i64;

/// A student, keyed by the external student number (C-number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:         StudentId,
  pub c_number:   String,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub is_active:  bool,
}

/// Links a student to a section within a term.
///
/// The natural key is `(term, crn, student)`. The section and course links are
/// informational and may be absent when the feed references a CRN the store
/// does not know yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
  pub id:           EnrollmentId,
  pub term_id:      TermId,
  pub crn:          String,
  pub student_id:   StudentId,
  pub section_id:   Option<SectionId>,
  pub course_id:    Option<CourseId>,
  pub part_of_term: Option<String>,
  pub discipline:   Option<String>,
}

/// A score recorded against one SLO for one enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
  pub id:                AssessmentId,
  pub enrollment_id:     EnrollmentId,
  pub slo_id:            SloId,
  pub score:             Option<f64>,
  pub achievement_level: Option<String>,
  pub method:            Option<String>,
  pub notes:             Option<String>,
  /// Finalized assessments are never overwritten by re-imports.
  pub is_finalized:      bool,
}
