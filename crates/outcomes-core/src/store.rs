//! The `CurriculumStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `outcomes-store-sqlite`). The CLI depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  curriculum::{
    Course, CourseId, Institution, InstitutionalOutcome, NewTerm, Program,
    ProgramId, ProgramOutcome, Slo, Term, TermId,
  },
  import::{ImportReport, ImportRequest},
  roster::{Assessment, Enrollment, Student},
  summary::{ClearSummary, EntityRef, ReplicationSummary, TermCounts},
};

/// Abstraction over an academic-outcomes store backend.
///
/// Imports tolerate row-level failure and keep whatever succeeded. Term
/// replication and term clear are all-or-nothing: any failure rolls the whole
/// operation back.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait CurriculumStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Terms ─────────────────────────────────────────────────────────────

  /// Create a term. Fails if the banner code is already taken.
  fn create_term(
    &self,
    input: NewTerm,
    acting_user: Option<String>,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  fn get_term(
    &self,
    id: TermId,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  /// Look a term up by banner code.
  fn find_term<'a>(
    &'a self,
    banner_term: &'a str,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + 'a;

  fn list_terms(
    &self,
  ) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send + '_;

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Run one CSV feed through the ingestion pipeline.
  ///
  /// Only unreadable input, an unusable header, or a missing scope fail the
  /// call; everything else is reported row by row.
  fn import(
    &self,
    request: ImportRequest,
  ) -> impl Future<Output = Result<ImportReport, Self::Error>> + Send + '_;

  /// Deep-copy the curriculum graph of `source` into `target`.
  ///
  /// Re-running with the same arguments updates the rows written by the
  /// previous run instead of duplicating them.
  fn replicate_term(
    &self,
    source: TermId,
    target: TermId,
    acting_user: Option<String>,
  ) -> impl Future<Output = Result<ReplicationSummary, Self::Error>> + Send + '_;

  /// Delete the curriculum graph of `term`, leaves first.
  fn clear_term(
    &self,
    term: TermId,
  ) -> impl Future<Output = Result<ClearSummary, Self::Error>> + Send + '_;

  /// Delete a single entity, refusing when live dependents exist.
  fn delete(
    &self,
    entity: EntityRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn term_counts(
    &self,
    term: TermId,
  ) -> impl Future<Output = Result<TermCounts, Self::Error>> + Send + '_;

  fn list_programs(
    &self,
    term: TermId,
  ) -> impl Future<Output = Result<Vec<Program>, Self::Error>> + Send + '_;

  fn find_program<'a>(
    &'a self,
    term: TermId,
    program_code: &'a str,
  ) -> impl Future<Output = Result<Option<Program>, Self::Error>> + Send + 'a;

  fn list_program_outcomes(
    &self,
    program: ProgramId,
  ) -> impl Future<Output = Result<Vec<ProgramOutcome>, Self::Error>> + Send + '_;

  /// Find an institution by code. ISLO imports create them on first use.
  fn find_institution<'a>(
    &'a self,
    institution_code: &'a str,
  ) -> impl Future<Output = Result<Option<Institution>, Self::Error>> + Send + 'a;

  fn list_institutional_outcomes<'a>(
    &'a self,
    institution_code: &'a str,
  ) -> impl Future<Output = Result<Vec<InstitutionalOutcome>, Self::Error>>
  + Send
  + 'a;

  /// Find a course by number within a term (through its program or directly).
  fn find_course<'a>(
    &'a self,
    term: TermId,
    course_number: &'a str,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + 'a;

  /// SLOs of a course, in sequence order.
  fn list_slos(
    &self,
    course: CourseId,
  ) -> impl Future<Output = Result<Vec<Slo>, Self::Error>> + Send + '_;

  fn find_student<'a>(
    &'a self,
    c_number: &'a str,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + 'a;

  fn find_enrollment<'a>(
    &'a self,
    term: TermId,
    crn: &'a str,
    c_number: &'a str,
  ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send + 'a;

  fn list_assessments(
    &self,
    enrollment: crate::roster::EnrollmentId,
  ) -> impl Future<Output = Result<Vec<Assessment>, Self::Error>> + Send + '_;
}
