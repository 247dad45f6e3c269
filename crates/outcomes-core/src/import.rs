//! Import kinds, request scope, and the per-run report.
//!
//! An import is a single pass over one CSV feed. Row-level problems never
//! abort the run; they are counted and described in the [`ImportReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, curriculum::TermId};

/// Default bound on the number of messages kept in a report.
pub const DEFAULT_MAX_MESSAGES: usize = 50;

// ─── Import kind ─────────────────────────────────────────────────────────────

/// The feed formats understood by the ingestion pipeline.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ImportKind {
  /// Institutional outcomes: one free-text description per row.
  Islo,
  /// Program outcomes keyed by program code / program name.
  Pslo,
  /// Course outcomes: a free-text cell split into sentences.
  Cslo,
  Courses,
  Sections,
  Slos,
  ProgramOutcomes,
  Enrollment,
  Assessments,
}

impl ImportKind {
  /// Parse a kind name, accepting `-` as a word separator.
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .replace('-', "_")
      .parse()
      .map_err(|_| Error::UnknownImportKind(s.to_owned()))
  }

  /// Whether the kind cannot run without a selected term.
  ///
  /// Enrollment feeds carry their own term per row and ISLO feeds are scoped
  /// to an institution instead.
  pub fn requires_term(self) -> bool {
    !matches!(self, Self::Islo | Self::Enrollment)
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// Caller-supplied context for one import run.
///
/// This replaces any ambient "current term" or "current user" state: the
/// engine only sees what is passed here.
#[derive(Debug, Clone)]
pub struct ImportScope {
  pub term_id:          Option<TermId>,
  /// Institution that owns ISLO rows. Auto-created on first use.
  pub institution_code: Option<String>,
  /// Identity written to `created_by` / `updated_by`.
  pub acting_user:      Option<String>,
  pub max_messages:     usize,
}

impl Default for ImportScope {
  fn default() -> Self {
    Self {
      term_id:          None,
      institution_code: None,
      acting_user:      None,
      max_messages:     DEFAULT_MAX_MESSAGES,
    }
  }
}

impl ImportScope {
  pub fn for_term(term_id: TermId) -> Self {
    Self { term_id: Some(term_id), ..Default::default() }
  }
}

/// A complete import request: what the feed is, where it goes, and its bytes.
#[derive(Debug, Clone)]
pub struct ImportRequest {
  pub kind:  ImportKind,
  pub scope: ImportScope,
  pub data:  Vec<u8>,
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Aggregate result of an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
  pub kind:        ImportKind,
  pub imported:    usize,
  pub updated:     usize,
  pub skipped:     usize,
  /// Rows that matched an existing record exactly and changed nothing.
  pub duplicates:  usize,
  /// The first `max_messages` problems, in input order. When more were
  /// recorded, the final entry says how many were left out.
  pub errors:      Vec<String>,
  pub omitted:     usize,
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl ImportReport {
  pub fn to_json(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(self)?)
  }

  /// Total rows the run looked at.
  pub fn rows_seen(&self) -> usize {
    self.imported + self.updated + self.skipped + self.duplicates
  }
}

/// Accumulates counts and bounded messages while rows are processed.
#[derive(Debug)]
pub struct ReportBuilder {
  kind:         ImportKind,
  max_messages: usize,
  imported:     usize,
  updated:      usize,
  skipped:      usize,
  duplicates:   usize,
  errors:       Vec<String>,
  omitted:      usize,
  started_at:   DateTime<Utc>,
}

impl ReportBuilder {
  pub fn new(kind: ImportKind, max_messages: usize) -> Self {
    Self {
      kind,
      max_messages,
      imported: 0,
      updated: 0,
      skipped: 0,
      duplicates: 0,
      errors: Vec::new(),
      omitted: 0,
      started_at: Utc::now(),
    }
  }

  pub fn imported(&mut self) { self.imported += 1; }

  pub fn updated(&mut self) { self.updated += 1; }

  pub fn duplicate(&mut self) { self.duplicates += 1; }

  /// Count several rows at once, e.g. every sentence of one CSLO cell.
  pub fn add(&mut self, imported: usize, updated: usize, duplicates: usize) {
    self.imported += imported;
    self.updated += updated;
    self.duplicates += duplicates;
  }

  /// Count a skipped row and remember why.
  pub fn skip(&mut self, line: usize, reason: impl std::fmt::Display) {
    self.skipped += 1;
    self.note(line, reason);
  }

  /// Record a message without changing any count.
  pub fn note(&mut self, line: usize, message: impl std::fmt::Display) {
    if self.errors.len() < self.max_messages {
      self.errors.push(format!("line {line}: {message}"));
    } else {
      self.omitted += 1;
    }
  }

  pub fn finish(mut self) -> ImportReport {
    if self.omitted > 0 {
      self
        .errors
        .push(format!("... and {} more not shown", self.omitted));
    }
    ImportReport {
      kind:        self.kind,
      imported:    self.imported,
      updated:     self.updated,
      skipped:     self.skipped,
      duplicates:  self.duplicates,
      errors:      self.errors,
      omitted:     self.omitted,
      started_at:  self.started_at,
      finished_at: Utc::now(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_parses_case_insensitively() {
    assert_eq!(ImportKind::parse("CSLO").unwrap(), ImportKind::Cslo);
    assert_eq!(
      ImportKind::parse("program-outcomes").unwrap(),
      ImportKind::ProgramOutcomes
    );
    assert!(matches!(
      ImportKind::parse("grades"),
      Err(Error::UnknownImportKind(_))
    ));
  }

  #[test]
  fn kind_display_round_trips() {
    use strum::IntoEnumIterator;
    for kind in ImportKind::iter() {
      assert_eq!(ImportKind::parse(&kind.to_string()).unwrap(), kind);
    }
  }

  #[test]
  fn report_bounds_messages_and_counts_the_rest() {
    let mut b = ReportBuilder::new(ImportKind::Slos, 2);
    for line in 2..7 {
      b.skip(line, "missing SLO code");
    }
    b.imported();

    let report = b.finish();
    assert_eq!(report.skipped, 5);
    assert_eq!(report.imported, 1);
    assert_eq!(report.omitted, 3);
    assert_eq!(report.errors.len(), 3);
    assert_eq!(report.errors[0], "line 2: missing SLO code");
    assert_eq!(report.errors[2], "... and 3 more not shown");
  }

  #[test]
  fn add_accumulates_counts() {
    let mut b = ReportBuilder::new(ImportKind::Cslo, 10);
    b.add(2, 0, 1);
    b.add(0, 1, 0);
    b.imported();
    let report = b.finish();
    assert_eq!(
      (report.imported, report.updated, report.duplicates),
      (3, 1, 1)
    );
    assert_eq!(report.rows_seen(), 5);
  }

  #[test]
  fn report_without_overflow_has_no_suffix() {
    let mut b = ReportBuilder::new(ImportKind::Islo, 10);
    b.note(3, "course created");
    let report = b.finish();
    assert_eq!(report.errors, vec!["line 3: course created".to_string()]);
    assert_eq!(report.omitted, 0);
  }
}
