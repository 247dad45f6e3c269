//! Typed rows, one struct per import kind, and their decoding from records.
//!
//! Decoding never fails the feed. A record that cannot become a row yields a
//! [`RowProblem`] that the ingestion pipeline reports as a skip.

use std::fmt;

use crate::{
  layout::{HeaderMap, col, normalize_header},
  reader::Record,
  sentences::split_sentences,
};

// ─── Row types ───────────────────────────────────────────────────────────────

/// `islo`: one institutional outcome per row.
#[derive(Debug, Clone, PartialEq)]
pub struct IsloRow {
  pub description: String,
}

/// `pslo`: program code, program name, sequence, PSLO id, description.
#[derive(Debug, Clone, PartialEq)]
pub struct PsloRow {
  pub program_code: Option<String>,
  /// Full program name, possibly with a trailing `, <degree>` suffix.
  pub program_name: Option<String>,
  /// Display position supplied by the feed; informational only.
  pub sequence:     Option<i64>,
  pub outcome_code: Option<String>,
  pub description:  String,
}

/// `cslo`: a course and the outcomes found in its free-text cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CsloRow {
  pub course_number: String,
  pub course_title:  Option<String>,
  /// Sentences split out of the `CSLO` cell, each ending in punctuation.
  pub outcomes:      Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
  pub program_code:  Option<String>,
  pub course_number: String,
  pub course_name:   Option<String>,
  pub active:        Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
  pub crn:            String,
  pub course_number:  String,
  pub section_number: Option<String>,
  pub instructor:     Option<String>,
  pub active:         Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SloRow {
  pub course_number: String,
  pub slo_code:      String,
  pub description:   Option<String>,
  pub active:        Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramOutcomeRow {
  pub program_code: String,
  pub outcome_code: String,
  pub description:  Option<String>,
  /// Code of the institutional outcome this outcome maps to, if any.
  pub islo_code:    Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRow {
  pub banner_term:   Option<String>,
  pub term_code:     Option<String>,
  pub student_id:    String,
  pub crn:           String,
  pub first_name:    Option<String>,
  pub last_name:     Option<String>,
  pub part_of_term:  Option<String>,
  pub discipline:    Option<String>,
  pub course_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRow {
  pub banner_term:       Option<String>,
  pub student_id:        String,
  pub crn:               String,
  pub slo_code:          String,
  pub score:             Option<f64>,
  pub achievement_level: Option<String>,
  pub method:            Option<String>,
  pub notes:             Option<String>,
}

/// A decoded row of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportRow {
  Islo(IsloRow),
  Pslo(PsloRow),
  Cslo(CsloRow),
  Course(CourseRow),
  Section(SectionRow),
  Slo(SloRow),
  ProgramOutcome(ProgramOutcomeRow),
  Enrollment(EnrollmentRow),
  Assessment(AssessmentRow),
}

// ─── Problems ────────────────────────────────────────────────────────────────

/// Why a record could not be decoded into a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowProblem {
  TooFewColumns { found: usize, min: usize },
  MissingField(&'static str),
  InvalidField { field: &'static str, value: String },
}

impl fmt::Display for RowProblem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TooFewColumns { found, min } => {
        write!(f, "malformed row: {found} column(s), expected at least {min}")
      }
      Self::MissingField(field) => write!(f, "missing {field}"),
      Self::InvalidField { field, value } => {
        write!(f, "invalid {field}: {value:?}")
      }
    }
  }
}

pub(crate) type Decoded = std::result::Result<ImportRow, RowProblem>;

// ─── Field helpers ───────────────────────────────────────────────────────────

fn non_empty(s: &str) -> Option<String> {
  let t = s.trim();
  if t.is_empty() { None } else { Some(t.to_string()) }
}

fn required(
  map: &HeaderMap,
  rec: &Record,
  column: &'static str,
) -> std::result::Result<String, RowProblem> {
  map
    .get(rec, column)
    .map(str::to_owned)
    .ok_or(RowProblem::MissingField(column))
}

fn optional(map: &HeaderMap, rec: &Record, column: &str) -> Option<String> {
  map.get(rec, column).map(str::to_owned)
}

pub(crate) fn parse_boolish(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "y" | "active" => Some(true),
    "0" | "false" | "no" | "n" | "inactive" => Some(false),
    _ => None,
  }
}

fn active_flag(
  map: &HeaderMap,
  rec: &Record,
) -> std::result::Result<Option<bool>, RowProblem> {
  match map.get(rec, col::ACTIVE) {
    None => Ok(None),
    Some(v) => parse_boolish(v).map(Some).ok_or_else(|| {
      RowProblem::InvalidField { field: col::ACTIVE, value: v.to_owned() }
    }),
  }
}

// ─── Positional kinds ────────────────────────────────────────────────────────

fn positional(rec: &Record, i: usize) -> Option<String> {
  rec.fields.get(i).and_then(|s| non_empty(s))
}

/// Normalised cells that only ever appear in a positional header row.
const HEADER_TOKENS: &[&str] = &[
  "outcome",
  "outcomes",
  "description",
  "outcomedescription",
  "islo",
  "islodescription",
  "pslo",
  "pslodescription",
  "institutionaloutcome",
  "institutionaloutcomes",
];

fn is_header_token(cell: Option<&String>) -> bool {
  cell.is_some_and(|s| HEADER_TOKENS.contains(&normalize_header(s).as_str()))
}

/// An ISLO feed has a header only when its single cell names the column.
pub(crate) fn islo_is_header(rec: &Record) -> bool {
  is_header_token(rec.fields.first())
}

/// A PSLO header carries a non-numeric label in the sequence column, or a
/// column name where the description belongs.
pub(crate) fn pslo_is_header(rec: &Record) -> bool {
  let label_in_sequence =
    positional(rec, 2).is_some_and(|s| s.parse::<i64>().is_err());
  label_in_sequence || is_header_token(rec.fields.get(4))
}

pub(crate) fn decode_islo(rec: &Record) -> Decoded {
  let description = positional(rec, 0)
    .ok_or(RowProblem::MissingField("outcome description"))?;
  Ok(ImportRow::Islo(IsloRow { description }))
}

pub(crate) fn decode_pslo(rec: &Record) -> Decoded {
  let program_code = positional(rec, 0);
  let program_name = positional(rec, 1);
  if program_code.is_none() && program_name.is_none() {
    return Err(RowProblem::MissingField("program code or name"));
  }
  let description = positional(rec, 4)
    .ok_or(RowProblem::MissingField("outcome description"))?;
  Ok(ImportRow::Pslo(PsloRow {
    program_code,
    program_name,
    sequence: positional(rec, 2).and_then(|s| s.parse().ok()),
    outcome_code: positional(rec, 3),
    description,
  }))
}

// ─── Named kinds ─────────────────────────────────────────────────────────────

pub(crate) fn decode_cslo(map: &HeaderMap, rec: &Record) -> Decoded {
  let course_number = required(map, rec, col::CRS_ID)?;
  let text = required(map, rec, col::CSLO)?;
  let outcomes = split_sentences(&text);
  if outcomes.is_empty() {
    return Err(RowProblem::MissingField(col::CSLO));
  }
  Ok(ImportRow::Cslo(CsloRow {
    course_number,
    course_title: optional(map, rec, col::CRS_TITLE),
    outcomes,
  }))
}

pub(crate) fn decode_course(map: &HeaderMap, rec: &Record) -> Decoded {
  Ok(ImportRow::Course(CourseRow {
    program_code:  optional(map, rec, col::PROGRAM_CODE),
    course_number: required(map, rec, col::COURSE_NUMBER)?,
    course_name:   optional(map, rec, col::COURSE_NAME),
    active:        active_flag(map, rec)?,
  }))
}

pub(crate) fn decode_section(map: &HeaderMap, rec: &Record) -> Decoded {
  Ok(ImportRow::Section(SectionRow {
    crn:            required(map, rec, col::CRN)?,
    course_number:  required(map, rec, col::COURSE_NUMBER)?,
    section_number: optional(map, rec, col::SECTION_NUMBER),
    instructor:     optional(map, rec, col::INSTRUCTOR),
    active:         active_flag(map, rec)?,
  }))
}

pub(crate) fn decode_slo(map: &HeaderMap, rec: &Record) -> Decoded {
  Ok(ImportRow::Slo(SloRow {
    course_number: required(map, rec, col::COURSE_NUMBER)?,
    slo_code:      required(map, rec, col::SLO_CODE)?,
    description:   optional(map, rec, col::DESCRIPTION),
    active:        active_flag(map, rec)?,
  }))
}

pub(crate) fn decode_program_outcome(map: &HeaderMap, rec: &Record) -> Decoded {
  Ok(ImportRow::ProgramOutcome(ProgramOutcomeRow {
    program_code: required(map, rec, col::PROGRAM_CODE)?,
    outcome_code: required(map, rec, col::OUTCOME_CODE)?,
    description:  optional(map, rec, col::DESCRIPTION),
    islo_code:    optional(map, rec, col::ISLO_CODE),
  }))
}

pub(crate) fn decode_enrollment(map: &HeaderMap, rec: &Record) -> Decoded {
  Ok(ImportRow::Enrollment(EnrollmentRow {
    banner_term:   optional(map, rec, col::BANNER_TERM),
    term_code:     optional(map, rec, col::TERM_CODE),
    student_id:    required(map, rec, col::STUDENT_ID)?,
    crn:           required(map, rec, col::SECTION_ID)?,
    first_name:    optional(map, rec, col::FIRST_NAME),
    last_name:     optional(map, rec, col::LAST_NAME),
    part_of_term:  optional(map, rec, col::PART_OF_TERM),
    discipline:    optional(map, rec, col::DISCIPLINE),
    course_number: optional(map, rec, col::COURSE_ID),
  }))
}

pub(crate) fn decode_assessment(map: &HeaderMap, rec: &Record) -> Decoded {
  let score = match map.get(rec, col::SCORE) {
    None => None,
    Some(v) => Some(v.parse::<f64>().map_err(|_| RowProblem::InvalidField {
      field: col::SCORE,
      value: v.to_owned(),
    })?),
  };
  Ok(ImportRow::Assessment(AssessmentRow {
    banner_term: optional(map, rec, col::BANNER_TERM),
    student_id: required(map, rec, col::STUDENT_ID)?,
    crn: required(map, rec, col::SECTION_ID)?,
    slo_code: required(map, rec, col::SLO)?,
    score,
    achievement_level: optional(map, rec, col::ACHIEVEMENT_LEVEL),
    method: optional(map, rec, col::METHOD),
    notes: optional(map, rec, col::NOTES),
  }))
}
