//! Column layouts per import kind and header resolution.

use std::collections::HashMap;

use outcomes_core::import::ImportKind;

use crate::{
  Error, Result,
  reader::Record,
  rows::{self, Decoded},
};

/// A named column. Header cells match `name` or any alias after
/// normalisation (see [`normalize_header`]).
#[derive(Debug)]
pub(crate) struct Column {
  pub name:     &'static str,
  pub aliases:  &'static [&'static str],
  pub required: bool,
}

const fn req(name: &'static str) -> Column {
  Column { name, aliases: &[], required: true }
}

const fn opt(name: &'static str) -> Column {
  Column { name, aliases: &[], required: false }
}

/// How a kind's records are laid out, together with its row decoder.
pub(crate) enum Layout {
  /// Columns are taken by position. The header row is optional; the first
  /// record is dropped only when `is_header` recognises it.
  Positional {
    min_columns: usize,
    is_header:   fn(&Record) -> bool,
    decode:      fn(&Record) -> Decoded,
  },
  Named {
    columns: &'static [Column],
    decode:  fn(&HeaderMap, &Record) -> Decoded,
  },
}

// ─── Per-kind column sets ────────────────────────────────────────────────────

pub(crate) mod col {
  pub const CRS_ID: &str = "CRS ID";
  pub const CRS_TITLE: &str = "CRS TITLE";
  pub const CSLO: &str = "CSLO";

  pub const PROGRAM_CODE: &str = "program_code";
  pub const COURSE_NUMBER: &str = "course_number";
  pub const COURSE_NAME: &str = "course_name";
  pub const ACTIVE: &str = "active";
  pub const CRN: &str = "crn";
  pub const SECTION_NUMBER: &str = "section_number";
  pub const INSTRUCTOR: &str = "instructor";
  pub const SLO_CODE: &str = "slo_code";
  pub const DESCRIPTION: &str = "description";
  pub const OUTCOME_CODE: &str = "outcome_code";
  pub const ISLO_CODE: &str = "islo_code";

  pub const BANNER_TERM: &str = "BannerTerm";
  pub const TERM_CODE: &str = "TermCode";
  pub const STUDENT_ID: &str = "StudentID";
  pub const SECTION_ID: &str = "SectionID";
  pub const FIRST_NAME: &str = "FirstName";
  pub const LAST_NAME: &str = "LastName";
  pub const PART_OF_TERM: &str = "PartOfTerm";
  pub const DISCIPLINE: &str = "Discipline";
  pub const COURSE_ID: &str = "CourseID";
  pub const SLO: &str = "SLO";
  pub const SCORE: &str = "Score";
  pub const ACHIEVEMENT_LEVEL: &str = "AchievementLevel";
  pub const METHOD: &str = "Method";
  pub const NOTES: &str = "Notes";
}

static CSLO_COLUMNS: [Column; 3] =
  [req(col::CRS_ID), opt(col::CRS_TITLE), req(col::CSLO)];

static COURSE_COLUMNS: [Column; 4] = [
  opt(col::PROGRAM_CODE),
  req(col::COURSE_NUMBER),
  opt(col::COURSE_NAME),
  opt(col::ACTIVE),
];

static SECTION_COLUMNS: [Column; 5] = [
  req(col::CRN),
  req(col::COURSE_NUMBER),
  opt(col::SECTION_NUMBER),
  opt(col::INSTRUCTOR),
  opt(col::ACTIVE),
];

static SLO_COLUMNS: [Column; 4] = [
  req(col::COURSE_NUMBER),
  req(col::SLO_CODE),
  opt(col::DESCRIPTION),
  opt(col::ACTIVE),
];

static PROGRAM_OUTCOME_COLUMNS: [Column; 4] = [
  req(col::PROGRAM_CODE),
  req(col::OUTCOME_CODE),
  opt(col::DESCRIPTION),
  opt(col::ISLO_CODE),
];

static ENROLLMENT_COLUMNS: [Column; 9] = [
  opt(col::BANNER_TERM),
  opt(col::TERM_CODE),
  req(col::STUDENT_ID),
  Column { name: col::SECTION_ID, aliases: &["CRN"], required: true },
  opt(col::FIRST_NAME),
  opt(col::LAST_NAME),
  opt(col::PART_OF_TERM),
  opt(col::DISCIPLINE),
  opt(col::COURSE_ID),
];

static ASSESSMENT_COLUMNS: [Column; 8] = [
  opt(col::BANNER_TERM),
  req(col::STUDENT_ID),
  Column { name: col::SECTION_ID, aliases: &["CRN"], required: true },
  Column { name: col::SLO, aliases: &["slo_code"], required: true },
  opt(col::SCORE),
  opt(col::ACHIEVEMENT_LEVEL),
  opt(col::METHOD),
  opt(col::NOTES),
];

pub(crate) fn layout_for(kind: ImportKind) -> Layout {
  use Layout::{Named, Positional};
  match kind {
    ImportKind::Islo => Positional {
      min_columns: 1,
      is_header:   rows::islo_is_header,
      decode:      rows::decode_islo,
    },
    ImportKind::Pslo => Positional {
      min_columns: 5,
      is_header:   rows::pslo_is_header,
      decode:      rows::decode_pslo,
    },
    ImportKind::Cslo => Named { columns: &CSLO_COLUMNS, decode: rows::decode_cslo },
    ImportKind::Courses => {
      Named { columns: &COURSE_COLUMNS, decode: rows::decode_course }
    }
    ImportKind::Sections => {
      Named { columns: &SECTION_COLUMNS, decode: rows::decode_section }
    }
    ImportKind::Slos => Named { columns: &SLO_COLUMNS, decode: rows::decode_slo },
    ImportKind::ProgramOutcomes => Named {
      columns: &PROGRAM_OUTCOME_COLUMNS,
      decode:  rows::decode_program_outcome,
    },
    ImportKind::Enrollment => {
      Named { columns: &ENROLLMENT_COLUMNS, decode: rows::decode_enrollment }
    }
    ImportKind::Assessments => {
      Named { columns: &ASSESSMENT_COLUMNS, decode: rows::decode_assessment }
    }
  }
}

// ─── Header resolution ───────────────────────────────────────────────────────

/// Lowercase and drop everything but letters and digits, so `CRS ID`,
/// `crs_id` and `CrsId` compare equal.
pub(crate) fn normalize_header(s: &str) -> String {
  s.chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

/// Maps canonical column names to their position in a concrete header row.
#[derive(Debug)]
pub(crate) struct HeaderMap {
  index:       HashMap<&'static str, usize>,
  /// Rows shorter than this cannot hold every required column.
  min_columns: usize,
}

impl HeaderMap {
  pub fn resolve(
    kind: ImportKind,
    columns: &'static [Column],
    header: &Record,
  ) -> Result<Self> {
    let positions: HashMap<String, usize> = header
      .fields
      .iter()
      .enumerate()
      .rev()
      .map(|(i, h)| (normalize_header(h), i))
      .collect();

    let mut index = HashMap::new();
    let mut missing = Vec::new();
    for column in columns {
      let found = std::iter::once(column.name)
        .chain(column.aliases.iter().copied())
        .find_map(|n| positions.get(&normalize_header(n)).copied());
      match found {
        Some(i) => {
          index.insert(column.name, i);
        }
        None if column.required => missing.push(column.name),
        None => {}
      }
    }

    if !missing.is_empty() {
      return Err(Error::MissingColumns { kind, missing });
    }

    let min_columns = columns
      .iter()
      .filter(|c| c.required)
      .filter_map(|c| index.get(c.name))
      .max()
      .map_or(0, |i| i + 1);

    Ok(Self { index, min_columns })
  }

  pub fn min_columns(&self) -> usize { self.min_columns }

  /// The trimmed cell for `column`, or `None` when absent or blank.
  pub fn get<'r>(&self, record: &'r Record, column: &str) -> Option<&'r str> {
    let i = *self.index.get(column)?;
    record
      .fields
      .get(i)
      .map(|s| s.trim())
      .filter(|s| !s.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header(fields: &[&str]) -> Record {
    Record {
      line:   1,
      fields: fields.iter().map(|s| s.to_string()).collect(),
    }
  }

  #[test]
  fn headers_match_regardless_of_case_and_spacing() {
    let map = HeaderMap::resolve(
      ImportKind::Cslo,
      &CSLO_COLUMNS,
      &header(&["cslo", "crs_id", "Crs Title", "extra"]),
    )
    .unwrap();
    let row = header(&["  Analyze data. ", "BIO101", "", "ignored"]);
    assert_eq!(map.get(&row, col::CRS_ID), Some("BIO101"));
    assert_eq!(map.get(&row, col::CSLO), Some("Analyze data."));
    assert_eq!(map.get(&row, col::CRS_TITLE), None);
    assert_eq!(map.min_columns(), 2);
  }

  #[test]
  fn aliases_are_accepted() {
    let map = HeaderMap::resolve(
      ImportKind::Enrollment,
      &ENROLLMENT_COLUMNS,
      &header(&["StudentID", "CRN"]),
    )
    .unwrap();
    let row = header(&["C001", "40123"]);
    assert_eq!(map.get(&row, col::SECTION_ID), Some("40123"));
  }

  #[test]
  fn missing_required_columns_are_fatal() {
    let err = HeaderMap::resolve(
      ImportKind::Slos,
      &SLO_COLUMNS,
      &header(&["course_number", "description"]),
    )
    .unwrap_err();
    match err {
      Error::MissingColumns { kind, missing } => {
        assert_eq!(kind, ImportKind::Slos);
        assert_eq!(missing, vec![col::SLO_CODE]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
