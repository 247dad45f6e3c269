//! CSV feed codec for the academic-outcomes store.
//!
//! Turns the raw bytes of an uploaded feed into typed rows for one
//! [`ImportKind`]. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use outcomes_core::import::ImportKind;
//! use outcomes_csv::parse_feed;
//!
//! let data = b"CRS ID,CRS TITLE,CSLO\nBIO101,Biology,Explain cells. Use a microscope\n";
//! let feed = parse_feed(ImportKind::Cslo, data).unwrap();
//! println!("{} line(s)", feed.lines.len());
//! ```

pub mod error;
mod layout;
mod reader;
mod rows;
mod sentences;

pub use error::{Error, Result};
pub use reader::{read_upload, strip_bom};
pub use rows::{
  AssessmentRow, CourseRow, CsloRow, EnrollmentRow, ImportRow, IsloRow,
  ProgramOutcomeRow, PsloRow, RowProblem, SectionRow, SloRow,
};
pub use sentences::split_sentences;

use layout::{HeaderMap, Layout, layout_for};
use outcomes_core::import::ImportKind;

// ─── Public types
// ─────────────────────────────────────────────────────────────

/// One data record of a feed, decoded or rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedLine {
  /// Physical line the record starts on, counting from 1.
  pub line: usize,
  pub row:  std::result::Result<ImportRow, RowProblem>,
}

/// A parsed feed: every data record in input order.
#[derive(Debug, Clone)]
pub struct Feed {
  pub kind:  ImportKind,
  pub lines: Vec<FeedLine>,
}

// ─── Public API
// ───────────────────────────────────────────────────────────────

/// Parse the raw bytes of a feed of the given kind.
///
/// A leading UTF-8 BOM is ignored. The first record is the header row, except
/// for positional kinds whose first record reads as data. Only
/// input-level problems (bad encoding, no header, required columns absent
/// from the header, an unclosed quote) are errors; each data record that
/// cannot be decoded becomes a [`FeedLine`] carrying a [`RowProblem`].
pub fn parse_feed(kind: ImportKind, data: &[u8]) -> Result<Feed> {
  let text = reader::decode_text(data)?;
  let mut records = reader::split_records(text)?.into_iter();
  let header = records.next().ok_or(Error::EmptyInput)?;

  let lines = match layout_for(kind) {
    Layout::Positional { min_columns, is_header, decode } => {
      let first = (!is_header(&header)).then_some(header);
      first
        .into_iter()
        .chain(records)
        .map(|rec| {
          let row = if rec.fields.len() < min_columns {
            Err(RowProblem::TooFewColumns {
              found: rec.fields.len(),
              min:   min_columns,
            })
          } else {
            decode(&rec)
          };
          FeedLine { line: rec.line, row }
        })
        .collect()
    }
    Layout::Named { columns, decode } => {
      let map = HeaderMap::resolve(kind, columns, &header)?;
      records
        .map(|rec| {
          let row = if rec.fields.len() < map.min_columns() {
            Err(RowProblem::TooFewColumns {
              found: rec.fields.len(),
              min:   map.min_columns(),
            })
          } else {
            decode(&map, &rec)
          };
          FeedLine { line: rec.line, row }
        })
        .collect()
    }
  };

  Ok(Feed { kind, lines })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rows(feed: &Feed) -> Vec<&ImportRow> {
    feed.lines.iter().filter_map(|l| l.row.as_ref().ok()).collect()
  }

  #[test]
  fn cslo_feed_with_bom_splits_sentences() {
    let data = "\u{feff}CRS ID,CRS TITLE,CSLO\r\n\
                BIO101,Intro Biology,\"Students will analyze data. Students will write reports\"\r\n";
    let feed = parse_feed(ImportKind::Cslo, data.as_bytes()).unwrap();
    assert_eq!(feed.lines.len(), 1);
    match &feed.lines[0].row {
      Ok(ImportRow::Cslo(row)) => {
        assert_eq!(row.course_number, "BIO101");
        assert_eq!(row.course_title.as_deref(), Some("Intro Biology"));
        assert_eq!(row.outcomes, vec![
          "Students will analyze data.",
          "Students will write reports."
        ]);
      }
      other => panic!("unexpected row: {other:?}"),
    }
  }

  #[test]
  fn named_columns_are_order_independent() {
    let data = b"description,slo_code,course_number\nExplain cells,SLO-1,BIO101\n";
    let feed = parse_feed(ImportKind::Slos, data).unwrap();
    assert_eq!(rows(&feed), vec![&ImportRow::Slo(SloRow {
      course_number: "BIO101".into(),
      slo_code:      "SLO-1".into(),
      description:   Some("Explain cells".into()),
      active:        None,
    })]);
  }

  #[test]
  fn short_and_incomplete_rows_become_problems_with_line_numbers() {
    let data = b"course_number,slo_code,description\nBIO101\nBIO102,,Explain\nBIO103,S1,Ok\n";
    let feed = parse_feed(ImportKind::Slos, data).unwrap();
    assert_eq!(feed.lines.len(), 3);
    assert_eq!(feed.lines[0].line, 2);
    assert_eq!(
      feed.lines[0].row,
      Err(RowProblem::TooFewColumns { found: 1, min: 2 })
    );
    assert_eq!(feed.lines[1].row, Err(RowProblem::MissingField("slo_code")));
    assert!(feed.lines[2].row.is_ok());
  }

  #[test]
  fn pslo_is_positional_and_needs_five_columns() {
    let data = b"code,name,seq,id,desc\n\
                 BIO,\"Biology, AS\",1,,Explain evolution\n\
                 CHEM,Chemistry,2\n";
    let feed = parse_feed(ImportKind::Pslo, data).unwrap();
    match &feed.lines[0].row {
      Ok(ImportRow::Pslo(row)) => {
        assert_eq!(row.program_code.as_deref(), Some("BIO"));
        assert_eq!(row.program_name.as_deref(), Some("Biology, AS"));
        assert_eq!(row.sequence, Some(1));
        assert_eq!(row.outcome_code, None);
      }
      other => panic!("unexpected row: {other:?}"),
    }
    assert_eq!(
      feed.lines[1].row,
      Err(RowProblem::TooFewColumns { found: 3, min: 5 })
    );
  }

  #[test]
  fn islo_header_row_is_skipped() {
    let data = b"Outcome\nCommunicate effectively\nThink critically\n";
    let feed = parse_feed(ImportKind::Islo, data).unwrap();
    assert_eq!(rows(&feed).len(), 2);
  }

  #[test]
  fn headerless_islo_keeps_its_first_outcome() {
    let data = b"Communicate effectively\nThink critically\n";
    let feed = parse_feed(ImportKind::Islo, data).unwrap();
    assert_eq!(feed.lines[0].line, 1);
    assert_eq!(rows(&feed), vec![
      &ImportRow::Islo(IsloRow { description: "Communicate effectively".into() }),
      &ImportRow::Islo(IsloRow { description: "Think critically".into() }),
    ]);
  }

  #[test]
  fn headerless_pslo_keeps_its_first_outcome() {
    let data = b"BIO,Biology,1,,Explain evolution\nBIO,Biology,,,Describe cells\n";
    let feed = parse_feed(ImportKind::Pslo, data).unwrap();
    assert_eq!(rows(&feed).len(), 2);
    assert_eq!(feed.lines[0].line, 1);
  }

  #[test]
  fn invalid_score_is_a_row_problem() {
    let data = b"StudentID,CRN,SLO,Score\nC001,40001,SLO-1,abc\n";
    let feed = parse_feed(ImportKind::Assessments, data).unwrap();
    assert_eq!(
      feed.lines[0].row,
      Err(RowProblem::InvalidField { field: "Score", value: "abc".into() })
    );
  }

  #[test]
  fn empty_input_is_fatal() {
    assert!(matches!(
      parse_feed(ImportKind::Courses, b"\xEF\xBB\xBF"),
      Err(Error::EmptyInput)
    ));
  }

  #[test]
  fn header_without_required_columns_is_fatal() {
    let err = parse_feed(ImportKind::Cslo, b"Course,Text\nBIO,Stuff\n").unwrap_err();
    assert!(matches!(err, Error::MissingColumns { .. }));
  }
}
