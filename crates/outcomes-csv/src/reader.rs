//! Byte-level input handling: BOM stripping, UTF-8 decoding and
//! quote-aware record splitting.

use std::io::Read;

use crate::{Error, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One logical CSV record with the physical line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
  pub line:   usize,
  pub fields: Vec<String>,
}

/// Drain an uploaded stream into memory.
pub fn read_upload(mut reader: impl Read) -> Result<Vec<u8>> {
  let mut buf = Vec::new();
  reader.read_to_end(&mut buf)?;
  Ok(buf)
}

/// Remove a leading UTF-8 byte-order mark, if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
  data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

pub(crate) fn decode_text(data: &[u8]) -> Result<&str> {
  std::str::from_utf8(strip_bom(data))
    .map_err(|e| Error::Encoding { offset: e.valid_up_to() })
}

/// Split `text` into records.
///
/// Commas inside double quotes do not separate fields, `""` inside quotes is a
/// literal quote, and quoted fields may span lines. Records whose fields are
/// all blank are dropped.
pub(crate) fn split_records(text: &str) -> Result<Vec<Record>> {
  let mut records = Vec::new();
  let mut fields: Vec<String> = Vec::new();
  let mut buf = String::new();
  let mut in_quotes = false;
  let mut line = 1usize;
  let mut start_line = 1usize;

  let mut chars = text.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '"' if in_quotes => {
        if chars.peek() == Some(&'"') {
          chars.next();
          buf.push('"');
        } else {
          in_quotes = false;
        }
      }
      '"' => in_quotes = true,
      ',' if !in_quotes => fields.push(std::mem::take(&mut buf)),
      '\r' => {
        // CRLF collapses to LF; a bare CR inside quotes is kept.
        if in_quotes && chars.peek() != Some(&'\n') {
          buf.push('\r');
        }
      }
      '\n' => {
        line += 1;
        if in_quotes {
          buf.push('\n');
        } else {
          fields.push(std::mem::take(&mut buf));
          push_record(&mut records, start_line, std::mem::take(&mut fields));
          start_line = line;
        }
      }
      _ => buf.push(ch),
    }
  }

  if in_quotes {
    return Err(Error::UnterminatedQuote { line: start_line });
  }
  if !buf.is_empty() || !fields.is_empty() {
    fields.push(buf);
    push_record(&mut records, start_line, fields);
  }

  Ok(records)
}

fn push_record(records: &mut Vec<Record>, line: usize, fields: Vec<String>) {
  if fields.iter().all(|f| f.trim().is_empty()) {
    return;
  }
  records.push(Record { line, fields });
}
