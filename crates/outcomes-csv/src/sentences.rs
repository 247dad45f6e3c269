//! Sentence segmentation for free-text outcome cells.

/// Split `text` into sentences.
///
/// A sentence ends at a `.` followed by whitespace or the end of input. A
/// trailing fragment without terminal punctuation gets a `.` appended. Empty
/// fragments (stray periods, blank text) produce nothing.
pub fn split_sentences(text: &str) -> Vec<String> {
  let mut out = Vec::new();
  let mut current = String::new();

  let mut chars = text.chars().peekable();
  while let Some(ch) = chars.next() {
    current.push(ch);
    let at_boundary = ch == '.'
      && chars.peek().is_none_or(|next| next.is_whitespace());
    if at_boundary {
      push_sentence(&mut out, &current);
      current.clear();
    }
  }
  push_sentence(&mut out, &current);

  out
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
  let trimmed = raw.trim();
  if trimmed.trim_matches('.').trim().is_empty() {
    return;
  }
  let mut sentence = trimmed.to_owned();
  if !sentence.ends_with(['.', '!', '?']) {
    sentence.push('.');
  }
  out.push(sentence);
}
