//! Natural-key to internal-id resolution with lookup-or-create semantics.
//!
//! One [`Resolver`] lives for one import run. It caches every id it finds or
//! creates so repeated keys cost a single query. Ids cached while a row is
//! being applied stay provisional until [`Resolver::commit_row`]; if the row
//! is rolled back, [`Resolver::discard_row`] forgets them so a later row
//! never sees an id whose insert was undone.

use std::collections::{HashMap, hash_map::Entry};

use rusqlite::{Connection, OptionalExtension as _, Params};
use tracing::debug;

use outcomes_core::{
  curriculum::{CourseId, InstitutionId, ProgramId, TermId},
  roster::StudentId,
};

use crate::encode::Stamp;

/// An id returned by the resolver and whether this run created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
  pub id:      i64,
  pub created: bool,
}

impl Resolved {
  fn found(id: i64) -> Self { Self { id, created: false } }

  fn created(id: i64) -> Self { Self { id, created: true } }
}

/// How far program resolution may go after the exact lookups miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramFallback {
  /// Code and exact name only; report a miss.
  ExactOnly,
  /// Try a fuzzy name match, then create the program.
  FuzzyOrCreate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
  Term(String),
  Institution(String),
  ProgramCode { term: TermId, code: String },
  ProgramName { term: TermId, name: String },
  Course { term: TermId, number: String },
  Student(String),
}

#[derive(Debug)]
pub struct Resolver {
  stamp:         Stamp,
  cache:         HashMap<Key, i64>,
  /// Lowercased program names per term in first-seen order, for fuzzy
  /// matching. Loaded from the database on first use, then extended with
  /// programs created during the run.
  program_names: HashMap<TermId, Vec<(String, ProgramId)>>,
  pending_keys:  Vec<Key>,
  pending_names: Vec<TermId>,
}

impl Resolver {
  pub fn new(stamp: Stamp) -> Self {
    Self {
      stamp,
      cache: HashMap::new(),
      program_names: HashMap::new(),
      pending_keys: Vec::new(),
      pending_names: Vec::new(),
    }
  }

  // ─── Row bracketing ─────────────────────────────────────────────────────

  /// Make everything cached by the current row permanent.
  pub fn commit_row(&mut self) {
    self.pending_keys.clear();
    self.pending_names.clear();
  }

  /// Forget everything cached by the current row.
  pub fn discard_row(&mut self) {
    for key in self.pending_keys.drain(..) {
      self.cache.remove(&key);
    }
    for term in self.pending_names.drain(..).rev() {
      if let Some(names) = self.program_names.get_mut(&term) {
        names.pop();
      }
    }
  }

  fn remember(&mut self, key: Key, id: i64) {
    self.cache.insert(key.clone(), id);
    self.pending_keys.push(key);
  }

  fn find<P: Params>(
    &mut self,
    conn: &Connection,
    key: Key,
    sql: &str,
    params: P,
  ) -> rusqlite::Result<Option<i64>> {
    if let Some(&id) = self.cache.get(&key) {
      return Ok(Some(id));
    }
    let id = conn.query_row(sql, params, |r| r.get(0)).optional()?;
    if let Some(id) = id {
      self.remember(key, id);
    }
    Ok(id)
  }

  // ─── Terms ──────────────────────────────────────────────────────────────

  pub fn term(
    &mut self,
    conn: &Connection,
    banner_term: &str,
  ) -> rusqlite::Result<Option<TermId>> {
    self.find(
      conn,
      Key::Term(banner_term.to_owned()),
      "SELECT term_id FROM terms WHERE banner_term = ?1",
      [banner_term],
    )
  }

  pub fn term_or_create(
    &mut self,
    conn: &Connection,
    banner_term: &str,
    name: Option<&str>,
  ) -> rusqlite::Result<Resolved> {
    if let Some(id) = self.term(conn, banner_term)? {
      return Ok(Resolved::found(id));
    }
    conn.execute(
      "INSERT INTO terms (banner_term, term_name, is_active,
                          created_by, updated_by, created_at, updated_at)
       VALUES (?1, ?2, 1, ?3, ?3, ?4, ?4)",
      rusqlite::params![banner_term, name, self.stamp.by, self.stamp.at],
    )?;
    let id = conn.last_insert_rowid();
    self.remember(Key::Term(banner_term.to_owned()), id);
    debug!(term_id = id, banner_term, "created term");
    Ok(Resolved::created(id))
  }

  // ─── Institutions ───────────────────────────────────────────────────────

  pub fn institution_or_create(
    &mut self,
    conn: &Connection,
    code: &str,
  ) -> rusqlite::Result<Resolved> {
    let key = Key::Institution(code.to_owned());
    if let Some(id) = self.find(
      conn,
      key.clone(),
      "SELECT institution_id FROM institutions WHERE institution_code = ?1",
      [code],
    )? {
      return Ok(Resolved::found(id));
    }
    conn.execute(
      "INSERT INTO institutions (institution_code, is_active,
                                 created_by, updated_by, created_at, updated_at)
       VALUES (?1, 1, ?2, ?2, ?3, ?3)",
      rusqlite::params![code, self.stamp.by, self.stamp.at],
    )?;
    let id: InstitutionId = conn.last_insert_rowid();
    self.remember(key, id);
    debug!(institution_id = id, code, "created institution");
    Ok(Resolved::created(id))
  }

  // ─── Programs ───────────────────────────────────────────────────────────

  /// Resolve a program within `term`.
  ///
  /// Tries, in order: exact code, exact name (full or without its degree
  /// suffix), then with [`ProgramFallback::FuzzyOrCreate`] a
  /// case-insensitive containment match against the names seen so far, and
  /// finally creation. Returns `None` only for a miss under
  /// [`ProgramFallback::ExactOnly`] or when neither code nor name is given.
  pub fn program(
    &mut self,
    conn: &Connection,
    term: TermId,
    code: Option<&str>,
    name: Option<&str>,
    fallback: ProgramFallback,
  ) -> rusqlite::Result<Option<Resolved>> {
    if let Some(code) = code
      && let Some(id) = self.program_by_code(conn, term, code)?
    {
      return Ok(Some(Resolved::found(id)));
    }

    if let Some(name) = name {
      let (base, _) = split_program_name(name);
      if let Some(id) = self.find(
        conn,
        Key::ProgramName { term, name: name.to_owned() },
        "SELECT program_id FROM programs
         WHERE term_fk = ?1 AND (program_name = ?2 OR program_name = ?3)
         ORDER BY program_id LIMIT 1",
        rusqlite::params![term, name, base],
      )? {
        return Ok(Some(Resolved::found(id)));
      }

      if fallback == ProgramFallback::FuzzyOrCreate
        && let Some(id) = self.fuzzy_program(conn, term, name)?
      {
        debug!(program_id = id, name, "matched program by partial name");
        self.remember(Key::ProgramName { term, name: name.to_owned() }, id);
        return Ok(Some(Resolved::found(id)));
      }
    }

    if fallback == ProgramFallback::ExactOnly {
      return Ok(None);
    }
    let Some(full) = name.or(code) else {
      return Ok(None);
    };

    let (base, degree) = split_program_name(full);
    let code = code.unwrap_or(base);
    // A derived code can still collide with an existing program.
    if let Some(id) = self.program_by_code(conn, term, code)? {
      return Ok(Some(Resolved::found(id)));
    }

    conn.execute(
      "INSERT INTO programs (term_fk, program_code, program_name, degree_type,
                             is_active, created_by, updated_by,
                             created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5, ?6, ?6)",
      rusqlite::params![term, code, base, degree, self.stamp.by, self.stamp.at],
    )?;
    let id: ProgramId = conn.last_insert_rowid();
    self.remember(Key::ProgramCode { term, code: code.to_owned() }, id);
    if let Some(name) = name {
      self.remember(Key::ProgramName { term, name: name.to_owned() }, id);
    }
    self.program_names_for(conn, term)?.push((base.to_lowercase(), id));
    self.pending_names.push(term);
    debug!(program_id = id, code, name = base, "created program");
    Ok(Some(Resolved::created(id)))
  }

  fn program_by_code(
    &mut self,
    conn: &Connection,
    term: TermId,
    code: &str,
  ) -> rusqlite::Result<Option<ProgramId>> {
    self.find(
      conn,
      Key::ProgramCode { term, code: code.to_owned() },
      "SELECT program_id FROM programs WHERE term_fk = ?1 AND program_code = ?2",
      rusqlite::params![term, code],
    )
  }

  fn fuzzy_program(
    &mut self,
    conn: &Connection,
    term: TermId,
    name: &str,
  ) -> rusqlite::Result<Option<ProgramId>> {
    let needle = name.to_lowercase();
    let seen = self.program_names_for(conn, term)?;
    Ok(
      seen
        .iter()
        .find(|(seen, _)| {
          !seen.is_empty()
            && (needle.contains(seen.as_str()) || seen.contains(needle.as_str()))
        })
        .map(|(_, id)| *id),
    )
  }

  fn program_names_for(
    &mut self,
    conn: &Connection,
    term: TermId,
  ) -> rusqlite::Result<&mut Vec<(String, ProgramId)>> {
    match self.program_names.entry(term) {
      Entry::Occupied(e) => Ok(e.into_mut()),
      Entry::Vacant(e) => {
        let mut stmt = conn.prepare(
          "SELECT program_name, program_id FROM programs
           WHERE term_fk = ?1 ORDER BY program_id",
        )?;
        let loaded = stmt
          .query_map([term], |r| {
            Ok((r.get::<_, String>(0)?.to_lowercase(), r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(e.insert(loaded))
      }
    }
  }

  // ─── Courses ────────────────────────────────────────────────────────────

  pub fn course(
    &mut self,
    conn: &Connection,
    term: TermId,
    number: &str,
  ) -> rusqlite::Result<Option<CourseId>> {
    self.find(
      conn,
      Key::Course { term, number: number.to_owned() },
      "SELECT course_id FROM courses WHERE term_fk = ?1 AND course_number = ?2",
      rusqlite::params![term, number],
    )
  }

  /// Find a course in `term`, creating a term-level course (no program)
  /// named `title` (or its number) when there is none.
  pub fn course_or_create(
    &mut self,
    conn: &Connection,
    term: TermId,
    number: &str,
    title: Option<&str>,
  ) -> rusqlite::Result<Resolved> {
    if let Some(id) = self.course(conn, term, number)? {
      return Ok(Resolved::found(id));
    }
    conn.execute(
      "INSERT INTO courses (term_fk, course_number, course_name, is_active,
                            created_by, updated_by, created_at, updated_at)
       VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5, ?5)",
      rusqlite::params![
        term,
        number,
        title.unwrap_or(number),
        self.stamp.by,
        self.stamp.at
      ],
    )?;
    let id: CourseId = conn.last_insert_rowid();
    self.remember(Key::Course { term, number: number.to_owned() }, id);
    debug!(course_id = id, number, "created course");
    Ok(Resolved::created(id))
  }

  // ─── Students ───────────────────────────────────────────────────────────

  pub fn student(
    &mut self,
    conn: &Connection,
    c_number: &str,
  ) -> rusqlite::Result<Option<StudentId>> {
    self.find(
      conn,
      Key::Student(c_number.to_owned()),
      "SELECT student_id FROM students WHERE c_number = ?1",
      [c_number],
    )
  }

  pub fn student_or_create(
    &mut self,
    conn: &Connection,
    c_number: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> rusqlite::Result<Resolved> {
    if let Some(id) = self.student(conn, c_number)? {
      return Ok(Resolved::found(id));
    }
    conn.execute(
      "INSERT INTO students (c_number, first_name, last_name, is_active,
                             created_by, updated_by, created_at, updated_at)
       VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5, ?5)",
      rusqlite::params![
        c_number,
        first_name,
        last_name,
        self.stamp.by,
        self.stamp.at
      ],
    )?;
    let id: StudentId = conn.last_insert_rowid();
    self.remember(Key::Student(c_number.to_owned()), id);
    debug!(student_id = id, c_number, "created student");
    Ok(Resolved::created(id))
  }
}

/// Split `"Biology, Associate of Science"` into the program name and its
/// degree type at the last comma.
pub fn split_program_name(full: &str) -> (&str, Option<&str>) {
  match full.rsplit_once(',') {
    Some((base, degree))
      if !base.trim().is_empty() && !degree.trim().is_empty() =>
    {
      (base.trim(), Some(degree.trim()))
    }
    _ => (full.trim(), None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TABLES: &str = "
    CREATE TABLE programs (
      program_id INTEGER PRIMARY KEY, term_fk INTEGER, program_code TEXT,
      program_name TEXT, degree_type TEXT, is_active INTEGER,
      created_by TEXT, updated_by TEXT, created_at TEXT, updated_at TEXT
    );
    CREATE TABLE courses (
      course_id INTEGER PRIMARY KEY, program_fk INTEGER, term_fk INTEGER,
      course_number TEXT, course_name TEXT, is_active INTEGER,
      created_by TEXT, updated_by TEXT, created_at TEXT, updated_at TEXT
    );";

  fn setup() -> (Connection, Resolver) {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(TABLES).unwrap();
    (conn, Resolver::new(Stamp::now(Some("tester".into()))))
  }

  fn program_count(conn: &Connection) -> i64 {
    conn
      .query_row("SELECT COUNT(*) FROM programs", [], |r| r.get(0))
      .unwrap()
  }

  #[test]
  fn degree_suffix_is_split_at_last_comma() {
    assert_eq!(
      split_program_name("Arts, Media, AA"),
      ("Arts, Media", Some("AA"))
    );
    assert_eq!(split_program_name("Nursing"), ("Nursing", None));
    assert_eq!(split_program_name("Nursing,"), ("Nursing,", None));
  }

  #[test]
  fn created_program_is_cached_and_found_by_code() {
    let (conn, mut r) = setup();
    let first = r
      .program(&conn, 1, Some("BIO"), Some("Biology, AS"), ProgramFallback::FuzzyOrCreate)
      .unwrap()
      .unwrap();
    assert!(first.created);
    let again = r
      .program(&conn, 1, Some("BIO"), None, ProgramFallback::ExactOnly)
      .unwrap()
      .unwrap();
    assert_eq!(again, Resolved { id: first.id, created: false });
    let degree: Option<String> = conn
      .query_row("SELECT degree_type FROM programs", [], |r| r.get(0))
      .unwrap();
    assert_eq!(degree.as_deref(), Some("AS"));
  }

  #[test]
  fn fuzzy_match_takes_first_seen_name() {
    let (conn, mut r) = setup();
    conn
      .execute_batch(
        "INSERT INTO programs (program_id, term_fk, program_code, program_name)
         VALUES (1, 1, 'BIO', 'Biology'), (2, 1, 'MBIO', 'Marine Biology');",
      )
      .unwrap();
    let hit = r
      .program(
        &conn,
        1,
        None,
        Some("Biology Transfer, AS-T"),
        ProgramFallback::FuzzyOrCreate,
      )
      .unwrap()
      .unwrap();
    assert_eq!(hit, Resolved { id: 1, created: false });
    assert_eq!(program_count(&conn), 2);
  }

  #[test]
  fn exact_only_reports_a_miss() {
    let (conn, mut r) = setup();
    let miss = r
      .program(&conn, 1, Some("NOPE"), Some("Nope"), ProgramFallback::ExactOnly)
      .unwrap();
    assert_eq!(miss, None);
    assert_eq!(program_count(&conn), 0);
  }

  #[test]
  fn discarded_row_forgets_created_ids() {
    let (mut conn, mut r) = setup();
    let sp = conn.savepoint().unwrap();
    let created = r.course_or_create(&sp, 1, "BIO101", Some("Biology")).unwrap();
    assert!(created.created);
    drop(sp);
    r.discard_row();

    let again = r.course_or_create(&conn, 1, "BIO101", None).unwrap();
    assert!(again.created);
  }
}
