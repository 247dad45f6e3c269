//! Integration tests for `SqliteStore` against an in-memory database.

use outcomes_core::{
  curriculum::{NewTerm, TermId},
  import::{ImportKind, ImportReport, ImportRequest, ImportScope},
  store::CurriculumStore,
  summary::{ClearSummary, EntityRef, ReplicationSummary, TermCounts},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn term(s: &SqliteStore, banner: &str) -> TermId {
  s.create_term(NewTerm::new(banner), Some("tester".into()))
    .await
    .unwrap()
    .id
}

fn request(kind: ImportKind, term: Option<TermId>, data: &str) -> ImportRequest {
  ImportRequest {
    kind,
    scope: ImportScope {
      term_id: term,
      acting_user: Some("tester".into()),
      ..Default::default()
    },
    data: data.as_bytes().to_vec(),
  }
}

async fn import(
  s: &SqliteStore,
  kind: ImportKind,
  term: Option<TermId>,
  data: &str,
) -> ImportReport {
  s.import(request(kind, term, data)).await.unwrap()
}

const PSLO_FEED: &str = "code,name,seq,id,desc
BIO,\"Biology, AS\",1,,Explain evolution
BIO,\"Biology, AS\",2,,Describe cells
";

const COURSE_FEED: &str = "program_code,course_number,course_name
BIO,BIO101,Intro Biology
BIO,BIO102,Genetics
";

const SECTION_FEED: &str = "crn,course_number,section_number,instructor
40001,BIO101,01,Smith
40002,BIO101,02,Jones
40003,BIO102,01,Lee
";

const SLO_FEED: &str = "course_number,slo_code,description
BIO101,SLO-1,Explain cells
BIO101,SLO-2,Use a microscope
BIO102,SLO-1,Explain heredity
";

/// One program with two outcomes, two courses, three sections, three SLOs.
async fn seed(s: &SqliteStore, t: TermId) {
  for (kind, feed) in [
    (ImportKind::Pslo, PSLO_FEED),
    (ImportKind::Courses, COURSE_FEED),
    (ImportKind::Sections, SECTION_FEED),
    (ImportKind::Slos, SLO_FEED),
  ] {
    let report = import(s, kind, Some(t), feed).await;
    assert_eq!(report.skipped, 0, "{kind}: {:?}", report.errors);
  }
}

const SEEDED: TermCounts = TermCounts {
  programs: 1,
  outcomes: 2,
  courses:  2,
  sections: 3,
  slos:     3,
};

/// Enroll C001 in section 40001 and record one assessment of BIO101 SLO-1.
async fn assess(s: &SqliteStore, t: TermId) {
  import(
    s,
    ImportKind::Enrollment,
    Some(t),
    "StudentID,SectionID,FirstName\nC001,40001,Ada\n",
  )
  .await;
  let report = import(
    s,
    ImportKind::Assessments,
    Some(t),
    "StudentID,CRN,SLO,Score\nC001,40001,SLO-1,3.5\n",
  )
  .await;
  assert_eq!(report.imported, 1, "{:?}", report.errors);
}

// ─── Terms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_term() {
  let s = store().await;
  let created = s
    .create_term(
      NewTerm {
        banner_term:   "202610".into(),
        academic_year: Some("2026-27".into()),
        name:          Some("Fall 2026".into()),
      },
      None,
    )
    .await
    .unwrap();

  let found = s.find_term("202610").await.unwrap().unwrap();
  assert_eq!(found, created);
  assert_eq!(s.get_term(created.id).await.unwrap(), Some(created));
  assert!(s.find_term("199910").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_term_is_rejected() {
  let s = store().await;
  term(&s, "202610").await;
  let err = s
    .create_term(NewTerm::new("202610"), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateTerm(code) if code == "202610"));
}

#[tokio::test]
async fn terms_are_listed_by_banner_code() {
  let s = store().await;
  term(&s, "202630").await;
  term(&s, "202610").await;
  let codes: Vec<_> = s
    .list_terms()
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.banner_term)
    .collect();
  assert_eq!(codes, vec!["202610", "202630"]);
}

// ─── Ingestion: fatal errors ─────────────────────────────────────────────────

#[tokio::test]
async fn term_scoped_kind_without_term_is_fatal() {
  let s = store().await;
  let err = s
    .import(request(ImportKind::Courses, None, COURSE_FEED))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MissingScope("term")));
}

#[tokio::test]
async fn unknown_scope_term_is_fatal() {
  let s = store().await;
  let err = s
    .import(request(ImportKind::Courses, Some(42), COURSE_FEED))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TermNotFound(42)));
}

#[tokio::test]
async fn unusable_header_is_fatal_and_writes_nothing() {
  let s = store().await;
  let t = term(&s, "202610").await;
  let err = s
    .import(request(ImportKind::Cslo, Some(t), "Course,Text\nBIO101,Stuff.\n"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Csv(outcomes_csv::Error::MissingColumns { .. })));
  assert!(s.term_counts(t).await.unwrap().is_empty());
}

// ─── Ingestion: outcomes ─────────────────────────────────────────────────────

#[tokio::test]
async fn islo_codes_follow_the_sequence_and_repeats_are_duplicates() {
  let s = store().await;
  let report = import(
    &s,
    ImportKind::Islo,
    None,
    "Outcome\nCommunicate effectively\nThink critically\nCommunicate effectively\n",
  )
  .await;
  assert_eq!((report.imported, report.duplicates), (2, 1));

  let islos = s.list_institutional_outcomes("DEFAULT").await.unwrap();
  let codes: Vec<_> = islos.iter().map(|o| (o.code.as_str(), o.sequence_num)).collect();
  assert_eq!(codes, vec![("ISLO-1", 1), ("ISLO-2", 2)]);
}

#[tokio::test]
async fn headerless_islo_feed_imports_every_line() {
  let s = store().await;
  let report = import(
    &s,
    ImportKind::Islo,
    None,
    "Communicate effectively\nThink critically\n",
  )
  .await;
  assert_eq!((report.imported, report.skipped), (2, 0), "{:?}", report.errors);

  let islos = s.list_institutional_outcomes("DEFAULT").await.unwrap();
  let descriptions: Vec<_> = islos.iter().map(|o| o.description.as_str()).collect();
  assert_eq!(descriptions, vec!["Communicate effectively", "Think critically"]);

  let institution = s.find_institution("DEFAULT").await.unwrap().unwrap();
  assert_eq!(institution.code, "DEFAULT");
  assert!(institution.is_active);
  assert!(islos.iter().all(|o| o.institution_id == institution.id));
  assert!(s.find_institution("ELSEWHERE").await.unwrap().is_none());
}

#[tokio::test]
async fn pslo_creates_program_with_degree_and_generated_codes() {
  let s = store().await;
  let t = term(&s, "202610").await;
  let report = import(&s, ImportKind::Pslo, Some(t), PSLO_FEED).await;
  assert_eq!(report.imported, 2);

  let program = s.find_program(t, "BIO").await.unwrap().unwrap();
  assert_eq!(program.name, "Biology");
  assert_eq!(program.degree_type.as_deref(), Some("AS"));

  let outcomes = s.list_program_outcomes(program.id).await.unwrap();
  let codes: Vec<_> = outcomes.iter().map(|o| o.outcome_code.clone()).collect();
  assert_eq!(codes, vec![
    format!("PSLO-P{}-1", program.id),
    format!("PSLO-P{}-2", program.id)
  ]);

  let again = import(&s, ImportKind::Pslo, Some(t), PSLO_FEED).await;
  assert_eq!((again.imported, again.duplicates), (0, 2));
}

#[tokio::test]
async fn pslo_matches_existing_program_by_partial_name() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  let report = import(
    &s,
    ImportKind::Pslo,
    Some(t),
    "code,name,seq,id,desc\n,\"Biology Transfer, AS-T\",,,Analyze ecosystems\n",
  )
  .await;
  assert_eq!(report.imported, 1, "{:?}", report.errors);

  let programs = s.list_programs(t).await.unwrap();
  assert_eq!(programs.len(), 1);
  assert_eq!(s.list_program_outcomes(programs[0].id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn cslo_splits_sentences_and_creates_the_course() {
  let s = store().await;
  let t = term(&s, "202610").await;
  let feed = "\u{feff}CRS ID,CRS TITLE,CSLO\n\
              MATH5,Calculus,\"Find limits. Compute derivatives\"\n";

  let report = import(&s, ImportKind::Cslo, Some(t), feed).await;
  assert_eq!((report.imported, report.skipped), (2, 0));

  let course = s.find_course(t, "MATH5").await.unwrap().unwrap();
  assert_eq!(course.name, "Calculus");
  assert_eq!(course.program_id, None);

  let slos = s.list_slos(course.id).await.unwrap();
  let got: Vec<_> = slos
    .iter()
    .map(|o| (o.slo_code.as_str(), o.description.as_str(), o.sequence_num))
    .collect();
  assert_eq!(got, vec![
    ("CSLO-MATH5-1", "Find limits.", 1),
    ("CSLO-MATH5-2", "Compute derivatives.", 2),
  ]);

  let again = import(&s, ImportKind::Cslo, Some(t), feed).await;
  assert_eq!((again.imported, again.duplicates, again.skipped), (0, 2, 0));
}

#[tokio::test]
async fn sequence_continues_across_rows_of_one_course() {
  let s = store().await;
  let t = term(&s, "202610").await;
  import(
    &s,
    ImportKind::Cslo,
    Some(t),
    "CRS ID,CRS TITLE,CSLO\n\
     ENG1,Composition,Write essays. Cite sources. Revise drafts.\n\
     ENG1,Composition,Present findings\n",
  )
  .await;

  let course = s.find_course(t, "ENG1").await.unwrap().unwrap();
  let seqs: Vec<_> = s
    .list_slos(course.id)
    .await
    .unwrap()
    .iter()
    .map(|o| o.sequence_num)
    .collect();
  assert_eq!(seqs, vec![1, 2, 3, 4]);
}

// ─── Ingestion: upserts and row isolation ────────────────────────────────────

#[tokio::test]
async fn seeded_feeds_produce_expected_counts_and_audit() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;
  assert_eq!(s.term_counts(t).await.unwrap(), SEEDED);

  let creators = s
    .query_column("SELECT DISTINCT created_by FROM courses")
    .await
    .unwrap();
  assert_eq!(creators, vec!["tester"]);
}

#[tokio::test]
async fn failing_row_is_reported_and_others_land() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  let report = import(
    &s,
    ImportKind::Courses,
    Some(t),
    "program_code,course_number,course_name\n\
     BIO,BIO201,Ecology\n\
     NOPE,BIO202,Botany\n\
     BIO,BIO203,Zoology\n",
  )
  .await;
  assert_eq!((report.imported, report.skipped), (2, 1));
  assert_eq!(report.errors, vec!["line 3: unknown program NOPE"]);
  assert!(s.find_course(t, "BIO202").await.unwrap().is_none());
  assert!(s.find_course(t, "BIO203").await.unwrap().is_some());
}

#[tokio::test]
async fn blank_fields_keep_existing_values() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  let blank = import(
    &s,
    ImportKind::Slos,
    Some(t),
    "course_number,slo_code,description\nBIO101,SLO-1,\n",
  )
  .await;
  assert_eq!((blank.updated, blank.duplicates), (0, 1));

  let changed = import(
    &s,
    ImportKind::Slos,
    Some(t),
    "course_number,slo_code,description\nBIO101,SLO-1,Explain animal cells\n",
  )
  .await;
  assert_eq!(changed.updated, 1);

  let course = s.find_course(t, "BIO101").await.unwrap().unwrap();
  let slos = s.list_slos(course.id).await.unwrap();
  assert_eq!(slos[0].description, "Explain animal cells");
  assert_eq!(slos.len(), 2);
}

#[tokio::test]
async fn database_failure_rolls_back_only_its_row() {
  let s = store().await;
  let t = term(&s, "202610").await;
  s.execute_raw(
    "CREATE TRIGGER explode BEFORE INSERT ON student_learning_outcomes
     WHEN NEW.description = 'Explode.'
     BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
  )
  .await
  .unwrap();

  let report = import(
    &s,
    ImportKind::Cslo,
    Some(t),
    "CRS ID,CRS TITLE,CSLO\n\
     OK1,First,Works fine.\n\
     BAD1,Broken,Explode.\n\
     OK2,Second,Also fine.\n",
  )
  .await;
  assert_eq!((report.imported, report.skipped), (2, 1));
  assert!(report.errors[0].starts_with("line 3: database error"));
  assert!(report.errors[0].contains("injected failure"));

  // The course created earlier in the failing row went with it.
  assert!(s.find_course(t, "BAD1").await.unwrap().is_none());
  assert!(s.find_course(t, "OK1").await.unwrap().is_some());
  assert!(s.find_course(t, "OK2").await.unwrap().is_some());
}

#[tokio::test]
async fn report_messages_are_bounded() {
  let s = store().await;
  let t = term(&s, "202610").await;
  let mut req = request(
    ImportKind::Slos,
    Some(t),
    "course_number,slo_code,description\n\
     X1,S,d\nX2,S,d\nX3,S,d\nX4,S,d\nX5,S,d\n",
  );
  req.scope.max_messages = 2;

  let report = s.import(req).await.unwrap();
  assert_eq!(report.skipped, 5);
  assert_eq!(report.errors, vec![
    "line 2: unknown course X1",
    "line 3: unknown course X2",
    "... and 3 more not shown",
  ]);
}

// ─── Ingestion: roster ───────────────────────────────────────────────────────

#[tokio::test]
async fn enrollment_creates_term_and_student_and_merges_names() {
  let s = store().await;
  let first = import(
    &s,
    ImportKind::Enrollment,
    None,
    "BannerTerm,TermCode,StudentID,SectionID,FirstName,LastName\n\
     202630,FA26,C001,50001,Ada,Lovelace\n",
  )
  .await;
  assert_eq!(first.imported, 1, "{:?}", first.errors);

  let t = s.find_term("202630").await.unwrap().unwrap();
  assert_eq!(t.name.as_deref(), Some("FA26"));

  let update = "BannerTerm,StudentID,SectionID,FirstName,LastName\n\
                202630,C001,50001,,Byron\n";
  let second = import(&s, ImportKind::Enrollment, None, update).await;
  assert_eq!(second.updated, 1);

  let student = s.find_student("C001").await.unwrap().unwrap();
  assert_eq!(student.first_name.as_deref(), Some("Ada"));
  assert_eq!(student.last_name.as_deref(), Some("Byron"));

  let third = import(&s, ImportKind::Enrollment, None, update).await;
  assert_eq!(third.duplicates, 1);
  assert!(s.find_enrollment(t.id, "50001", "C001").await.unwrap().is_some());
}

#[tokio::test]
async fn enrollment_without_banner_term_uses_scope_term() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  import(
    &s,
    ImportKind::Enrollment,
    Some(t),
    "StudentID,SectionID\nC002,40003\n",
  )
  .await;
  let enrollment = s.find_enrollment(t, "40003", "C002").await.unwrap().unwrap();
  let course = s.find_course(t, "BIO102").await.unwrap().unwrap();
  assert_eq!(enrollment.course_id, Some(course.id));
  assert!(enrollment.section_id.is_some());
}

#[tokio::test]
async fn enrollment_without_any_term_is_skipped() {
  let s = store().await;
  let report = import(
    &s,
    ImportKind::Enrollment,
    None,
    "StudentID,SectionID\nC002,40003\n",
  )
  .await;
  assert_eq!(report.skipped, 1);
  assert!(s.find_student("C002").await.unwrap().is_none());
}

#[tokio::test]
async fn enrollment_ignores_sections_of_other_terms() {
  let s = store().await;
  let fall = term(&s, "202610").await;
  let spring = term(&s, "202620").await;
  seed(&s, fall).await;

  let report = import(
    &s,
    ImportKind::Enrollment,
    Some(spring),
    "StudentID,SectionID\nC001,40001\n",
  )
  .await;
  assert_eq!(report.imported, 1, "{:?}", report.errors);

  let enrollment = s
    .find_enrollment(spring, "40001", "C001")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(enrollment.section_id, None);
  assert_eq!(enrollment.course_id, None);
}

#[tokio::test]
async fn assessments_resolve_through_enrollment_and_respect_finalized() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;
  import(
    &s,
    ImportKind::Enrollment,
    Some(t),
    "StudentID,SectionID,FirstName\nC001,40001,Ada\n",
  )
  .await;

  let report = import(
    &s,
    ImportKind::Assessments,
    Some(t),
    "StudentID,CRN,SLO,Score,AchievementLevel\n\
     C001,40001,SLO-1,3.5,Meets\n\
     C001,40001,SLO-9,2,Low\n\
     C009,40001,SLO-1,1,Low\n",
  )
  .await;
  assert_eq!((report.imported, report.skipped), (1, 2));
  assert_eq!(report.errors, vec![
    "line 3: unknown SLO SLO-9",
    "line 4: unknown student C009",
  ]);

  let enrollment = s.find_enrollment(t, "40001", "C001").await.unwrap().unwrap();
  let assessments = s.list_assessments(enrollment.id).await.unwrap();
  assert_eq!(assessments.len(), 1);
  assert_eq!(assessments[0].score, Some(3.5));
  assert_eq!(assessments[0].achievement_level.as_deref(), Some("Meets"));

  s.execute_raw("UPDATE assessments SET is_finalized = 1")
    .await
    .unwrap();
  let locked = import(
    &s,
    ImportKind::Assessments,
    Some(t),
    "StudentID,CRN,SLO,Score\nC001,40001,SLO-1,4\n",
  )
  .await;
  assert_eq!(locked.skipped, 1);
  assert!(locked.errors[0].contains("finalized"));
  let assessments = s.list_assessments(enrollment.id).await.unwrap();
  assert_eq!(assessments[0].score, Some(3.5));
}

// ─── Replication ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn replication_copies_every_level() {
  let s = store().await;
  let source = term(&s, "202610").await;
  let target = term(&s, "202710").await;
  seed(&s, source).await;

  let summary = s.replicate_term(source, target, Some("copier".into())).await.unwrap();
  assert_eq!(summary, ReplicationSummary {
    programs: 1,
    outcomes: 2,
    courses:  2,
    sections: 3,
    slos:     3,
  });
  assert_eq!(s.term_counts(target).await.unwrap(), SEEDED);
  assert_eq!(s.term_counts(source).await.unwrap(), SEEDED);

  let program = s.find_program(target, "BIO").await.unwrap().unwrap();
  let course = s.find_course(target, "BIO101").await.unwrap().unwrap();
  assert_eq!(course.program_id, Some(program.id));
  let codes: Vec<_> = s
    .list_slos(course.id)
    .await
    .unwrap()
    .into_iter()
    .map(|o| o.slo_code)
    .collect();
  assert_eq!(codes, vec!["SLO-1", "SLO-2"]);

  let crns = s
    .query_column("SELECT crn FROM course_sections WHERE crn LIKE 'BIO%' ORDER BY crn")
    .await
    .unwrap();
  assert_eq!(crns, vec![
    format!("BIO101-01-T{target}"),
    format!("BIO101-02-T{target}"),
    format!("BIO102-01-T{target}"),
  ]);
}

#[tokio::test]
async fn replication_is_idempotent() {
  let s = store().await;
  let source = term(&s, "202610").await;
  let target = term(&s, "202710").await;
  seed(&s, source).await;

  let first = s.replicate_term(source, target, None).await.unwrap();
  let second = s.replicate_term(source, target, None).await.unwrap();
  assert_eq!(first, second);
  assert_eq!(s.term_counts(target).await.unwrap(), SEEDED);
}

#[tokio::test]
async fn replication_preconditions() {
  let s = store().await;
  let source = term(&s, "202610").await;
  seed(&s, source).await;

  let same = s.replicate_term(source, source, None).await.unwrap_err();
  assert!(matches!(same, Error::SameTerm(id) if id == source));

  let missing = s.replicate_term(source, 999, None).await.unwrap_err();
  assert!(matches!(missing, Error::TermNotFound(999)));
}

#[tokio::test]
async fn failed_replication_leaves_target_untouched() {
  let s = store().await;
  let source = term(&s, "202610").await;
  let target = term(&s, "202710").await;
  seed(&s, source).await;
  s.execute_raw(
    "CREATE TRIGGER explode BEFORE INSERT ON course_sections
     WHEN NEW.crn LIKE 'BIO102-%'
     BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
  )
  .await
  .unwrap();

  let err = s.replicate_term(source, target, None).await.unwrap_err();
  assert!(matches!(err, Error::Sqlite(_)));
  assert!(s.term_counts(target).await.unwrap().is_empty());
  assert_eq!(s.term_counts(source).await.unwrap(), SEEDED);
}

/// A course attached to the term directly, with one section and two SLOs.
async fn seed_term_course(s: &SqliteStore, t: TermId) {
  let report = import(
    s,
    ImportKind::Cslo,
    Some(t),
    "CRS ID,CRS TITLE,CSLO\nMATH5,Calculus,\"Find limits. Compute derivatives\"\n",
  )
  .await;
  assert_eq!(report.imported, 2, "{:?}", report.errors);
  let report = import(
    s,
    ImportKind::Sections,
    Some(t),
    "crn,course_number,section_number\n50001,MATH5,01\n",
  )
  .await;
  assert_eq!(report.imported, 1, "{:?}", report.errors);
}

const TERM_COURSE_ONLY: TermCounts = TermCounts {
  programs: 0,
  outcomes: 0,
  courses:  1,
  sections: 1,
  slos:     2,
};

#[tokio::test]
async fn replication_copies_courses_without_a_program() {
  let s = store().await;
  let source = term(&s, "202610").await;
  let target = term(&s, "202710").await;
  seed_term_course(&s, source).await;

  let first = s.replicate_term(source, target, None).await.unwrap();
  assert_eq!(first, ReplicationSummary {
    programs: 0,
    outcomes: 0,
    courses:  1,
    sections: 1,
    slos:     2,
  });
  let second = s.replicate_term(source, target, None).await.unwrap();
  assert_eq!(first, second);
  assert_eq!(s.term_counts(target).await.unwrap(), TERM_COURSE_ONLY);

  let course = s.find_course(target, "MATH5").await.unwrap().unwrap();
  assert_eq!(course.program_id, None);
  assert_eq!(course.term_id, Some(target));
  let crns = s
    .query_column("SELECT crn FROM course_sections WHERE crn LIKE 'MATH5-%'")
    .await
    .unwrap();
  assert_eq!(crns, vec![format!("MATH5-01-T{target}")]);
}

// ─── Clear ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_removes_the_whole_graph() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  let summary = s.clear_term(t).await.unwrap();
  assert_eq!(summary, ClearSummary {
    programs: 1,
    outcomes: 2,
    courses:  2,
    sections: 3,
    slos:     3,
  });
  assert!(s.term_counts(t).await.unwrap().is_empty());

  let again = s.clear_term(t).await.unwrap();
  assert_eq!(again, ClearSummary::default());
}

#[tokio::test]
async fn clear_removes_courses_of_a_term_without_programs() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed_term_course(&s, t).await;
  assert_eq!(s.term_counts(t).await.unwrap(), TERM_COURSE_ONLY);

  let summary = s.clear_term(t).await.unwrap();
  assert_eq!(summary, ClearSummary {
    programs: 0,
    outcomes: 0,
    courses:  1,
    sections: 1,
    slos:     2,
  });
  assert!(s.term_counts(t).await.unwrap().is_empty());
  assert!(s.find_course(t, "MATH5").await.unwrap().is_none());
}

#[tokio::test]
async fn clear_then_replicate_matches_fresh_replication() {
  let s = store().await;
  let source = term(&s, "202610").await;
  let target = term(&s, "202710").await;
  seed(&s, source).await;

  let fresh = s.replicate_term(source, target, None).await.unwrap();
  s.clear_term(target).await.unwrap();
  let replay = s.replicate_term(source, target, None).await.unwrap();

  assert_eq!(fresh, replay);
  assert_eq!(s.term_counts(target).await.unwrap(), SEEDED);
}

#[tokio::test]
async fn clear_is_refused_while_assessments_exist() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;
  assess(&s, t).await;

  let err = s.clear_term(t).await.unwrap_err();
  assert!(matches!(err, Error::HasDependents { .. }));
  assert_eq!(s.term_counts(t).await.unwrap(), SEEDED);
}

#[tokio::test]
async fn clear_keeps_enrollments_and_unlinks_them() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;
  import(
    &s,
    ImportKind::Enrollment,
    Some(t),
    "StudentID,SectionID\nC001,40001\n",
  )
  .await;

  s.clear_term(t).await.unwrap();
  let enrollment = s.find_enrollment(t, "40001", "C001").await.unwrap().unwrap();
  assert_eq!(enrollment.section_id, None);
  assert_eq!(enrollment.course_id, None);
}

// ─── Guarded deletes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_refuses_entities_with_dependents() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;
  assess(&s, t).await;

  let program = s.find_program(t, "BIO").await.unwrap().unwrap();
  let err = s.delete(EntityRef::Program(program.id)).await.unwrap_err();
  assert!(matches!(err, Error::HasDependents { .. }));

  let course = s.find_course(t, "BIO101").await.unwrap().unwrap();
  let err = s.delete(EntityRef::Course(course.id)).await.unwrap_err();
  assert!(matches!(err, Error::HasDependents { .. }));

  let assessed = s.list_slos(course.id).await.unwrap()[0].id;
  let err = s.delete(EntityRef::Slo(assessed)).await.unwrap_err();
  assert!(matches!(err, Error::HasDependents { .. }));

  assert_eq!(s.term_counts(t).await.unwrap(), SEEDED);
}

#[tokio::test]
async fn delete_course_takes_its_sections_and_slos() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  let course = s.find_course(t, "BIO102").await.unwrap().unwrap();
  s.delete(EntityRef::Course(course.id)).await.unwrap();
  assert_eq!(s.term_counts(t).await.unwrap(), TermCounts {
    courses: 1,
    sections: 2,
    slos: 2,
    ..SEEDED
  });
}

#[tokio::test]
async fn delete_unassessed_slo_and_unknown_ids() {
  let s = store().await;
  let t = term(&s, "202610").await;
  seed(&s, t).await;

  let course = s.find_course(t, "BIO101").await.unwrap().unwrap();
  let slo = s.list_slos(course.id).await.unwrap()[1].id;
  s.delete(EntityRef::Slo(slo)).await.unwrap();
  assert_eq!(s.list_slos(course.id).await.unwrap().len(), 1);

  let err = s.delete(EntityRef::Course(9999)).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(EntityRef::Course(9999))));
}
