//! SQL schema for the outcomes SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Every curriculum table carries `is_active` and the four audit columns.
/// Timestamps are RFC 3339 strings.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS terms (
    term_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    banner_term   TEXT NOT NULL UNIQUE,
    academic_year TEXT,
    term_name     TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_by    TEXT,
    updated_by    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS institutions (
    institution_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    institution_code TEXT NOT NULL UNIQUE,
    institution_name TEXT,
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_by       TEXT,
    updated_by       TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS institutional_outcomes (
    islo_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    institution_fk INTEGER NOT NULL REFERENCES institutions(institution_id),
    islo_code      TEXT NOT NULL,
    description    TEXT NOT NULL,
    sequence_num   INTEGER NOT NULL,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_by     TEXT,
    updated_by     TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (institution_fk, islo_code)
);

CREATE TABLE IF NOT EXISTS programs (
    program_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    term_fk      INTEGER REFERENCES terms(term_id),
    program_code TEXT NOT NULL,
    program_name TEXT NOT NULL,
    degree_type  TEXT,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_by   TEXT,
    updated_by   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (term_fk, program_code)
);

CREATE TABLE IF NOT EXISTS program_outcomes (
    program_outcome_id INTEGER PRIMARY KEY AUTOINCREMENT,
    program_fk         INTEGER NOT NULL REFERENCES programs(program_id),
    islo_fk            INTEGER REFERENCES institutional_outcomes(islo_id),
    outcome_code       TEXT NOT NULL,
    description        TEXT NOT NULL,
    sequence_num       INTEGER NOT NULL,
    is_active          INTEGER NOT NULL DEFAULT 1,
    created_by         TEXT,
    updated_by         TEXT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    UNIQUE (program_fk, outcome_code)
);

-- A course hangs off a program, or directly off a term when program_fk
-- is NULL. term_fk is always populated.
CREATE TABLE IF NOT EXISTS courses (
    course_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    program_fk    INTEGER REFERENCES programs(program_id),
    term_fk       INTEGER REFERENCES terms(term_id),
    course_number TEXT NOT NULL,
    course_name   TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_by    TEXT,
    updated_by    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS course_sections (
    section_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    course_fk      INTEGER NOT NULL REFERENCES courses(course_id),
    term_fk        INTEGER REFERENCES terms(term_id),
    crn            TEXT NOT NULL UNIQUE,
    section_number TEXT,
    instructor     TEXT,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_by     TEXT,
    updated_by     TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_learning_outcomes (
    slo_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    course_fk    INTEGER NOT NULL REFERENCES courses(course_id),
    slo_code     TEXT NOT NULL,
    description  TEXT NOT NULL,
    sequence_num INTEGER NOT NULL,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_by   TEXT,
    updated_by   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (course_fk, slo_code)
);

CREATE TABLE IF NOT EXISTS students (
    student_id INTEGER PRIMARY KEY AUTOINCREMENT,
    c_number   TEXT NOT NULL UNIQUE,
    first_name TEXT,
    last_name  TEXT,
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_by TEXT,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Enrollments outlive the curriculum rows they point at: clearing a term
-- nulls the section and course links instead of deleting the roster.
CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    term_fk       INTEGER NOT NULL REFERENCES terms(term_id),
    crn           TEXT NOT NULL,
    student_fk    INTEGER NOT NULL REFERENCES students(student_id),
    section_fk    INTEGER REFERENCES course_sections(section_id) ON DELETE SET NULL,
    course_fk     INTEGER REFERENCES courses(course_id) ON DELETE SET NULL,
    part_of_term  TEXT,
    discipline    TEXT,
    created_by    TEXT,
    updated_by    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (term_fk, crn, student_fk)
);

CREATE TABLE IF NOT EXISTS assessments (
    assessment_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    enrollment_fk     INTEGER NOT NULL REFERENCES enrollments(enrollment_id),
    slo_fk            INTEGER NOT NULL REFERENCES student_learning_outcomes(slo_id),
    score             REAL,
    achievement_level TEXT,
    assessment_method TEXT,
    notes             TEXT,
    is_finalized      INTEGER NOT NULL DEFAULT 0,
    created_by        TEXT,
    updated_by        TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (enrollment_fk, slo_fk)
);

CREATE UNIQUE INDEX IF NOT EXISTS courses_term_number_idx ON courses(term_fk, course_number);
CREATE INDEX IF NOT EXISTS courses_program_idx   ON courses(program_fk);
CREATE INDEX IF NOT EXISTS sections_course_idx   ON course_sections(course_fk);
CREATE INDEX IF NOT EXISTS slos_course_idx       ON student_learning_outcomes(course_fk);
CREATE INDEX IF NOT EXISTS assessments_slo_idx   ON assessments(slo_fk);

PRAGMA user_version = 1;
";
