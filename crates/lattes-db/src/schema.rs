//! Relational schema for ingested curricula.
//!
//! Researcher-owned rows are deleted and reinserted on re-ingestion.
//! `institution` is keyed by the vendor code and only ever upserted.

// =============================================================================
// Table names
// =============================================================================

pub const TABLE_RESEARCHER: &str = "researcher";
pub const TABLE_NATIONALITY: &str = "nationality";
pub const TABLE_EXPERTISE: &str = "expertise";
pub const TABLE_EDUCATION: &str = "education";
pub const TABLE_STUDY_FIELD: &str = "study_field";
pub const TABLE_EXPERIENCE: &str = "experience";
pub const TABLE_ADDRESS: &str = "address";
pub const TABLE_INSTITUTION: &str = "institution";
pub const TABLE_ADVISING: &str = "advising";

/// Every table created by [`CREATE_STATEMENTS`].
pub const TABLES: &[&str] = &[
    TABLE_INSTITUTION,
    TABLE_RESEARCHER,
    TABLE_NATIONALITY,
    TABLE_EXPERTISE,
    TABLE_EDUCATION,
    TABLE_STUDY_FIELD,
    TABLE_EXPERIENCE,
    TABLE_ADDRESS,
    TABLE_ADVISING,
];

// =============================================================================
// DDL
// =============================================================================

pub const CREATE_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS institution (
        code          TEXT PRIMARY KEY,
        name          TEXT,
        abbreviation  TEXT,
        country       TEXT,
        state         TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS researcher (
        id              TEXT PRIMARY KEY,
        full_name       TEXT,
        citation_names  TEXT,
        orcid           TEXT,
        abstract_text   TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS nationality (
        researcher_id     TEXT PRIMARY KEY REFERENCES researcher(id),
        born_country      TEXT,
        nationality_code  TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS expertise (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        researcher_id  TEXT NOT NULL REFERENCES researcher(id),
        position       INTEGER NOT NULL,
        major_area     TEXT,
        area           TEXT,
        sub_area       TEXT,
        specialty      TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS education (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        researcher_id     TEXT NOT NULL REFERENCES researcher(id),
        category          TEXT NOT NULL,
        course            TEXT,
        start_year        INTEGER,
        end_year          INTEGER,
        institution_code  TEXT REFERENCES institution(code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS study_field (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        education_id  INTEGER NOT NULL REFERENCES education(id),
        major_area    TEXT,
        area          TEXT,
        sub_area      TEXT,
        specialty     TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS experience (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        researcher_id     TEXT NOT NULL REFERENCES researcher(id),
        institution_code  TEXT REFERENCES institution(code),
        relationship      TEXT,
        role              TEXT,
        start_year        INTEGER,
        end_year          INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS address (
        researcher_id     TEXT PRIMARY KEY REFERENCES researcher(id),
        country           TEXT,
        state             TEXT,
        city              TEXT,
        neighborhood      TEXT,
        postal_code       TEXT,
        public_place      TEXT,
        institution_code  TEXT REFERENCES institution(code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS advising (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        advisor_id    TEXT NOT NULL REFERENCES researcher(id),
        student_id    TEXT,
        student_name  TEXT,
        kind          TEXT NOT NULL,
        year          INTEGER,
        title         TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_expertise_researcher ON expertise(researcher_id)",
    "CREATE INDEX IF NOT EXISTS idx_education_researcher ON education(researcher_id)",
    "CREATE INDEX IF NOT EXISTS idx_study_field_education ON study_field(education_id)",
    "CREATE INDEX IF NOT EXISTS idx_experience_researcher ON experience(researcher_id)",
    "CREATE INDEX IF NOT EXISTS idx_advising_advisor ON advising(advisor_id)",
    "CREATE INDEX IF NOT EXISTS idx_advising_student ON advising(student_id)",
];

/// Statements removing every row owned by one researcher, children first.
/// Each takes the researcher id as its only parameter.
pub const DELETE_OWNED_STATEMENTS: &[&str] = &[
    "DELETE FROM study_field WHERE education_id IN (SELECT id FROM education WHERE researcher_id = ?)",
    "DELETE FROM education WHERE researcher_id = ?",
    "DELETE FROM expertise WHERE researcher_id = ?",
    "DELETE FROM experience WHERE researcher_id = ?",
    "DELETE FROM address WHERE researcher_id = ?",
    "DELETE FROM nationality WHERE researcher_id = ?",
    "DELETE FROM advising WHERE advisor_id = ?",
    "DELETE FROM researcher WHERE id = ?",
];
