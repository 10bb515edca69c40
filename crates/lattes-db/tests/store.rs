//! Storage tests against a file-backed SQLite database.
//!
//! Run with: cargo test --package lattes-db --test store

use std::sync::Arc;

use lattes_common::{Curriculum, Education, Experience, Institution, KnowledgeArea, Nationality};
use lattes_db::{BatchRows, CurriculumStore, Database, DbError, DedupScope, SqlCurriculumStore};
use tempfile::TempDir;

async fn open_store() -> (TempDir, Arc<Database>, SqlCurriculumStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("lattes.db").display());
    let db = Arc::new(Database::open(&url, 4).await.unwrap());
    db.initialize().await.unwrap();
    let store = SqlCurriculumStore::new(db.clone());
    (dir, db, store)
}

fn curriculum(id: &str, orcid: Option<&str>) -> Curriculum {
    let mut c = Curriculum::empty(id);
    c.researcher.full_name = Some(format!("Researcher {id}"));
    c.researcher.orcid = orcid.map(String::from);
    c.nationality = Some(Nationality {
        born_country: Some("Brasil".into()),
        nationality_code: Some("BRA".into()),
    });
    let uni = Institution {
        code: "UNI001".into(),
        name: Some("Universidade de São Paulo".into()),
        abbreviation: Some("USP".into()),
        country: Some("Brasil".into()),
        state: Some("SP".into()),
    };
    c.education.push(Education {
        category: "DOUTORADO".into(),
        course: Some("Física".into()),
        start_year: Some(2001),
        end_year: Some(2005),
        institution: Some(uni.clone()),
        study_fields: vec![KnowledgeArea {
            major_area: Some("CIENCIAS_EXATAS_E_DA_TERRA".into()),
            area: Some("Física".into()),
            sub_area: None,
            specialty: None,
        }],
    });
    c.experience.push(Experience {
        institution: Some(uni),
        relationship: Some("SERVIDOR_PUBLICO".into()),
        role: None,
        start_year: Some(2006),
        end_year: None,
    });
    c
}

fn rows(batch: &[Curriculum]) -> BatchRows {
    BatchRows::collect(batch, DedupScope::PerResearcher)
}

#[tokio::test]
async fn test_commit_writes_all_tables() {
    let (_dir, db, store) = open_store().await;
    store.commit(&rows(&[curriculum("A", None), curriculum("B", None)])).await.unwrap();

    assert_eq!(db.count("researcher").await.unwrap(), 2);
    assert_eq!(db.count("nationality").await.unwrap(), 2);
    assert_eq!(db.count("education").await.unwrap(), 2);
    assert_eq!(db.count("study_field").await.unwrap(), 2);
    assert_eq!(db.count("experience").await.unwrap(), 2);
    assert_eq!(db.count("institution").await.unwrap(), 1);

    let usp = db.institution("UNI001").await.unwrap().unwrap();
    assert_eq!(usp.abbreviation.as_deref(), Some("USP"));
}

#[tokio::test]
async fn test_reingest_replaces_owned_rows() {
    let (_dir, db, store) = open_store().await;
    store.commit(&rows(&[curriculum("A", None)])).await.unwrap();

    let mut again = curriculum("A", None);
    again.education.clear();
    store.commit(&rows(&[again])).await.unwrap();

    assert_eq!(db.count("researcher").await.unwrap(), 1);
    assert_eq!(db.count("education").await.unwrap(), 0);
    assert_eq!(db.count("study_field").await.unwrap(), 0);
    assert_eq!(db.count("experience").await.unwrap(), 1);
}

#[tokio::test]
async fn test_institution_upsert_keeps_known_fields() {
    let (_dir, db, store) = open_store().await;
    store.commit(&rows(&[curriculum("A", None)])).await.unwrap();

    let mut b = curriculum("B", None);
    for edu in b.education.iter_mut() {
        edu.institution = Some(Institution::new("UNI001", Some("USP".into())));
    }
    b.experience.clear();
    store.commit(&rows(&[b])).await.unwrap();

    let usp = db.institution("UNI001").await.unwrap().unwrap();
    assert_eq!(usp.name.as_deref(), Some("USP"));
    assert_eq!(usp.state.as_deref(), Some("SP"), "null incoming value must not erase a stored one");
    assert_eq!(db.count("institution").await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_batch_commits_nothing() {
    let (_dir, db, store) = open_store().await;
    sqlx::query("CREATE UNIQUE INDEX ux_researcher_orcid ON researcher(orcid) WHERE orcid IS NOT NULL")
        .execute(db.pool())
        .await
        .unwrap();

    let batch = [
        curriculum("A", Some("0000-0001")),
        curriculum("B", Some("0000-0001")),
        curriculum("C", None),
    ];
    let err = store.commit(&rows(&batch)).await.unwrap_err();
    assert!(matches!(err, DbError::Constraint(_)), "unexpected error: {err}");

    for table in lattes_db::TABLES {
        assert_eq!(db.count(table).await.unwrap(), 0, "{table} should be empty after rollback");
    }
}

#[tokio::test]
async fn test_advising_edges_resolve_by_id() {
    let (_dir, db, store) = open_store().await;
    let mut advisor = curriculum("ADV", None);
    advisor.advising.push(lattes_common::Advising {
        kind: "DOUTORADO".into(),
        year: Some(2015),
        title: Some("Tese".into()),
        student_name: Some("Student".into()),
        student_id: Some("STU".into()),
    });
    store.commit(&rows(&[advisor])).await.unwrap();
    assert!(db.advised_researchers("ADV").await.unwrap().is_empty());

    store.commit(&rows(&[curriculum("STU", None)])).await.unwrap();
    assert_eq!(db.advised_researchers("ADV").await.unwrap(), vec!["STU".to_string()]);
}

#[tokio::test]
async fn test_count_rejects_unknown_table() {
    let (_dir, db, _store) = open_store().await;
    assert!(matches!(db.count("papers").await, Err(DbError::TableNotFound(_))));
}
