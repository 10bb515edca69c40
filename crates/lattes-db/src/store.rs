//! Transactional batch writes.
//!
//! `CurriculumStore` is the single storage seam used by the ingestion
//! pipeline: commit every row of a batch, or none of them.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::rows::BatchRows;
use crate::schema::DELETE_OWNED_STATEMENTS;

/// Commit a batch of rows in one all-or-nothing transaction.
#[async_trait]
pub trait CurriculumStore: Send + Sync {
    async fn commit(&self, rows: &BatchRows) -> Result<()>;
}

/// SQLite implementation of [`CurriculumStore`].
#[derive(Clone)]
pub struct SqlCurriculumStore {
    db: Arc<Database>,
}

impl SqlCurriculumStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CurriculumStore for SqlCurriculumStore {
    async fn commit(&self, rows: &BatchRows) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.pool().begin().await?;

        match write_rows(&mut *tx, rows).await {
            Ok(()) => {
                tx.commit().await.map_err(DbError::classify)?;
                tracing::debug!(
                    researchers = rows.researchers.len(),
                    rows = rows.row_count(),
                    "Batch committed"
                );
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn write_rows(conn: &mut SqliteConnection, rows: &BatchRows) -> Result<()> {
    // ── Institutions (upsert by code) ────────────────────────────────────────
    for inst in &rows.institutions {
        sqlx::query(
            r#"
            INSERT INTO institution (code, name, abbreviation, country, state)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET
                name         = COALESCE(excluded.name, institution.name),
                abbreviation = COALESCE(excluded.abbreviation, institution.abbreviation),
                country      = COALESCE(excluded.country, institution.country),
                state        = COALESCE(excluded.state, institution.state)
            "#,
        )
        .bind(&inst.code)
        .bind(&inst.name)
        .bind(&inst.abbreviation)
        .bind(&inst.country)
        .bind(&inst.state)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    // ── Researchers (delete owned rows, then reinsert) ───────────────────────
    for researcher in &rows.researchers {
        for statement in DELETE_OWNED_STATEMENTS {
            sqlx::query(statement)
                .bind(&researcher.id)
                .execute(&mut *conn)
                .await
                .map_err(DbError::classify)?;
        }

        sqlx::query(
            r#"
            INSERT INTO researcher (id, full_name, citation_names, orcid, abstract_text)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&researcher.id)
        .bind(&researcher.full_name)
        .bind(&researcher.citation_names)
        .bind(&researcher.orcid)
        .bind(&researcher.abstract_text)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    for (researcher_id, nationality) in &rows.nationalities {
        sqlx::query(
            "INSERT INTO nationality (researcher_id, born_country, nationality_code) VALUES (?, ?, ?)",
        )
        .bind(researcher_id)
        .bind(&nationality.born_country)
        .bind(&nationality.nationality_code)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    for row in &rows.expertise {
        sqlx::query(
            r#"
            INSERT INTO expertise (researcher_id, position, major_area, area, sub_area, specialty)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.researcher_id)
        .bind(row.position)
        .bind(&row.area.major_area)
        .bind(&row.area.area)
        .bind(&row.area.sub_area)
        .bind(&row.area.specialty)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    // ── Education + nested study fields ──────────────────────────────────────
    for row in &rows.education {
        let education_id = sqlx::query(
            r#"
            INSERT INTO education
                (researcher_id, category, course, start_year, end_year, institution_code)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.researcher_id)
        .bind(&row.category)
        .bind(&row.course)
        .bind(row.start_year)
        .bind(row.end_year)
        .bind(&row.institution_code)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?
        .last_insert_rowid();

        for field in &row.study_fields {
            sqlx::query(
                r#"
                INSERT INTO study_field (education_id, major_area, area, sub_area, specialty)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(education_id)
            .bind(&field.major_area)
            .bind(&field.area)
            .bind(&field.sub_area)
            .bind(&field.specialty)
            .execute(&mut *conn)
            .await
            .map_err(DbError::classify)?;
        }
    }

    for row in &rows.experience {
        sqlx::query(
            r#"
            INSERT INTO experience
                (researcher_id, institution_code, relationship, role, start_year, end_year)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.researcher_id)
        .bind(&row.institution_code)
        .bind(&row.relationship)
        .bind(&row.role)
        .bind(row.start_year)
        .bind(row.end_year)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    for row in &rows.addresses {
        let a = &row.address;
        sqlx::query(
            r#"
            INSERT INTO address
                (researcher_id, country, state, city, neighborhood,
                 postal_code, public_place, institution_code)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.researcher_id)
        .bind(&a.country)
        .bind(&a.state)
        .bind(&a.city)
        .bind(&a.neighborhood)
        .bind(&a.postal_code)
        .bind(&a.public_place)
        .bind(&row.institution_code)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    for row in &rows.advising {
        let adv = &row.advising;
        sqlx::query(
            r#"
            INSERT INTO advising (advisor_id, student_id, student_name, kind, year, title)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.advisor_id)
        .bind(&adv.student_id)
        .bind(&adv.student_name)
        .bind(&adv.kind)
        .bind(adv.year)
        .bind(&adv.title)
        .execute(&mut *conn)
        .await
        .map_err(DbError::classify)?;
    }

    Ok(())
}
