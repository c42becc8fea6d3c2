//! SQLite-backed candidate store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::candidate::assembler::{RecordStore, UpsertOutcome};
use crate::candidate::model::{CandidateRecord, ImportMethod};
use crate::error::Result;

/// Candidate storage and dedup lookup over SQLite.
pub struct CandidateStore {
    pool: SqlitePool,
}

impl CandidateStore {
    /// Opens (creating if needed) the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS candidates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                email TEXT NOT NULL UNIQUE,
                phone TEXT,
                source TEXT NOT NULL DEFAULT '',
                import_method TEXT NOT NULL DEFAULT 'manual',
                skills_json TEXT NOT NULL DEFAULT '[]',
                education TEXT,
                experience TEXT,
                has_resume INTEGER NOT NULL DEFAULT 0,
                resume_filename TEXT,
                history_json TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_candidates_email
            ON candidates(email)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for CandidateStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>> {
        let row = sqlx::query(
            r"
            SELECT name, email, phone, source, import_method, skills_json,
                   education, experience, has_resume, resume_filename, history_json
            FROM candidates
            WHERE email = ?
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let skills_json: String = row.get("skills_json");
        let history_json: String = row.get("history_json");
        let method: String = row.get("import_method");

        Ok(Some(CandidateRecord {
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            source: row.get("source"),
            import_method: ImportMethod::parse(&method),
            skills: serde_json::from_str(&skills_json)?,
            education: row.get("education"),
            experience: row.get("experience"),
            has_resume: row.get::<bool, _>("has_resume"),
            resume_filename: row.get("resume_filename"),
            history: serde_json::from_str(&history_json)?,
        }))
    }

    async fn upsert(&self, record: &CandidateRecord) -> Result<UpsertOutcome> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM candidates WHERE email = ?")
            .bind(&record.email)
            .fetch_optional(&self.pool)
            .await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"
            INSERT INTO candidates
                (name, email, phone, source, import_method, skills_json,
                 education, experience, has_resume, resume_filename, history_json,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                phone = excluded.phone,
                source = excluded.source,
                import_method = excluded.import_method,
                skills_json = excluded.skills_json,
                education = excluded.education,
                experience = excluded.experience,
                has_resume = excluded.has_resume,
                resume_filename = excluded.resume_filename,
                history_json = excluded.history_json,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.source)
        .bind(record.import_method.as_str())
        .bind(serde_json::to_string(&record.skills)?)
        .bind(&record.education)
        .bind(&record.experience)
        .bind(record.has_resume)
        .bind(&record.resume_filename)
        .bind(serde_json::to_string(&record.history)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM candidates WHERE email = ?")
            .bind(&record.email)
            .fetch_one(&self.pool)
            .await?;

        Ok(UpsertOutcome {
            id,
            created: existing.is_none(),
        })
    }
}
