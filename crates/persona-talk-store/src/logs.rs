//! Learning log persistence backed by SQLite.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use parking_lot::Mutex;
use persona_talk_protocol::{EmbeddedRecord, Evaluation, LearningLog, Message, Principal};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS learning_logs (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    subject     TEXT NOT NULL,
    topic       TEXT NOT NULL,
    evaluation  TEXT NOT NULL,
    summary     TEXT NOT NULL,
    transcript  TEXT NOT NULL,  -- JSON array of {role, content}
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_learning_logs_user ON learning_logs(user_id);
CREATE INDEX IF NOT EXISTS idx_learning_logs_created_at ON learning_logs(created_at);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, subject, topic, evaluation, summary, transcript, created_at \
     FROM learning_logs";

#[async_trait]
/// Relational store for learning records extracted from tutoring replies.
pub trait LearningLogStore: Send + Sync {
    /// Persist a record with its transcript snapshot on behalf of `principal`.
    async fn insert(
        &self,
        principal: &Principal,
        record: &EmbeddedRecord,
        transcript: &[Message],
    ) -> Result<LearningLog, StoreError>;

    /// All records, newest first. Only a signed-in `principal` may list them.
    async fn list_all(&self, principal: &Principal) -> Result<Vec<LearningLog>, StoreError>;

    /// Records owned by one user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<LearningLog>, StoreError>;
}

/// SQLite-backed learning log store.
///
/// A single connection guarded by a mutex; every call is short and never
/// holds the lock across an await point.
pub struct SqliteLearningLogStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteLearningLogStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        info!("opened learning log store (path={})", path.display());
        Ok(Self {
            path: Some(path),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database location, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn insert_row(&self, log: &LearningLog) -> Result<(), StoreError> {
        let transcript = serde_json::to_string(&log.transcript)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO learning_logs \
             (id, user_id, subject, topic, evaluation, summary, transcript, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                log.id.to_string(),
                log.user_id,
                log.subject,
                log.topic,
                log.evaluation.as_str(),
                log.summary,
                transcript,
                log.created_at,
            ],
        )?;
        Ok(())
    }

    fn query(&self, user_id: Option<&str>) -> Result<Vec<LearningLog>, StoreError> {
        let conn = self.conn.lock();
        let mut logs = Vec::new();
        match user_id {
            Some(user_id) => {
                let sql =
                    format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![user_id], row_to_log)?;
                for row in rows {
                    logs.push(row?);
                }
            }
            None => {
                let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], row_to_log)?;
                for row in rows {
                    logs.push(row?);
                }
            }
        }
        Ok(logs)
    }
}

#[async_trait]
impl LearningLogStore for SqliteLearningLogStore {
    async fn insert(
        &self,
        principal: &Principal,
        record: &EmbeddedRecord,
        transcript: &[Message],
    ) -> Result<LearningLog, StoreError> {
        let log = LearningLog {
            id: Uuid::new_v4(),
            user_id: principal.user_id.clone(),
            subject: record.subject.clone(),
            topic: record.topic.clone(),
            evaluation: record.evaluation,
            summary: record.summary.clone(),
            transcript: transcript.to_vec(),
            created_at: Utc::now(),
        };
        self.insert_row(&log)?;
        debug!(
            "stored learning log (id={}, user_id={}, evaluation={}, transcript_len={})",
            log.id,
            log.user_id,
            log.evaluation,
            log.transcript.len()
        );
        Ok(log)
    }

    async fn list_all(&self, principal: &Principal) -> Result<Vec<LearningLog>, StoreError> {
        let logs = self.query(None)?;
        debug!(
            "listed learning logs (requested_by={}, count={})",
            principal.user_id,
            logs.len()
        );
        Ok(logs)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<LearningLog>, StoreError> {
        let logs = self.query(Some(user_id))?;
        debug!(
            "listed learning logs (user_id={user_id}, count={})",
            logs.len()
        );
        Ok(logs)
    }
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<LearningLog> {
    let id: String = row.get(0)?;
    let evaluation: String = row.get(4)?;
    let transcript: String = row.get(6)?;
    Ok(LearningLog {
        id: Uuid::parse_str(&id).map_err(|err| conversion_error(0, err))?,
        user_id: row.get(1)?,
        subject: row.get(2)?,
        topic: row.get(3)?,
        evaluation: evaluation
            .parse::<Evaluation>()
            .map_err(|err| conversion_error(4, err))?,
        summary: row.get(5)?,
        transcript: serde_json::from_str(&transcript).map_err(|err| conversion_error(6, err))?,
        created_at: row.get(7)?,
    })
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}
