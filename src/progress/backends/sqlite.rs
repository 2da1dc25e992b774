use chrono::{DateTime, Utc};

use crate::db::DbPool;
use crate::progress::store::{DocumentKey, DocumentStore, ProgressDocument, ProgressPatch, StoreError};

/// Progress documents in the app's SQLite database
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
  pool: DbPool,
}

impl SqliteDocumentStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

fn decode_json<T: serde::de::DeserializeOwned>(
  column: &str,
  raw: Option<String>,
) -> Result<Option<T>, StoreError> {
  raw
    .map(|json| {
      serde_json::from_str(&json).map_err(|e| StoreError::Malformed(format!("{}: {}", column, e)))
    })
    .transpose()
}

fn encode_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>, StoreError> {
  value
    .as_ref()
    .map(|v| serde_json::to_string(v).map_err(|e| StoreError::Malformed(e.to_string())))
    .transpose()
}

impl DocumentStore for SqliteDocumentStore {
  async fn get(&self, key: &DocumentKey) -> Result<Option<ProgressDocument>, StoreError> {
    let row: Option<(Option<String>, Option<String>, Option<DateTime<Utc>>)> = sqlx::query_as(
      r#"
      SELECT completed_weeks_json, completed_workouts_json, last_updated
      FROM progress_documents
      WHERE doc_key = ?1
      "#,
    )
    .bind(key.as_str())
    .fetch_optional(&self.pool)
    .await?;

    let Some((weeks_json, workouts_json, last_updated)) = row else {
      return Ok(None);
    };

    Ok(Some(ProgressDocument {
      completed_weeks: decode_json("completed_weeks_json", weeks_json)?,
      completed_workouts: decode_json("completed_workouts_json", workouts_json)?,
      last_updated,
    }))
  }

  async fn merge(&self, key: &DocumentKey, patch: &ProgressPatch) -> Result<(), StoreError> {
    let weeks_json = encode_json(&patch.completed_weeks)?;
    let workouts_json = encode_json(&patch.completed_workouts)?;

    sqlx::query(
      r#"
      INSERT INTO progress_documents (
        doc_key, completed_weeks_json, completed_workouts_json, last_updated
      )
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(doc_key) DO UPDATE SET
        completed_weeks_json = COALESCE(excluded.completed_weeks_json, completed_weeks_json),
        completed_workouts_json = COALESCE(excluded.completed_workouts_json, completed_workouts_json),
        last_updated = excluded.last_updated
      "#,
    )
    .bind(key.as_str())
    .bind(weeks_json)
    .bind(workouts_json)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}
