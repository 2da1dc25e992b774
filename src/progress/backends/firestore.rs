//! Firestore REST backend
//!
//! Documents live in one collection, addressed by the composite document key.
//! Writes go through `documents:commit` with an update mask, so fields not in
//! the patch are left alone, and a server transform stamps `lastUpdated`.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use url::Url;

use crate::config::FirestoreConfig;
use crate::progress::store::{DocumentKey, DocumentStore, ProgressDocument, ProgressPatch, StoreError};

const FIELD_COMPLETED_WEEKS: &str = "completedWeeks";
const FIELD_COMPLETED_WORKOUTS: &str = "completedWorkouts";
const FIELD_LAST_UPDATED: &str = "lastUpdated";

/// ---------------------------------------------------------------------------
/// Wire Format
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
  #[serde(default)]
  fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorResponse {
  error: FirestoreErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorDetail {
  message: String,
}

fn array_values<'a>(field: &'a Value, name: &str) -> Result<&'a [Value], StoreError> {
  let array = field
    .get("arrayValue")
    .ok_or_else(|| StoreError::Malformed(format!("{} is not an array", name)))?;

  Ok(array.get("values").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]))
}

fn decode_weeks(field: &Value) -> Result<Vec<u32>, StoreError> {
  array_values(field, FIELD_COMPLETED_WEEKS)?
    .iter()
    .map(|value| {
      // int64 values arrive as JSON strings
      let parsed = match value.get("integerValue") {
        Some(Value::String(raw)) => raw.parse().ok(),
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
      };
      parsed.ok_or_else(|| StoreError::Malformed(format!("bad week value: {}", value)))
    })
    .collect()
}

fn decode_workouts(field: &Value) -> Result<Vec<String>, StoreError> {
  array_values(field, FIELD_COMPLETED_WORKOUTS)?
    .iter()
    .map(|value| {
      value
        .get("stringValue")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Malformed(format!("bad workout value: {}", value)))
    })
    .collect()
}

fn decode_timestamp(field: &Value) -> Option<DateTime<Utc>> {
  let raw = field.get("timestampValue")?.as_str()?;
  DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.with_timezone(&Utc))
}

impl FirestoreDocument {
  fn into_progress(self) -> Result<ProgressDocument, StoreError> {
    Ok(ProgressDocument {
      completed_weeks: self.fields.get(FIELD_COMPLETED_WEEKS).map(decode_weeks).transpose()?,
      completed_workouts: self
        .fields
        .get(FIELD_COMPLETED_WORKOUTS)
        .map(decode_workouts)
        .transpose()?,
      last_updated: self.fields.get(FIELD_LAST_UPDATED).and_then(decode_timestamp),
    })
  }
}

fn encode_patch(patch: &ProgressPatch) -> (Map<String, Value>, Vec<&'static str>) {
  let mut fields = Map::new();
  let mut mask = Vec::new();

  if let Some(weeks) = &patch.completed_weeks {
    let values: Vec<Value> = weeks
      .iter()
      .map(|week| json!({ "integerValue": week.to_string() }))
      .collect();
    fields.insert(FIELD_COMPLETED_WEEKS.into(), json!({ "arrayValue": { "values": values } }));
    mask.push(FIELD_COMPLETED_WEEKS);
  }

  if let Some(workouts) = &patch.completed_workouts {
    let values: Vec<Value> = workouts
      .iter()
      .map(|id| json!({ "stringValue": id }))
      .collect();
    fields.insert(FIELD_COMPLETED_WORKOUTS.into(), json!({ "arrayValue": { "values": values } }));
    mask.push(FIELD_COMPLETED_WORKOUTS);
  }

  (fields, mask)
}

/// ---------------------------------------------------------------------------
/// Store
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FirestoreDocumentStore {
  client: Client,
  config: FirestoreConfig,
}

impl FirestoreDocumentStore {
  pub fn new(config: FirestoreConfig) -> Self {
    Self {
      client: Client::new(),
      config,
    }
  }

  fn database_path(&self) -> String {
    format!(
      "projects/{}/databases/{}/documents",
      self.config.project_id, self.config.database
    )
  }

  /// Full resource name used inside commit requests
  fn document_name(&self, key: &DocumentKey) -> String {
    format!("{}/{}/{}", self.database_path(), self.config.collection, key)
  }

  fn endpoint(&self, trailing: &[&str]) -> Result<Url, StoreError> {
    let mut url = Url::parse(&self.config.base_url)
      .map_err(|e| StoreError::Unavailable(format!("invalid base url: {}", e)))?;

    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|_| StoreError::Unavailable("base url cannot hold a path".into()))?;
      segments
        .pop_if_empty()
        .extend(["projects", self.config.project_id.as_str()])
        .extend(["databases", self.config.database.as_str()])
        .extend(trailing);
    }

    url.query_pairs_mut().append_pair("key", &self.config.api_key);
    Ok(url)
  }

  async fn api_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<FirestoreErrorResponse>(&body)
      .map(|parsed| parsed.error.message)
      .unwrap_or(body);
    StoreError::Api { status, message }
  }
}

impl DocumentStore for FirestoreDocumentStore {
  async fn get(&self, key: &DocumentKey) -> Result<Option<ProgressDocument>, StoreError> {
    let url = self.endpoint(&["documents", self.config.collection.as_str(), key.as_str()])?;
    let response = self.client.get(url).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !response.status().is_success() {
      return Err(Self::api_error(response).await);
    }

    let document: FirestoreDocument = response.json().await?;
    document.into_progress().map(Some)
  }

  async fn merge(&self, key: &DocumentKey, patch: &ProgressPatch) -> Result<(), StoreError> {
    let url = self.endpoint(&["documents:commit"])?;
    let (fields, mask) = encode_patch(patch);

    let body = json!({
      "writes": [{
        "update": {
          "name": self.document_name(key),
          "fields": fields,
        },
        "updateMask": { "fieldPaths": mask },
        "updateTransforms": [{
          "fieldPath": FIELD_LAST_UPDATED,
          "setToServerValue": "REQUEST_TIME",
        }],
      }]
    });

    let response = self.client.post(url).json(&body).send().await?;
    if !response.status().is_success() {
      return Err(Self::api_error(response).await);
    }

    Ok(())
  }
}
