//! Remote relational store reached through a PostgREST-style REST API

use std::time::Duration;

use async_trait::async_trait;
use chartnotes_config::RemoteConfig;
use chartnotes_shared::{
    ChartNotesError, ChartNotesResult, ChartSettings, DataPoint, PointDraft, PointPatch,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::backend::Backend;

/// Ask the server to echo affected rows back
const RETURN_REPRESENTATION: &str = "return=representation";

/// Backend over two remote tables: one row per point and a single settings row.
///
/// Ids are assigned by the server. The settings table has no uniqueness
/// constraint, so saving looks the existing row up before choosing between
/// update and insert.
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    points_table: String,
    settings_table: String,
}

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> ChartNotesResult<Self> {
        let url = url::Url::parse(&config.url).map_err(|e| ChartNotesError::Config {
            message: format!("invalid remote url '{}': {e}", config.url),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            points_table: config.points_table.clone(),
            settings_table: config.settings_table.clone(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ChartNotesResult<T> {
        let response = checked(builder.send().await.map_err(transport)?).await?;
        response.json::<T>().await.map_err(transport)
    }

    /// Send a request expecting the affected rows back and return the first one
    async fn first_row<T: DeserializeOwned>(
        builder: RequestBuilder,
    ) -> ChartNotesResult<Option<T>> {
        let rows: Vec<T> = Self::send(builder.header("Prefer", RETURN_REPRESENTATION)).await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_point(&self, id: i64) -> ChartNotesResult<DataPoint> {
        let rows: Vec<DataPoint> = Self::send(
            self.request(Method::GET, &self.points_table)
                .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or(ChartNotesError::NotFound { id })
    }
}

#[async_trait]
impl Backend for RemoteStore {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn get_points(&self) -> ChartNotesResult<Vec<DataPoint>> {
        Self::send(
            self.request(Method::GET, &self.points_table)
                .query(&[("select", "*"), ("order", "created_at.asc")]),
        )
        .await
    }

    async fn create_point(&self, draft: PointDraft) -> ChartNotesResult<DataPoint> {
        let row = json!([{
            "month": draft.month,
            "value": draft.value,
            "note": draft.note,
        }]);
        Self::first_row(self.request(Method::POST, &self.points_table).json(&row))
            .await?
            .ok_or_else(|| ChartNotesError::transport("insert returned no row"))
    }

    async fn update_point(&self, id: i64, patch: PointPatch) -> ChartNotesResult<DataPoint> {
        if patch.is_empty() {
            return self.fetch_point(id).await;
        }
        Self::first_row(
            self.request(Method::PATCH, &self.points_table)
                .query(&[("id", format!("eq.{id}"))])
                .json(&patch_body(&patch)),
        )
        .await?
        .ok_or(ChartNotesError::NotFound { id })
    }

    async fn delete_point(&self, id: i64) -> ChartNotesResult<()> {
        let deleted: Option<IdRow> = Self::first_row(
            self.request(Method::DELETE, &self.points_table)
                .query(&[("select", "id".to_string()), ("id", format!("eq.{id}"))]),
        )
        .await?;
        deleted.map(|_| ()).ok_or(ChartNotesError::NotFound { id })
    }

    async fn clear_all_points(&self) -> ChartNotesResult<()> {
        // PostgREST refuses unfiltered deletes; this filter matches every row,
        // including one whose id is 0
        let builder = self
            .request(Method::DELETE, &self.points_table)
            .query(&[("id", "not.is.null")]);
        checked(builder.send().await.map_err(transport)?).await?;
        Ok(())
    }

    async fn get_settings(&self) -> ChartNotesResult<Option<ChartSettings>> {
        let rows: Vec<Value> = Self::send(
            self.request(Method::GET, &self.settings_table)
                .query(&[("select", "*"), ("limit", "1")]),
        )
        .await?;
        rows.into_iter()
            .next()
            .map(ChartSettings::from_stored)
            .transpose()
    }

    async fn save_settings(&self, settings: ChartSettings) -> ChartNotesResult<ChartSettings> {
        let existing: Vec<IdRow> = Self::send(
            self.request(Method::GET, &self.settings_table)
                .query(&[("select", "id"), ("limit", "1")]),
        )
        .await?;

        let builder = match existing.first() {
            Some(row) => {
                log::debug!("updating settings row {}", row.id);
                self.request(Method::PATCH, &self.settings_table)
                    .query(&[("id", format!("eq.{}", row.id))])
                    .json(&settings)
            }
            None => {
                log::debug!("inserting first settings row");
                self.request(Method::POST, &self.settings_table)
                    .json(&[&settings])
            }
        };

        let saved: Option<Value> = Self::first_row(builder).await?;
        match saved {
            Some(row) => ChartSettings::from_stored(row),
            None => Ok(settings),
        }
    }
}

/// Only the fields present in the patch; an empty note is stored as null
fn patch_body(patch: &PointPatch) -> Value {
    let mut body = Map::new();
    if let Some(month) = &patch.month {
        body.insert("month".into(), json!(month));
    }
    if let Some(value) = patch.value {
        body.insert("value".into(), json!(value));
    }
    if let Some(note) = &patch.note {
        let note = (!note.is_empty()).then_some(note);
        body.insert("note".into(), json!(note));
    }
    Value::Object(body)
}

async fn checked(response: Response) -> ChartNotesResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChartNotesError::transport(format!(
        "remote store answered {status}: {body}"
    )))
}

fn transport(err: reqwest::Error) -> ChartNotesError {
    ChartNotesError::transport(err.to_string())
}
