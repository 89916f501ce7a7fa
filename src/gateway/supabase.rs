use crate::config::SupabaseConfig;
use crate::error::{BookingError, Result};
use crate::storage::{Database, Filter};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument};

/// [`Database`] backed by a Supabase project's PostgREST API.
///
/// Authenticates with the service role key, so row-level policies do not apply;
/// only run this server-side.
pub struct SupabaseDatabase {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl SupabaseDatabase {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.service_role_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    /// Calls a Postgres function exposed under `/rest/v1/rpc/<name>`
    #[instrument(skip(self, args))]
    pub async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let resp = self.request(Method::POST, &url).json(&args).send().await?;
        read_json(resp).await
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_query_param).collect()
}

async fn read_json(resp: Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(BookingError::Backend { status: status.as_u16(), message: body });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

async fn read_rows(resp: Response) -> Result<Vec<Value>> {
    match read_json(resp).await? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

#[async_trait]
impl Database for SupabaseDatabase {
    #[instrument(skip(self, filters))]
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(filters));
        let resp = self
            .request(Method::GET, &self.table_url(table))
            .query(&params)
            .send()
            .await?;
        let rows = read_rows(resp).await?;
        debug!("select {} -> {} rows", table, rows.len());
        Ok(rows)
    }

    #[instrument(skip(self, rows))]
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let resp = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;
        read_rows(resp).await
    }

    #[instrument(skip(self, filters, patch))]
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        if filters.is_empty() {
            // PostgREST refuses unfiltered updates; surface it before the round trip
            return Err(BookingError::Validation(format!("refusing to update every row of '{}'", table)));
        }
        let resp = self
            .request(Method::PATCH, &self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&filter_params(filters))
            .json(&patch)
            .send()
            .await?;
        read_rows(resp).await
    }
}
