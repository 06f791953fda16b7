// HTTP archive backend - query execution and catalog over a JSON endpoint
use crate::application::archive_repository::{ArchiveBackend, SignalCatalog};
use crate::domain::descriptor::{SignalDescriptor, SignalName};
use crate::domain::partition::PartitionWindow;
use crate::domain::sample::RawRow;
use crate::error::{ArchiveError, BackendError};
use crate::infrastructure::config::ArchiveSettings;
use async_trait::async_trait;
use serde::Deserialize;

/// Archive backend speaking the HTTP/JSON query protocol: one `GET /query`
/// per partition window, token auth, rows in the response body. Transport
/// failures are unrecoverable; an in-band query error is recoverable (the
/// endpoint answered, this partition is bad).
#[derive(Debug, Clone)]
pub struct HttpArchiveBackend {
    host: String,
    token: String,
    database: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignalRow {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    format: String,
    access: String,
}

impl HttpArchiveBackend {
    pub fn new(host: String, token: String, database: String) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &ArchiveSettings) -> Self {
        Self::new(
            settings.host.clone(),
            settings.token.clone(),
            settings.database.clone(),
        )
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!("{}/query?db={}&q={}", self.host, self.database, encoded_query)
    }

    async fn execute_query(&self, query: &str) -> Result<QueryResponse, BackendError> {
        let url = self.build_query_url(query);
        tracing::debug!("executing archive query: {}", query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                BackendError::unrecoverable(format!("failed to reach archive backend: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::recoverable(format!(
                "archive query failed with status {status}: {body}"
            )));
        }

        let data = response.json::<QueryResponse>().await.map_err(|e| {
            BackendError::recoverable(format!("failed to parse archive response: {e}"))
        })?;

        if let Some(error) = &data.error {
            return Err(BackendError::recoverable(format!(
                "archive query error: {error}"
            )));
        }

        Ok(data)
    }

    async fn string_rows(&self, query: &str) -> Result<Vec<String>, ArchiveError> {
        let response = self.execute_query(query).await?;
        Ok(response
            .rows
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl ArchiveBackend for HttpArchiveBackend {
    async fn execute_window(
        &self,
        descriptor: &SignalDescriptor,
        window: &PartitionWindow,
    ) -> Result<Vec<RawRow>, BackendError> {
        // Whole-partition windows skip the time-bound predicate.
        let query = if window.is_full {
            format!(
                "SELECT * FROM samples WHERE sig_id = '{}' AND part = '{}' ORDER BY data_time",
                descriptor.id, window.partition_key
            )
        } else {
            format!(
                "SELECT * FROM samples WHERE sig_id = '{}' AND part = '{}' \
                 AND data_time >= {} AND data_time < {} ORDER BY data_time",
                descriptor.id, window.partition_key, window.start, window.end
            )
        };

        let response = self.execute_query(&query).await?;
        response
            .rows
            .into_iter()
            .map(|row| {
                serde_json::from_value::<RawRow>(row).map_err(|e| {
                    BackendError::recoverable(format!("malformed archive row: {e}"))
                })
            })
            .collect()
    }
}

#[async_trait]
impl SignalCatalog for HttpArchiveBackend {
    async fn resolve(&self, name: &str) -> Result<SignalDescriptor, ArchiveError> {
        SignalName::parse(name)?;

        let query = format!("SHOW SIGNAL WHERE name = '{name}'");
        let response = self.execute_query(&query).await?;
        let row = response
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| ArchiveError::NotFound(name.to_string()))?;
        let signal: SignalRow = serde_json::from_value(row)
            .map_err(|e| ArchiveError::Decode(format!("malformed signal row: {e}")))?;

        Ok(SignalDescriptor::new(
            signal.id,
            name,
            signal.kind.parse()?,
            signal.format.parse()?,
            signal.access.parse()?,
        ))
    }

    async fn attributes(&self) -> Result<Vec<String>, ArchiveError> {
        self.string_rows("SHOW ATTRIBUTES").await
    }

    async fn hosts(&self) -> Result<Vec<String>, ArchiveError> {
        self.string_rows("SHOW HOSTS").await
    }

    async fn domains(&self, host: &str) -> Result<Vec<String>, ArchiveError> {
        self.string_rows(&format!("SHOW DOMAINS WHERE host = '{host}'"))
            .await
    }

    async fn families(&self, host: &str, domain: &str) -> Result<Vec<String>, ArchiveError> {
        self.string_rows(&format!(
            "SHOW FAMILIES WHERE host = '{host}' AND domain = '{domain}'"
        ))
        .await
    }

    async fn members(
        &self,
        host: &str,
        domain: &str,
        family: &str,
    ) -> Result<Vec<String>, ArchiveError> {
        self.string_rows(&format!(
            "SHOW MEMBERS WHERE host = '{host}' AND domain = '{domain}' AND family = '{family}'"
        ))
        .await
    }

    async fn names(
        &self,
        host: &str,
        domain: &str,
        family: &str,
        member: &str,
    ) -> Result<Vec<String>, ArchiveError> {
        self.string_rows(&format!(
            "SHOW NAMES WHERE host = '{host}' AND domain = '{domain}' \
             AND family = '{family}' AND member = '{member}'"
        ))
        .await
    }
}
