//! Client-side access to the backup gateway.

use crate::core::{Record, Result, VaultError};
use crate::gateway::error::ErrorResponse;
use crate::gateway::models::{
    AssetUploadResponse, BackupRequest, HealthResponse, MessageResponse, SyncRequest,
};
use crate::gateway::query::filter_by_user;
use crate::storage::{LocalStore, StoreStats};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait BackupGateway: Send + Sync {
    async fn backup(&self, collection: &str, request: BackupRequest) -> Result<()>;
    async fn sync(&self, collection: &str, records: Vec<Record>) -> Result<()>;
    async fn read_all(&self, collection: &str, user_id: Option<&str>) -> Result<Vec<Record>>;
    async fn read_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>>;
}

/// Talks to a [`LocalStore`] in the same process.
#[derive(Debug, Clone)]
pub struct LocalBackupGateway {
    store: Arc<LocalStore>,
}

impl LocalBackupGateway {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BackupGateway for LocalBackupGateway {
    async fn backup(&self, collection: &str, request: BackupRequest) -> Result<()> {
        let mutation = request.into_mutation()?;
        self.store.apply_mutation(collection, mutation).await?;
        Ok(())
    }

    async fn sync(&self, collection: &str, records: Vec<Record>) -> Result<()> {
        self.store.replace_snapshot(collection, records).await?;
        Ok(())
    }

    async fn read_all(&self, collection: &str, user_id: Option<&str>) -> Result<Vec<Record>> {
        let records = self.store.read_snapshot(collection).await?;
        Ok(match user_id {
            Some(user_id) if !user_id.is_empty() => filter_by_user(records, user_id),
            _ => records,
        })
    }

    async fn read_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        self.store.read_by_id(collection, id).await
    }
}

/// Talks to a backup gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackupGateway {
    base_url: Url,
    client: Client,
}

impl HttpBackupGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| VaultError::validation(format!("invalid gateway url '{base_url}': {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(VaultError::validation(format!(
                "gateway url '{base_url}' cannot be a base"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| VaultError::Gateway(err.to_string()))?;
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VaultError::Gateway(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(self.endpoint(&["health"])?)
            .send()
            .await
            .map_err(transport_error)?;
        parse_json(response).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let response = self
            .client
            .get(self.endpoint(&["backup", "stats"])?)
            .send()
            .await
            .map_err(transport_error)?;
        parse_json(response).await
    }

    pub async fn upload_asset(
        &self,
        collection: &str,
        record_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<AssetUploadResponse> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|err| VaultError::validation(format!("invalid mime type: {err}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint(&["backup", "asset", collection, record_id])?)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        parse_json(response).await
    }
}

#[async_trait]
impl BackupGateway for HttpBackupGateway {
    async fn backup(&self, collection: &str, request: BackupRequest) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&["backup", collection])?)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        parse_json::<MessageResponse>(response).await?;
        Ok(())
    }

    async fn sync(&self, collection: &str, records: Vec<Record>) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&["backup", "sync", collection])?)
            .json(&SyncRequest { data: records })
            .send()
            .await
            .map_err(transport_error)?;
        parse_json::<MessageResponse>(response).await?;
        Ok(())
    }

    async fn read_all(&self, collection: &str, user_id: Option<&str>) -> Result<Vec<Record>> {
        let mut request = self
            .client
            .get(self.endpoint(&["backup", "read", collection])?);
        if let Some(user_id) = user_id {
            request = request.query(&[("userId", user_id)]);
        }
        let response = request.send().await.map_err(transport_error)?;
        parse_json(response).await
    }

    async fn read_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let response = self
            .client
            .get(self.endpoint(&["backup", "read", collection, id])?)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        parse_json(response).await.map(Some)
    }
}

fn transport_error(err: reqwest::Error) -> VaultError {
    VaultError::Gateway(err.to_string())
}

/// Decodes a success body, or turns the `{success: false, error}` envelope
/// into a [`VaultError::Gateway`].
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| VaultError::Gateway(format!("decode gateway response: {err}")));
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(VaultError::Gateway(format!("{status}: {message}")))
}
