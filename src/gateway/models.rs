//! Request and response bodies of the backup gateway.
//!
//! The same types are used by [`crate::client::HttpBackupGateway`] on the
//! other side of the wire.

use crate::core::time::resolve_timestamp;
use crate::core::{Action, Actor, AssetRecord, Record, Result};
use crate::storage::Mutation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /backup/:collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    pub action: Action,
    pub data: Record,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes_temp_id: Option<String>,
}

impl BackupRequest {
    pub fn new(action: Action, data: Record, actor: &Actor) -> Self {
        Self {
            action,
            data,
            user_id: actor.user_id.clone(),
            user_name: actor.user_name.clone(),
            timestamp: None,
            supersedes_temp_id: None,
        }
    }

    pub fn superseding(mut self, temp_id: impl Into<String>) -> Self {
        self.supersedes_temp_id = Some(temp_id.into());
        self
    }

    pub fn into_mutation(self) -> Result<Mutation> {
        let timestamp = self
            .timestamp
            .as_deref()
            .map(|raw| resolve_timestamp(Some(raw)))
            .transpose()?;

        Ok(Mutation {
            action: self.action,
            record: self.data,
            actor: Actor::new(self.user_id, self.user_name),
            timestamp,
            supersedes_temp_id: self.supersedes_temp_id,
        })
    }
}

/// Body of `POST /backup/sync/:collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub data: Vec<Record>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Body of `POST /backup/query/:collection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub filters: Map<String, Value>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Query string of `GET /backup/read/:collection`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUploadResponse {
    pub success: bool,
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsUploadResponse {
    pub success: bool,
    pub count: usize,
    pub files: Vec<AssetRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
