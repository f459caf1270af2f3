use super::{Result, VaultError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Schema-less record. Only the `id` field is ever interpreted.
pub type Record = Map<String, Value>;

/// Field stamped onto every snapshot entry written through a mutation.
pub const BACKUP_TIMESTAMP_FIELD: &str = "backupTimestamp";

/// Well-known collection names used by the policy domain.
pub mod collections {
    pub const POLICIES: &str = "policies";
    pub const TASKS: &str = "tasks";
    pub const DELETED_POLICIES: &str = "deletedPolicies";
    pub const ASSETS: &str = "assets";
}

lazy_static! {
    static ref COLLECTION_NAME: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Rejects collection names that cannot safely become file names.
pub fn validate_collection(name: &str) -> Result<()> {
    if COLLECTION_NAME.is_match(name) {
        Ok(())
    } else {
        Err(VaultError::validation(format!(
            "invalid collection name '{name}'"
        )))
    }
}

/// Extracts the record id. Numeric ids are rendered as decimal strings.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn require_id(record: &Record) -> Result<String> {
    record_id(record).ok_or_else(|| VaultError::validation("record is missing an 'id' field"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "CREATE"),
            Action::Update => write!(f, "UPDATE"),
            Action::Delete => write!(f, "DELETE"),
        }
    }
}

/// Who performed a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

/// One entry of a monthly activity log. Never modified after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub action: Action,
    pub data: Record,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes_temp_id: Option<String>,
}

/// Metadata for one uploaded binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub collection: String,
    pub record_id: String,
    pub original_name: String,
    pub saved_as: String,
    pub size: u64,
    pub mime_type: String,
    pub path: String,
    pub timestamp: String,
}
