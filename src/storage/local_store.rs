use super::assets::{asset_file_name, with_collision_suffix};
use super::config::{ASSET_LOG_FILE, StoreConfig};
use super::files::{list_dir_names, list_file_names, read_json, write_json_atomic, write_synced};
use super::locks::CollectionLocks;
use super::master::MasterSnapshot;
use super::monthly::{MonthlyActivityLog, MonthlyAssetLog};
use super::stats::StoreStats;
use crate::core::time::{date_key, iso_string, month_key, validate_month_key};
use crate::core::{
    Action, ActivityEvent, Actor, AssetRecord, BACKUP_TIMESTAMP_FIELD, Record, Result, VaultError,
    require_id, validate_collection,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

/// One mutation submitted to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub action: Action,
    pub record: Record,
    pub actor: Actor,
    /// Explicit event time for backdated replays; defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
    /// Set on the reconciliation UPDATE that swaps a temporary id for the
    /// primary store's id.
    pub supersedes_temp_id: Option<String>,
}

impl Mutation {
    pub fn new(action: Action, record: Record, actor: Actor) -> Self {
        Self {
            action,
            record,
            actor,
            timestamp: None,
            supersedes_temp_id: None,
        }
    }

    pub fn create(record: Record, actor: Actor) -> Self {
        Self::new(Action::Create, record, actor)
    }

    pub fn update(record: Record, actor: Actor) -> Self {
        Self::new(Action::Update, record, actor)
    }

    pub fn delete(record: Record, actor: Actor) -> Self {
        Self::new(Action::Delete, record, actor)
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn superseding(mut self, temp_id: impl Into<String>) -> Self {
        self.supersedes_temp_id = Some(temp_id.into());
        self
    }
}

/// Result of a successfully applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReceipt {
    pub id: String,
    pub action: Action,
    pub month: String,
    pub date: String,
    /// Snapshot entries after the mutation
    pub snapshot_len: usize,
}

/// File-backed local store: master snapshots, monthly activity logs and
/// month-partitioned assets.
///
/// A mutation is written to the activity log first and to the snapshot
/// second. The two writes are not atomic together: a failure in between
/// leaves a logged event the snapshot does not reflect yet. Retrying the
/// same mutation repairs the snapshot (every action is idempotent on it)
/// at the cost of a duplicate log event.
#[derive(Debug)]
pub struct LocalStore {
    config: StoreConfig,
    locks: CollectionLocks,
}

impl LocalStore {
    /// Opens the store, creating the directory layout if needed.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        for dir in [&config.master_dir, &config.monthly_dir, &config.assets_dir] {
            fs::create_dir_all(dir).await.map_err(|err| {
                VaultError::IoError(format!("create {}: {}", dir.display(), err))
            })?;
        }
        info!(data_dir = %config.data_dir.display(), "local store opened");
        Ok(Self {
            config,
            locks: CollectionLocks::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn apply_mutation(&self, collection: &str, mutation: Mutation) -> Result<MutationReceipt> {
        validate_collection(collection)?;
        let id = require_id(&mutation.record)?;
        if let Some(temp_id) = &mutation.supersedes_temp_id
            && temp_id.is_empty()
        {
            return Err(VaultError::validation("supersedesTempId must not be empty"));
        }

        let event_ts = mutation.timestamp.unwrap_or_else(Utc::now);
        let month = month_key(&event_ts);
        let date = date_key(&event_ts);

        let _guard = self.locks.acquire(collection).await?;

        let event = ActivityEvent {
            action: mutation.action,
            data: mutation.record.clone(),
            user_id: mutation.actor.user_id.clone(),
            user_name: mutation.actor.user_name.clone(),
            timestamp: iso_string(&event_ts),
            supersedes_temp_id: mutation.supersedes_temp_id.clone(),
        };
        self.append_activity(collection, &month, &date, event).await?;

        let mut snapshot = self.load_snapshot(collection).await?;
        match mutation.action {
            Action::Create | Action::Update => {
                if let Some(temp_id) = mutation.supersedes_temp_id.as_deref()
                    && temp_id != id
                    && snapshot.remove(temp_id).is_none()
                {
                    // upsert by the real id alone
                    warn!(
                        collection,
                        temp_id,
                        id = %id,
                        "reconciliation for unknown temporary id"
                    );
                }
                let mut entry = mutation.record;
                entry.insert(
                    BACKUP_TIMESTAMP_FIELD.to_string(),
                    Value::String(iso_string(&Utc::now())),
                );
                snapshot.upsert(entry);
            }
            Action::Delete => {
                if let Some(temp_id) = mutation.supersedes_temp_id.as_deref() {
                    snapshot.remove(temp_id);
                }
                if snapshot.remove(&id).is_none() {
                    debug!(collection, id = %id, "delete of record absent from snapshot");
                }
            }
        }
        let snapshot_len = snapshot.len();
        self.save_snapshot(collection, snapshot).await?;

        debug!(collection, id = %id, action = %mutation.action, "mutation applied");
        Ok(MutationReceipt {
            id,
            action: mutation.action,
            month,
            date,
            snapshot_len,
        })
    }

    /// Overwrites the collection snapshot with a full record set.
    /// Produces no activity log entry.
    pub async fn replace_snapshot(&self, collection: &str, records: Vec<Record>) -> Result<usize> {
        validate_collection(collection)?;
        let snapshot = MasterSnapshot::from_records(records)?;
        let count = snapshot.len();

        let _guard = self.locks.acquire(collection).await?;
        self.save_snapshot(collection, snapshot).await?;
        info!(collection, count, "snapshot replaced by sync");
        Ok(count)
    }

    /// Current records of a collection; empty if it was never written.
    pub async fn read_snapshot(&self, collection: &str) -> Result<Vec<Record>> {
        validate_collection(collection)?;
        Ok(self.load_snapshot(collection).await?.into_records())
    }

    pub async fn read_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        validate_collection(collection)?;
        let snapshot = self.load_snapshot(collection).await?;
        Ok(snapshot.get(id).cloned())
    }

    /// The activity log of one month; an empty log if nothing was written.
    pub async fn read_monthly_log(&self, collection: &str, month: &str) -> Result<MonthlyActivityLog> {
        validate_collection(collection)?;
        validate_month_key(month)?;
        let path = self.config.monthly_path(month, collection);
        Ok(read_json::<MonthlyActivityLog>(&path)
            .await?
            .unwrap_or_else(|| MonthlyActivityLog::new(month, collection)))
    }

    pub async fn read_asset_log(&self, month: &str) -> Result<MonthlyAssetLog> {
        validate_month_key(month)?;
        Ok(read_json::<MonthlyAssetLog>(&self.config.asset_log_path(month))
            .await?
            .unwrap_or_else(|| MonthlyAssetLog::new(month)))
    }

    /// Writes an uploaded binary under the current month and records it in
    /// that month's asset log.
    pub async fn store_asset(
        &self,
        collection: &str,
        record_id: &str,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
    ) -> Result<AssetRecord> {
        validate_collection(collection)?;
        if record_id.is_empty() {
            return Err(VaultError::validation("asset upload requires a record id"));
        }

        let now = Utc::now();
        let month = month_key(&now);
        let date = date_key(&now);
        let month_dir = self.config.asset_month_dir(&month);

        let _guard = self.locks.acquire(&format!("assets:{month}")).await?;
        fs::create_dir_all(&month_dir)
            .await
            .map_err(|err| VaultError::IoError(format!("create {}: {}", month_dir.display(), err)))?;

        let base_name = asset_file_name(collection, record_id, now.timestamp_millis(), original_name);
        let mut saved_as = base_name.clone();
        let mut attempt = 1;
        while saved_as == ASSET_LOG_FILE || fs::try_exists(month_dir.join(&saved_as)).await? {
            attempt += 1;
            saved_as = with_collision_suffix(&base_name, attempt);
        }

        let path = month_dir.join(&saved_as);
        write_synced(&path, bytes).await?;

        let asset = AssetRecord {
            collection: collection.to_string(),
            record_id: record_id.to_string(),
            original_name: original_name.to_string(),
            saved_as,
            size: bytes.len() as u64,
            mime_type: mime_type.to_string(),
            path: path.display().to_string(),
            timestamp: iso_string(&now),
        };

        let log_path = self.config.asset_log_path(&month);
        let mut log = read_json::<MonthlyAssetLog>(&log_path)
            .await?
            .unwrap_or_else(|| MonthlyAssetLog::new(month.as_str()));
        log.append(&date, asset.clone());
        write_json_atomic(&log_path, &log).await?;

        info!(
            collection,
            record_id,
            file = %asset.saved_as,
            size = asset.size,
            "asset stored"
        );
        Ok(asset)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();

        for name in list_file_names(&self.config.master_dir).await? {
            let Some(collection) = name.strip_suffix(".json") else {
                continue;
            };
            if validate_collection(collection).is_err() {
                continue;
            }
            let count = self.load_snapshot(collection).await?.len();
            stats.per_collection_count.insert(collection.to_string(), count);
        }

        stats.monthly_log_file_names = list_file_names(&self.config.monthly_dir)
            .await?
            .into_iter()
            .filter(|name| name.ends_with(".json"))
            .collect();

        for month in list_dir_names(&self.config.assets_dir).await? {
            let count = list_file_names(&self.config.asset_month_dir(&month))
                .await?
                .iter()
                .filter(|name| name.as_str() != ASSET_LOG_FILE && !name.ends_with(".tmp"))
                .count();
            stats.total_asset_count += count;
            stats.per_month_asset_count.insert(month, count);
        }

        Ok(stats)
    }

    async fn append_activity(
        &self,
        collection: &str,
        month: &str,
        date: &str,
        event: ActivityEvent,
    ) -> Result<()> {
        let path = self.config.monthly_path(month, collection);
        let mut log = read_json::<MonthlyActivityLog>(&path)
            .await?
            .unwrap_or_else(|| MonthlyActivityLog::new(month, collection));
        log.append(date, event);
        write_json_atomic(&path, &log).await
    }

    async fn load_snapshot(&self, collection: &str) -> Result<MasterSnapshot> {
        let records = read_json::<Vec<Record>>(&self.config.master_path(collection))
            .await?
            .unwrap_or_default();
        Ok(MasterSnapshot::from_disk(records))
    }

    async fn save_snapshot(&self, collection: &str, snapshot: MasterSnapshot) -> Result<()> {
        write_json_atomic(&self.config.master_path(collection), &snapshot.into_records()).await
    }
}
