//! Local-first writes with temporary-id reconciliation.
//!
//! Every write goes to the backup gateway and the primary store at the same
//! time. The caller only hears back once both have finished, so a reported
//! success always means the local copy was at least attempted.
//!
//! A create moves through two states: `Created(tempId)` when the local
//! CREATE lands, `Confirmed(realId)` once the primary store answers and the
//! reconciliation UPDATE (carrying `supersedesTempId`) has been sent. There
//! is no rollback. A primary failure leaves the write in `Created(tempId)`
//! and the writer remembers it in memory so it can be retried. A failed
//! reconciliation UPDATE is remembered too, together with the real id, so
//! the local copy can still be re-keyed later.

use super::gateway::BackupGateway;
use super::primary::PrimaryStore;
use super::temp_id::{generate_temp_id, is_temp_id};
use crate::core::{Action, Actor, Record, Result, VaultError};
use crate::gateway::models::BackupRequest;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Upper bound on one primary-store call. An elapsed timeout counts as
    /// a primary failure; the local write stays.
    pub primary_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            primary_timeout: Duration::from_secs(10),
        }
    }
}

impl WriterConfig {
    pub fn primary_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout = timeout;
        self
    }
}

/// What happened to the local copy of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalBackup {
    /// The gateway stored the record under the id reported in the outcome.
    Durable,
    /// The gateway holds the record under its temporary id only; the
    /// reconciliation UPDATE failed and is pending.
    Unreconciled(String),
    /// The gateway submission failed. No local durability for this write.
    Failed(String),
}

impl LocalBackup {
    pub fn is_durable(&self) -> bool {
        matches!(self, LocalBackup::Durable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The primary store accepted the write.
    Confirmed {
        id: String,
        record: Record,
        local: LocalBackup,
    },
    /// Saved locally, not yet in the primary store. `id` is the temporary
    /// id for creates. Retry with [`ReconcilingWriter::retry`].
    PartialFailure {
        id: String,
        record: Record,
        local: LocalBackup,
        primary_error: String,
    },
}

impl WriteOutcome {
    pub fn id(&self) -> &str {
        match self {
            WriteOutcome::Confirmed { id, .. } | WriteOutcome::PartialFailure { id, .. } => id,
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            WriteOutcome::Confirmed { record, .. } | WriteOutcome::PartialFailure { record, .. } => {
                record
            }
        }
    }

    pub fn local(&self) -> &LocalBackup {
        match self {
            WriteOutcome::Confirmed { local, .. } | WriteOutcome::PartialFailure { local, .. } => {
                local
            }
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, WriteOutcome::Confirmed { .. })
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, WriteOutcome::PartialFailure { .. })
    }
}

/// A write not yet fully settled: either the primary store has not
/// accepted it, or the local copy still waits for its reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub collection: String,
    pub action: Action,
    /// Temporary id for creates, the record id otherwise
    pub id: String,
    pub record: Record,
    pub actor: Actor,
    pub attempts: u32,
    /// Id assigned by the primary store to a create whose local copy is
    /// still keyed by the temporary `id`.
    pub confirmed_id: Option<String>,
}

impl PendingWrite {
    pub fn awaits_reconciliation(&self) -> bool {
        self.confirmed_id.is_some()
    }
}

type PendingKey = (String, String);

pub struct ReconcilingWriter {
    gateway: Arc<dyn BackupGateway>,
    primary: Arc<dyn PrimaryStore>,
    config: WriterConfig,
    pending: Mutex<HashMap<PendingKey, PendingWrite>>,
}

impl ReconcilingWriter {
    pub fn new(gateway: Arc<dyn BackupGateway>, primary: Arc<dyn PrimaryStore>) -> Self {
        Self::with_config(gateway, primary, WriterConfig::default())
    }

    pub fn with_config(
        gateway: Arc<dyn BackupGateway>,
        primary: Arc<dyn PrimaryStore>,
        config: WriterConfig,
    ) -> Self {
        Self {
            gateway,
            primary,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a record under a fresh temporary id and reconciles it with
    /// the id the primary store assigns.
    pub async fn create(&self, collection: &str, record: Record, actor: &Actor) -> Result<WriteOutcome> {
        let temp_id = generate_temp_id();
        self.drive_create(collection, &temp_id, record, actor, Action::Create, 1)
            .await
    }

    /// Updates a record. Updating a record that still carries a temporary
    /// id re-attempts its create instead. If the local copy still waits for
    /// reconciliation, the update re-keys it.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        record: Record,
        actor: &Actor,
    ) -> Result<WriteOutcome> {
        if let Some((temp_id, real_id)) = self.unreconciled(collection, id)? {
            return self
                .write_known(collection, Action::Update, &real_id, record, actor, Some(&temp_id))
                .await;
        }

        if is_temp_id(id) {
            let attempts = self.pending_attempts(collection, id)? + 1;
            return self
                .drive_create(collection, id, record, actor, Action::Update, attempts)
                .await;
        }

        self.write_known(collection, Action::Update, id, record, actor, None)
            .await
    }

    /// Deletes a record. A record that only ever existed under a temporary
    /// id is removed locally and never sent to the primary store.
    pub async fn delete(&self, collection: &str, id: &str, actor: &Actor) -> Result<WriteOutcome> {
        if let Some((temp_id, real_id)) = self.unreconciled(collection, id)? {
            return self
                .write_known(collection, Action::Delete, &real_id, Record::new(), actor, Some(&temp_id))
                .await;
        }

        if is_temp_id(id) {
            let local_record = with_id(Record::new(), id);
            let request = BackupRequest::new(Action::Delete, local_record.clone(), actor);
            self.pending
                .lock()?
                .remove(&(collection.to_string(), id.to_string()));
            let local = self.submit_local(collection, request).await;
            if let Err(err) = &local {
                warn!(collection, id, error = %err, "local delete of unconfirmed record failed");
            }
            return Ok(WriteOutcome::Confirmed {
                id: id.to_string(),
                record: local_record,
                local: local_status(local),
            });
        }

        self.write_known(collection, Action::Delete, id, Record::new(), actor, None)
            .await
    }

    /// Re-drives a pending write. `id` is the id the write is pending
    /// under, or the primary id of a create awaiting reconciliation.
    ///
    /// The local copy is not re-submitted, except for the reconciliation
    /// UPDATE of a create.
    pub async fn retry(&self, collection: &str, id: &str) -> Result<WriteOutcome> {
        let pending = self
            .take_pending(collection, id)?
            .ok_or_else(|| VaultError::not_found(collection, id))?;
        let attempts = pending.attempts + 1;

        match (pending.action, pending.confirmed_id) {
            (Action::Create, Some(real_id)) => {
                self.reconcile_local(
                    collection,
                    &pending.id,
                    real_id,
                    pending.record,
                    &pending.actor,
                    Ok(()),
                    attempts,
                )
                .await
            }
            (Action::Create, None) => {
                let primary = self
                    .call_primary(self.primary.create(collection, &without_id(&pending.record)))
                    .await;
                self.finish_create(
                    collection,
                    &pending.id,
                    pending.record,
                    &pending.actor,
                    Ok(()),
                    primary,
                    attempts,
                )
                .await
            }
            (Action::Update, _) => {
                let primary = self
                    .call_primary(self.primary.update(collection, &pending.id, &pending.record))
                    .await;
                self.settle(
                    collection,
                    Action::Update,
                    &pending.id,
                    pending.record,
                    &pending.actor,
                    Ok(()),
                    primary,
                    attempts,
                )
            }
            (Action::Delete, _) => {
                let primary = self
                    .call_primary(self.primary.delete(collection, &pending.id))
                    .await;
                self.settle(
                    collection,
                    Action::Delete,
                    &pending.id,
                    pending.record,
                    &pending.actor,
                    Ok(()),
                    primary,
                    attempts,
                )
            }
        }
    }

    /// Retries every pending write once, concurrently.
    pub async fn retry_all(&self) -> Vec<Result<WriteOutcome>> {
        let keys: Vec<PendingKey> = match self.pending.lock() {
            Ok(pending) => pending.keys().cloned().collect(),
            Err(err) => return vec![Err(err.into())],
        };

        join_all(keys.iter().map(|(collection, id)| self.retry(collection, id))).await
    }

    /// Writes not yet settled in both stores.
    pub fn pending(&self) -> Result<Vec<PendingWrite>> {
        let pending = self.pending.lock()?;
        let mut writes: Vec<PendingWrite> = pending.values().cloned().collect();
        writes.sort_by(|a, b| (&a.collection, &a.id).cmp(&(&b.collection, &b.id)));
        Ok(writes)
    }

    async fn drive_create(
        &self,
        collection: &str,
        temp_id: &str,
        record: Record,
        actor: &Actor,
        local_action: Action,
        attempts: u32,
    ) -> Result<WriteOutcome> {
        let local_record = with_id(record, temp_id);
        let request = BackupRequest::new(local_action, local_record.clone(), actor);
        let primary_record = without_id(&local_record);

        let (local, primary) = tokio::join!(
            self.submit_local(collection, request),
            self.call_primary(self.primary.create(collection, &primary_record)),
        );
        self.finish_create(collection, temp_id, local_record, actor, local, primary, attempts)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_create(
        &self,
        collection: &str,
        temp_id: &str,
        local_record: Record,
        actor: &Actor,
        local: Result<()>,
        primary: Result<String>,
        attempts: u32,
    ) -> Result<WriteOutcome> {
        match primary {
            Ok(real_id) => {
                let confirmed = with_id(local_record, &real_id);
                self.reconcile_local(collection, temp_id, real_id, confirmed, actor, local, attempts)
                    .await
            }
            Err(primary_err) => self.settle(
                collection,
                Action::Create,
                temp_id,
                local_record,
                actor,
                local,
                Err(primary_err),
                attempts,
            ),
        }
    }

    /// Sends the reconciliation UPDATE for a create the primary store has
    /// confirmed. On failure the temp/real id pair stays pending.
    #[allow(clippy::too_many_arguments)]
    async fn reconcile_local(
        &self,
        collection: &str,
        temp_id: &str,
        real_id: String,
        confirmed: Record,
        actor: &Actor,
        local_created: Result<()>,
        attempts: u32,
    ) -> Result<WriteOutcome> {
        let key = (collection.to_string(), temp_id.to_string());
        let reconcile =
            BackupRequest::new(Action::Update, confirmed.clone(), actor).superseding(temp_id);

        let local = match self.submit_local(collection, reconcile).await {
            Ok(()) => {
                self.pending.lock()?.remove(&key);
                LocalBackup::Durable
            }
            Err(err) => {
                warn!(
                    collection,
                    temp_id,
                    real_id = %real_id,
                    attempts,
                    error = %err,
                    "reconciliation update failed; local copy still keyed by temporary id"
                );
                self.pending.lock()?.insert(
                    key,
                    PendingWrite {
                        collection: collection.to_string(),
                        action: Action::Create,
                        id: temp_id.to_string(),
                        record: confirmed.clone(),
                        actor: actor.clone(),
                        attempts,
                        confirmed_id: Some(real_id.clone()),
                    },
                );
                match local_created {
                    Ok(()) => LocalBackup::Unreconciled(err.to_string()),
                    Err(first) => LocalBackup::Failed(first.to_string()),
                }
            }
        };

        info!(collection, temp_id, real_id = %real_id, "write confirmed by primary store");
        Ok(WriteOutcome::Confirmed {
            id: real_id,
            record: confirmed,
            local,
        })
    }

    /// UPDATE or DELETE of a record the primary store already knows.
    /// `supersedes` re-keys a local copy still held under a temporary id.
    async fn write_known(
        &self,
        collection: &str,
        action: Action,
        id: &str,
        record: Record,
        actor: &Actor,
        supersedes: Option<&str>,
    ) -> Result<WriteOutcome> {
        let local_record = with_id(record, id);
        let mut request = BackupRequest::new(action, local_record.clone(), actor);
        if let Some(temp_id) = supersedes {
            request = request.superseding(temp_id);
        }

        let (local, primary) = match action {
            Action::Delete => tokio::join!(
                self.submit_local(collection, request),
                self.call_primary(self.primary.delete(collection, id)),
            ),
            Action::Create | Action::Update => tokio::join!(
                self.submit_local(collection, request),
                self.call_primary(self.primary.update(collection, id, &local_record)),
            ),
        };

        if let Some(temp_id) = supersedes
            && local.is_ok()
        {
            self.pending
                .lock()?
                .remove(&(collection.to_string(), temp_id.to_string()));
        }

        self.settle(collection, action, id, local_record, actor, local, primary, 1)
    }

    /// Turns the local and primary results of a non-create step into an
    /// outcome and updates the pending map.
    #[allow(clippy::too_many_arguments)]
    fn settle(
        &self,
        collection: &str,
        action: Action,
        id: &str,
        record: Record,
        actor: &Actor,
        local: Result<()>,
        primary: Result<()>,
        attempts: u32,
    ) -> Result<WriteOutcome> {
        let key = (collection.to_string(), id.to_string());
        match primary {
            Ok(()) => {
                self.pending.lock()?.remove(&key);
                if let Err(err) = &local {
                    warn!(collection, id, error = %err, "primary write succeeded without a local backup");
                }
                Ok(WriteOutcome::Confirmed {
                    id: id.to_string(),
                    record,
                    local: local_status(local),
                })
            }
            Err(primary_err) => {
                if let Err(local_err) = local {
                    error!(
                        collection,
                        id,
                        action = %action,
                        primary_error = %primary_err,
                        local_error = %local_err,
                        "write lost: primary store and local backup both failed"
                    );
                    return Err(primary_err);
                }

                warn!(
                    collection,
                    id,
                    action = %action,
                    attempts,
                    error = %primary_err,
                    "saved locally only; primary store write failed"
                );
                self.pending.lock()?.insert(
                    key,
                    PendingWrite {
                        collection: collection.to_string(),
                        action,
                        id: id.to_string(),
                        record: record.clone(),
                        actor: actor.clone(),
                        attempts,
                        confirmed_id: None,
                    },
                );
                Ok(WriteOutcome::PartialFailure {
                    id: id.to_string(),
                    record,
                    local: LocalBackup::Durable,
                    primary_error: primary_err.to_string(),
                })
            }
        }
    }

    async fn submit_local(&self, collection: &str, request: BackupRequest) -> Result<()> {
        let result = self.gateway.backup(collection, request).await;
        if let Err(err) = &result {
            warn!(collection, error = %err, "local backup submission failed");
        }
        result
    }

    async fn call_primary<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout(self.config.primary_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(VaultError::PrimaryStore(format!(
                "timed out after {} ms",
                self.config.primary_timeout.as_millis()
            ))),
        }
    }

    fn pending_attempts(&self, collection: &str, id: &str) -> Result<u32> {
        Ok(self
            .pending
            .lock()?
            .get(&(collection.to_string(), id.to_string()))
            .map(|write| write.attempts)
            .unwrap_or_default())
    }

    /// Temporary and primary id of a confirmed create whose local copy is
    /// still keyed by the temporary id. `id` may be either of the two.
    fn unreconciled(&self, collection: &str, id: &str) -> Result<Option<(String, String)>> {
        let pending = self.pending.lock()?;
        Ok(pending.values().find_map(|write| {
            let real_id = write.confirmed_id.as_deref()?;
            (write.collection == collection && (write.id == id || real_id == id))
                .then(|| (write.id.clone(), real_id.to_string()))
        }))
    }

    /// Removes the pending write keyed by `id`, or the create awaiting
    /// reconciliation under primary id `id`.
    fn take_pending(&self, collection: &str, id: &str) -> Result<Option<PendingWrite>> {
        let mut pending = self.pending.lock()?;
        let key = (collection.to_string(), id.to_string());
        if let Some(write) = pending.remove(&key) {
            return Ok(Some(write));
        }
        let key = pending
            .iter()
            .find(|(_, write)| {
                write.collection == collection && write.confirmed_id.as_deref() == Some(id)
            })
            .map(|(key, _)| key.clone());
        Ok(key.and_then(|key| pending.remove(&key)))
    }
}

fn local_status(local: Result<()>) -> LocalBackup {
    match local {
        Ok(()) => LocalBackup::Durable,
        Err(err) => LocalBackup::Failed(err.to_string()),
    }
}

fn with_id(mut record: Record, id: &str) -> Record {
    record.insert("id".to_string(), Value::String(id.to_string()));
    record
}

fn without_id(record: &Record) -> Record {
    let mut record = record.clone();
    record.remove("id");
    record
}
