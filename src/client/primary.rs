//! The primary (cloud) store seen from the durability layer: an opaque
//! boundary that either succeeds or fails.

use crate::core::{Record, Result, VaultError, record_id};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Stores a new record and returns the id the store assigned.
    async fn create(&self, collection: &str, record: &Record) -> Result<String>;
    async fn update(&self, collection: &str, id: &str, record: &Record) -> Result<()>;
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
    async fn get_all(&self, collection: &str, user_id: Option<&str>) -> Result<Vec<Record>>;
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>>;
}

/// In-process primary store with switchable availability and latency.
///
/// Stands in for the hosted database in tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryPrimaryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    next_id: AtomicU64,
}

impl MemoryPrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or_default()
    }

    async fn gate(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::PrimaryStore("primary store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for MemoryPrimaryStore {
    async fn create(&self, collection: &str, record: &Record) -> Result<String> {
        self.gate().await?;
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut stored = record.clone();
        stored.insert("id".to_string(), Value::String(id.clone()));
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(stored);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, record: &Record) -> Result<()> {
        self.gate().await?;
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        let mut stored = record.clone();
        stored.insert("id".to_string(), Value::String(id.to_string()));
        match records
            .iter_mut()
            .find(|existing| record_id(existing).as_deref() == Some(id))
        {
            Some(existing) => *existing = stored,
            None => return Err(VaultError::not_found(collection, id)),
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.gate().await?;
        let mut collections = self.collections.write().await;
        if let Some(records) = collections.get_mut(collection) {
            records.retain(|existing| record_id(existing).as_deref() != Some(id));
        }
        Ok(())
    }

    async fn get_all(&self, collection: &str, user_id: Option<&str>) -> Result<Vec<Record>> {
        self.gate().await?;
        let collections = self.collections.read().await;
        let records = collections.get(collection).cloned().unwrap_or_default();
        Ok(match user_id {
            Some(user_id) => records
                .into_iter()
                .filter(|record| record.get("userId").and_then(Value::as_str) == Some(user_id))
                .collect(),
            None => records,
        })
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        self.gate().await?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|records| {
            records
                .iter()
                .find(|record| record_id(record).as_deref() == Some(id))
                .cloned()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn assigns_ids_and_honours_availability() {
        let store = MemoryPrimaryStore::new();
        let id = store
            .create("policies", &record(json!({"holder": "Asha"})))
            .await
            .unwrap();
        assert_eq!(id, "doc-1");
        assert_eq!(store.get_by_id("policies", &id).await.unwrap().unwrap()["holder"], "Asha");

        store.set_available(false);
        assert!(store.get_all("policies", None).await.is_err());
        store.set_available(true);
        assert_eq!(store.get_all("policies", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails() {
        let store = MemoryPrimaryStore::new();
        let err = store
            .update("policies", "missing", &record(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound { .. }));
    }
}
