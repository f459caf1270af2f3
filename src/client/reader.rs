use super::gateway::BackupGateway;
use super::primary::PrimaryStore;
use super::revive::{DomainRecord, revive_record};
use crate::core::{Record, Result};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Treat an empty primary answer as a miss and consult the local copy.
    pub fallback_on_empty: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fallback_on_empty: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Primary,
    Local,
}

/// A read result together with the store that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRead<T> {
    pub source: ReadSource,
    pub value: T,
}

impl<T> FallbackRead<T> {
    fn primary(value: T) -> Self {
        Self {
            source: ReadSource::Primary,
            value,
        }
    }

    fn local(value: T) -> Self {
        Self {
            source: ReadSource::Local,
            value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FallbackRead<U> {
        FallbackRead {
            source: self.source,
            value: f(self.value),
        }
    }
}

/// Reads from the primary store, or from the local backup when the primary
/// fails or comes back empty. Results are never merged.
pub struct FallbackReader {
    primary: Arc<dyn PrimaryStore>,
    gateway: Arc<dyn BackupGateway>,
    config: ReaderConfig,
}

impl FallbackReader {
    pub fn new(primary: Arc<dyn PrimaryStore>, gateway: Arc<dyn BackupGateway>) -> Self {
        Self::with_config(primary, gateway, ReaderConfig::default())
    }

    pub fn with_config(
        primary: Arc<dyn PrimaryStore>,
        gateway: Arc<dyn BackupGateway>,
        config: ReaderConfig,
    ) -> Self {
        Self {
            primary,
            gateway,
            config,
        }
    }

    pub async fn get_all(
        &self,
        collection: &str,
        user_id: Option<&str>,
    ) -> Result<FallbackRead<Vec<DomainRecord>>> {
        Ok(self
            .get_all_records(collection, user_id)
            .await?
            .map(|records| records.into_iter().map(revive_record).collect()))
    }

    pub async fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<FallbackRead<Option<DomainRecord>>> {
        Ok(self
            .get_record(collection, id)
            .await?
            .map(|record| record.map(revive_record)))
    }

    /// Same as [`get_all`](Self::get_all) without date revival.
    pub async fn get_all_records(
        &self,
        collection: &str,
        user_id: Option<&str>,
    ) -> Result<FallbackRead<Vec<Record>>> {
        match self.primary.get_all(collection, user_id).await {
            Ok(records) if !records.is_empty() || !self.config.fallback_on_empty => {
                return Ok(FallbackRead::primary(records));
            }
            Ok(_) => debug!(collection, "primary store returned nothing; reading local backup"),
            Err(err) => warn!(collection, error = %err, "primary read failed; reading local backup"),
        }

        let records = self.gateway.read_all(collection, user_id).await?;
        Ok(FallbackRead::local(records))
    }

    /// Same as [`get_by_id`](Self::get_by_id) without date revival.
    pub async fn get_record(&self, collection: &str, id: &str) -> Result<FallbackRead<Option<Record>>> {
        match self.primary.get_by_id(collection, id).await {
            Ok(Some(record)) => return Ok(FallbackRead::primary(Some(record))),
            Ok(None) if !self.config.fallback_on_empty => return Ok(FallbackRead::primary(None)),
            Ok(None) => debug!(collection, id, "record missing in primary store; reading local backup"),
            Err(err) => warn!(collection, id, error = %err, "primary read failed; reading local backup"),
        }

        let record = self.gateway.read_by_id(collection, id).await?;
        Ok(FallbackRead::local(record))
    }
}
