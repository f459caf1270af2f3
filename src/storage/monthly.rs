//! Month-partitioned, date-bucketed logs.
//!
//! Both logs are only ever appended to: an append reads the month file,
//! pushes onto the date bucket and rewrites it. The running total always
//! equals the sum of the bucket lengths.

use crate::core::{ActivityEvent, AssetRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `data/monthly/<YYYY-MM>_<collection>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivityLog {
    pub month: String,
    pub collection: String,
    pub total_entries: usize,
    pub entries_by_date: BTreeMap<String, Vec<ActivityEvent>>,
}

impl MonthlyActivityLog {
    pub fn new(month: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            collection: collection.into(),
            total_entries: 0,
            entries_by_date: BTreeMap::new(),
        }
    }

    pub fn append(&mut self, date: &str, event: ActivityEvent) {
        self.entries_by_date
            .entry(date.to_string())
            .or_default()
            .push(event);
        self.total_entries = self.counted_entries();
    }

    pub fn counted_entries(&self) -> usize {
        self.entries_by_date.values().map(Vec::len).sum()
    }

    pub fn events(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.entries_by_date.values().flatten()
    }
}

/// `data/assets/<YYYY-MM>/asset_log.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAssetLog {
    pub month: String,
    pub total_files: usize,
    pub files_by_date: BTreeMap<String, Vec<AssetRecord>>,
}

impl MonthlyAssetLog {
    pub fn new(month: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            total_files: 0,
            files_by_date: BTreeMap::new(),
        }
    }

    pub fn append(&mut self, date: &str, asset: AssetRecord) {
        self.files_by_date
            .entry(date.to_string())
            .or_default()
            .push(asset);
        self.total_files = self.files_by_date.values().map(Vec::len).sum();
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetRecord> {
        self.files_by_date.values().flatten()
    }
}
