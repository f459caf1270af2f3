//! Master snapshot: the current materialized state of one collection.
//!
//! The snapshot is an ordered array holding at most one record per `id`.
//! It is rewritten in full on every mutation.

use crate::core::{Record, Result, record_id, require_id};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterSnapshot {
    records: Vec<Record>,
}

impl MasterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from a full record set. Every record needs an id;
    /// later duplicates replace earlier ones in place.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut snapshot = Self::new();
        for record in records {
            require_id(&record)?;
            snapshot.upsert(record);
        }
        Ok(snapshot)
    }

    /// Loads a snapshot read from disk without rejecting foreign entries.
    ///
    /// Files written by other tools may hold duplicates; the last one wins.
    pub fn from_disk(records: Vec<Record>) -> Self {
        let mut snapshot = Self::new();
        for record in records {
            if record_id(&record).is_some() {
                snapshot.upsert(record);
            } else {
                snapshot.records.push(record);
            }
        }
        snapshot
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record_id(record).as_deref() == Some(id))
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.position(id).map(|idx| &self.records[idx])
    }

    /// Replaces the entry with the same id, or appends.
    /// Returns `true` if an existing entry was replaced.
    pub fn upsert(&mut self, record: Record) -> bool {
        let Some(id) = record_id(&record) else {
            self.records.push(record);
            return false;
        };
        match self.position(&id) {
            Some(idx) => {
                self.records[idx] = record;
                true
            }
            None => {
                self.records.push(record);
                false
            }
        }
    }

    /// Removes the entry with `id`, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        self.position(id).map(|idx| self.records.remove(idx))
    }

    /// Returns `true` if every id appears at most once.
    pub fn ids_are_unique(&self) -> bool {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter_map(record_id)
            .all(|id| seen.insert(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut snapshot = MasterSnapshot::new();
        assert!(!snapshot.upsert(record(json!({"id": "a", "v": 1}))));
        assert!(!snapshot.upsert(record(json!({"id": "b", "v": 1}))));
        assert!(snapshot.upsert(record(json!({"id": "a", "v": 2}))));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records()[0]["v"], 2);
        assert_eq!(snapshot.position("b"), Some(1));
    }

    #[test]
    fn remove_missing_id_is_noop() {
        let mut snapshot = MasterSnapshot::from_records(vec![record(json!({"id": "a"}))]).unwrap();
        assert!(snapshot.remove("zzz").is_none());
        assert!(snapshot.remove("a").is_some());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn from_records_requires_ids_and_collapses_duplicates() {
        let err = MasterSnapshot::from_records(vec![record(json!({"name": "no id"}))]);
        assert!(err.is_err());

        let snapshot = MasterSnapshot::from_records(vec![
            record(json!({"id": "a", "v": 1})),
            record(json!({"id": "b"})),
            record(json!({"id": "a", "v": 3})),
        ])
        .unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("a").unwrap()["v"], 3);
        assert!(snapshot.ids_are_unique());
    }
}
