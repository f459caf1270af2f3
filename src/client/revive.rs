//! Converts stored JSON back into domain values.
//!
//! The local store keeps dates as ISO-8601 strings; readers get them back
//! as `chrono` values.

use crate::core::Record;
use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

lazy_static! {
    static ref ISO_DATE_TIME: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

pub type DomainRecord = BTreeMap<String, DomainValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainValue {
    Null,
    Bool(bool),
    Number(Number),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Text(String),
    List(Vec<DomainValue>),
    Object(DomainRecord),
}

impl DomainValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DomainValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            DomainValue::DateTime(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DomainValue::Date(date) => Some(*date),
            _ => None,
        }
    }
}

pub fn revive_value(value: Value) -> DomainValue {
    match value {
        Value::Null => DomainValue::Null,
        Value::Bool(flag) => DomainValue::Bool(flag),
        Value::Number(number) => DomainValue::Number(number),
        Value::String(text) => revive_text(text),
        Value::Array(items) => DomainValue::List(items.into_iter().map(revive_value).collect()),
        Value::Object(map) => DomainValue::Object(revive_record(map)),
    }
}

pub fn revive_record(record: Record) -> DomainRecord {
    record
        .into_iter()
        .map(|(key, value)| (key, revive_value(value)))
        .collect()
}

fn revive_text(text: String) -> DomainValue {
    if ISO_DATE_TIME.is_match(&text)
        && let Ok(ts) = DateTime::parse_from_rfc3339(&text)
    {
        return DomainValue::DateTime(ts.with_timezone(&Utc));
    }
    if ISO_DATE.is_match(&text)
        && let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
    {
        return DomainValue::Date(date);
    }
    DomainValue::Text(text)
}
