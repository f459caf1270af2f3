use super::models::{QueryRequest, SortOrder};
use crate::core::Record;
use serde_json::Value;
use std::cmp::Ordering;

/// Keeps records whose `userId` equals `user_id`.
pub fn filter_by_user(records: Vec<Record>, user_id: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| match record.get("userId") {
            Some(Value::String(owner)) => owner == user_id,
            Some(Value::Number(owner)) => owner.to_string() == user_id,
            _ => false,
        })
        .collect()
}

/// Exact-match filtering on every filter key, then a stable sort.
pub fn apply_query(records: Vec<Record>, query: &QueryRequest) -> Vec<Record> {
    let mut matched: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            query
                .filters
                .iter()
                .all(|(key, expected)| record.get(key) == Some(expected))
        })
        .collect();

    if let Some(sort_by) = query.sort_by.as_deref() {
        matched.sort_by(|a, b| {
            let ordering = compare_json(a.get(sort_by), b.get(sort_by));
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }

    matched
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Missing/null < bool < number < string < array < object.
/// Values of the same kind compare naturally; arrays and objects tie.
pub fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Value) -> Vec<Record> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn filters_by_exact_match_on_all_keys() {
        let data = records(json!([
            {"id": "a", "status": "active", "type": "auto"},
            {"id": "b", "status": "active", "type": "home"},
            {"id": "c", "status": "lapsed", "type": "auto"}
        ]));
        let query: QueryRequest = serde_json::from_value(json!({
            "filters": {"status": "active", "type": "auto"}
        }))
        .unwrap();
        assert_eq!(ids(&apply_query(data, &query)), vec!["a"]);
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let data = records(json!([
            {"id": "a", "premium": 300},
            {"id": "b", "premium": 100},
            {"id": "c", "premium": 300},
            {"id": "d"}
        ]));
        let asc: QueryRequest =
            serde_json::from_value(json!({"sortBy": "premium"})).unwrap();
        assert_eq!(ids(&apply_query(data.clone(), &asc)), vec!["d", "b", "a", "c"]);

        let desc: QueryRequest =
            serde_json::from_value(json!({"sortBy": "premium", "sortOrder": "desc"})).unwrap();
        assert_eq!(ids(&apply_query(data, &desc)), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn user_filter_matches_string_and_numeric_owners() {
        let data = records(json!([
            {"id": "a", "userId": "u1"},
            {"id": "b", "userId": 7},
            {"id": "c"}
        ]));
        assert_eq!(ids(&filter_by_user(data.clone(), "u1")), vec!["a"]);
        assert_eq!(ids(&filter_by_user(data, "7")), vec!["b"]);
    }
}
