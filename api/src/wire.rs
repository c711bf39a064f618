//! Serde helpers for the tournament API's loosely typed documents.
//!
//! The server is a document store fronted by hand-written handlers, so the
//! same field can arrive as a number, a numeric string, `null`, or not at all.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::PlayoffRound;

/// Pull a collection out of a `{ "<key>": [...] }` envelope.
///
/// A bare array is accepted as-is. When `key` is missing the first array
/// valued field is used instead. Anything else yields an empty list.
/// Elements that fail to decode are skipped with a warning.
pub fn extract_collection<T: DeserializeOwned>(body: Value, key: &str) -> Vec<T> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => map
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("skipping malformed {key} entry: {e}");
                None
            }
        })
        .collect()
}

/// Server error bodies look like `{ "message": "..." }`.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_owned)
        .filter(|m| !m.trim().is_empty())
}

/// `null` reads as the type's default.
pub(crate) fn de_null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Score fields: a non-negative integer, a numeric string, or nothing.
pub(crate) fn de_lenient_score<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Free text that is occasionally sent as a number.
pub(crate) fn de_stringish<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

pub(crate) fn de_playoff_round<'de, D>(d: D) -> Result<Option<PlayoffRound>, D::Error>
where
    D: Deserializer<'de>,
{
    // a number or object label is unknown, not a broken match
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => PlayoffRound::from_label(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Match, Team};
    use serde_json::json;

    #[test]
    fn non_string_playoff_round_keeps_the_match() {
        let body = json!({ "matches": [
            {"_id": "m1", "isPlayoff": true, "playoffRound": 3},
            {"_id": "m2", "isPlayoff": true, "playoffRound": {"name": "final"}},
            {"_id": "m3", "isPlayoff": true, "playoffRound": "ub-qf-9"},
        ]});
        let matches: Vec<Match> = extract_collection(body, "matches");
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
        assert!(matches.iter().all(|m| m.playoff_round.is_none()));
    }

    #[test]
    fn envelope_prefers_named_key() {
        let body = json!({ "other": [{"_id": "x"}], "teams": [{"_id": "a"}, {"_id": "b"}] });
        let teams: Vec<Team> = extract_collection(body, "teams");
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].id, "a");
    }

    #[test]
    fn envelope_falls_back_to_first_array() {
        let body = json!({ "count": 1, "data": [{"_id": "only"}] });
        let teams: Vec<Team> = extract_collection(body, "teams");
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, "only");
    }

    #[test]
    fn envelope_accepts_bare_array_and_rejects_scalars() {
        let teams: Vec<Team> = extract_collection(json!([{"_id": "a"}]), "teams");
        assert_eq!(teams.len(), 1);
        let none: Vec<Team> = extract_collection(json!("nope"), "teams");
        assert!(none.is_empty());
        let none: Vec<Team> = extract_collection(json!({"count": 0}), "teams");
        assert!(none.is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let body = json!({ "teams": [{"_id": "a"}, 42, {"_id": "b"}] });
        let teams: Vec<Team> = extract_collection(body, "teams");
        assert_eq!(teams.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn error_message_reads_message_field() {
        assert_eq!(error_message(r#"{"message":"Team exists"}"#).as_deref(), Some("Team exists"));
        assert_eq!(error_message(r#"{"message":""}"#), None);
        assert_eq!(error_message("<html>502</html>"), None);
    }
}
