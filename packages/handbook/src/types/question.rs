//! User question records and mined popular questions.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An archived, sanitized user question.
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuestionRecord {
    pub text: String,
    pub embedding: Vec<f32>,
    pub province: String,
    pub company: String,
    pub created_at: DateTime<Utc>,
}

impl UserQuestionRecord {
    /// Metadata stored with the question vector. `created_at` is unix
    /// seconds so range filters work on it.
    pub fn to_record_metadata(&self, namespace: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("text".into(), Value::String(self.text.clone()));
        map.insert("province".into(), Value::String(self.province.clone()));
        map.insert("company".into(), Value::String(self.company.clone()));
        map.insert("namespace".into(), Value::String(namespace.to_string()));
        map.insert("created_at".into(), Value::from(unix_seconds(self.created_at)));
        map
    }

    /// Rebuild from a stored vector. Missing group fields read as empty.
    pub fn from_record(values: Vec<f32>, metadata: &Map<String, Value>) -> Option<Self> {
        let text = metadata.get("text")?.as_str()?.to_string();
        let field = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let created_at = metadata
            .get("created_at")
            .and_then(Value::as_f64)
            .and_then(from_unix_seconds)
            .unwrap_or_default();

        Some(Self {
            text,
            embedding: values,
            province: field("province"),
            company: field("company"),
            created_at,
        })
    }
}

/// One representative question for a (province, company) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularQuestion {
    pub province: String,
    pub company: String,
    pub text: String,
}

pub fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt((secs * 1000.0).round() as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let created_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let record = UserQuestionRecord {
            text: "How much vacation pay am I owed?".into(),
            embedding: vec![0.1, 0.2],
            province: "Ontario".into(),
            company: String::new(),
            created_at,
        };

        let meta = record.to_record_metadata("UserQuestions");
        assert_eq!(meta["namespace"], "UserQuestions");
        assert_eq!(meta["created_at"].as_f64(), Some(created_at.timestamp() as f64));

        let back = UserQuestionRecord::from_record(vec![0.1, 0.2], &meta).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_without_text_is_skipped() {
        let meta = Map::new();
        assert!(UserQuestionRecord::from_record(vec![], &meta).is_none());
    }
}
