//! Persisted chunk record (§3 Data Model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single embedded chunk, as stored on disk and returned from search.
///
/// `metadata` is a passthrough `serde_json::Value` so callers can stash
/// arbitrary fields (source path, page number, tags...) without the crate
/// needing to know about them; round-tripping through `load`/`save` never
/// drops unknown keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

fn default_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ChunkRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>, metadata: Value) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// A scored result returned from a search operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub metadata: Value,
}

impl SearchResult {
    pub fn from_record(record: &ChunkRecord, score: f32) -> Self {
        Self {
            id: record.id.clone(),
            content: record.content.clone(),
            score,
            metadata: record.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_preserving_unknown_metadata_fields() {
        let record = ChunkRecord::new(
            "id-1",
            "hello world",
            vec![0.1, 0.2, 0.3],
            serde_json::json!({"source": "a.txt", "custom_field": 42}),
        );
        let text = serde_json::to_string(&record).unwrap();
        let back: ChunkRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.metadata["custom_field"], 42);
        assert_eq!(back.embedding, record.embedding);
    }

    #[test]
    fn missing_metadata_defaults_to_empty_object() {
        let text = r#"{"id":"x","content":"c","embedding":[1.0],"created_at":"2024-01-01T00:00:00Z"}"#;
        let record: ChunkRecord = serde_json::from_str(text).unwrap();
        assert_eq!(record.metadata, serde_json::json!({}));
    }
}
