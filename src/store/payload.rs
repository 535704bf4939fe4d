//! Payload schema for indexed records
//!
//! The payload layout is persisted in the remote index and must stay stable:
//! `{ text, source_path, title, modification_time, chunk_index }`. It carries
//! enough provenance to identify the producing document and chunk without
//! re-reading the corpus.

use qdrant_client::qdrant::{value::Kind, PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Payload stored with each record in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Chunk text
    pub text: String,

    /// Source path of the owning document (corpus-root relative)
    pub source_path: String,

    /// Document title, empty when the document had none
    #[serde(default)]
    pub title: String,

    /// Document modification time, seconds since the Unix epoch
    pub modification_time: f64,

    /// Chunk ordinal within the document
    pub chunk_index: i64,
}

impl RecordPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(&self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map.insert(
            "source_path".to_string(),
            string_to_qdrant(&self.source_path),
        );
        map.insert("title".to_string(), string_to_qdrant(&self.title));
        map.insert(
            "modification_time".to_string(),
            QdrantValue {
                kind: Some(Kind::DoubleValue(self.modification_time)),
            },
        );
        map.insert(
            "chunk_index".to_string(),
            QdrantValue {
                kind: Some(Kind::IntegerValue(self.chunk_index)),
            },
        );
        map
    }

    /// Rebuild from a Qdrant payload map. Missing or malformed fields fall
    /// back to neutral values so one damaged record cannot poison a scan.
    pub fn from_qdrant_payload(map: HashMap<String, QdrantValue>) -> Self {
        let json: Map<String, Value> = map
            .into_iter()
            .map(|(k, v)| (k, json_from_qdrant_value(v)))
            .collect();
        serde_json::from_value(Value::Object(json)).unwrap_or_else(|_| RecordPayload {
            text: String::new(),
            source_path: String::new(),
            title: String::new(),
            modification_time: 0.0,
            chunk_index: 0,
        })
    }
}

/// The durable unit stored in the remote vector index
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    /// Identifier, equal to the chunk identifier
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: RecordPayload,
}

impl IndexedRecord {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload)
    }
}

/// Canonical similarity search result. The rest of the crate never sees
/// qdrant-client result shapes.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: RecordPayload,
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

/// Convert Qdrant value to serde_json Value
pub(crate) fn json_from_qdrant_value(v: QdrantValue) -> Value {
    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RecordPayload {
        RecordPayload {
            text: "Humanoid robots balance dynamically.".to_string(),
            source_path: "docs/chapter-1.md".to_string(),
            title: "Balance".to_string(),
            modification_time: 1700000000.25,
            chunk_index: 3,
        }
    }

    #[test]
    fn test_payload_round_trips_through_qdrant_map() {
        let original = payload();
        let restored = RecordPayload::from_qdrant_payload(original.to_qdrant_payload());
        assert_eq!(restored, original);
    }

    #[test]
    fn test_payload_map_has_stable_keys() {
        let map = payload().to_qdrant_payload();
        for key in ["text", "source_path", "title", "modification_time", "chunk_index"] {
            assert!(map.contains_key(key), "missing key {key}");
        }
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_damaged_payload_falls_back_to_neutral_values() {
        let restored = RecordPayload::from_qdrant_payload(HashMap::new());
        assert_eq!(restored.source_path, "");
        assert_eq!(restored.modification_time, 0.0);
    }

    #[test]
    fn test_missing_title_defaults_to_empty() {
        let mut map = payload().to_qdrant_payload();
        map.remove("title");
        let restored = RecordPayload::from_qdrant_payload(map);
        assert_eq!(restored.title, "");
        assert_eq!(restored.source_path, "docs/chapter-1.md");
    }

    #[test]
    fn test_provenance_identifies_chunk() {
        let a = payload();
        let mut b = payload();
        b.chunk_index = 4;
        assert_ne!((a.source_path.clone(), a.chunk_index), (b.source_path.clone(), b.chunk_index));
    }
}
