//! Core data models used throughout testwright.
//!
//! These types represent the normalized text units, chunks, and test-case
//! records that flow through the ingestion and generation pipeline.

use serde::{Deserialize, Serialize};

/// A plain-text unit produced by the normalizer, tagged with the file it
/// came from. The filename travels with every downstream chunk so that
/// generated test cases can cite their grounding document.
#[derive(Debug, Clone)]
pub struct NormalizedUnit {
    pub text: String,
    pub source: String,
}

impl NormalizedUnit {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

/// A bounded segment of normalized text, the unit of embedding and retrieval.
///
/// `hash` is a SHA-256 of the chunk text, stored with the indexed record
/// as a content fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub hash: String,
}

/// A chunk returned from similarity search, with its similarity score.
///
/// Results are ordered by descending score; ordering among equal scores
/// is backend-native and not guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// A structured test case produced by the test-case generation stage.
///
/// Field names match what the model is instructed to emit. The model
/// output is not schema-enforced, so every field defaults to empty on the
/// wire; `test_id` and `grounded_in` additionally accept non-string JSON
/// values (models occasionally emit numbers or arrays there) and render
/// them through their JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, deserialize_with = "lenient_string")]
    pub test_id: String,
    #[serde(default)]
    pub feature: String,
    #[serde(default)]
    pub test_scenario: String,
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub grounded_in: String,
}

/// Accept any JSON value and render non-strings via their compact JSON form.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
