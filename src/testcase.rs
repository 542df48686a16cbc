//! Test-case generation stage.
//!
//! Retrieves grounding context for the operator's feature query, asks
//! the model for a JSON array of test cases, and recovers the structure
//! from whatever the model actually returned. Callers always receive a
//! sequence — a single bare record is wrapped — and a recovery failure
//! carries the raw model output, never an empty list.

use tracing::info;

use crate::error::PipelineError;
use crate::llm::Completer;
use crate::models::TestCase;
use crate::prompts;
use crate::recover;
use crate::retrieve::{retrieve, TEST_CASE_CONTEXT_K};
use crate::store::KnowledgeStore;

/// Generate test cases for a natural-language feature query.
pub async fn generate_test_cases(
    store: &KnowledgeStore,
    llm: &dyn Completer,
    query: &str,
) -> Result<Vec<TestCase>, PipelineError> {
    info!(query, "generating test cases");

    let context = retrieve(store, query, TEST_CASE_CONTEXT_K).await?;
    let prompt = prompts::test_case_prompt(&context, query);
    let raw = llm.complete(&prompt).await?;

    let cases = parse_test_cases(&raw)?;
    info!(count = cases.len(), "test cases generated");
    Ok(cases)
}

/// Recover a list of test cases from raw model output.
fn parse_test_cases(raw: &str) -> Result<Vec<TestCase>, PipelineError> {
    let value = recover::recover_json(raw)?;

    let records = match value {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        other => {
            return Err(PipelineError::GenerationFormatError {
                detail: format!("expected a JSON array or object, got {}", json_kind(&other)),
                raw: raw.to_string(),
            })
        }
    };

    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(record).map_err(|e| PipelineError::GenerationFormatError {
                detail: e.to_string(),
                raw: raw.to_string(),
            })
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
