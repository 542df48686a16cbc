//! Context retrieval: similarity search composed into prompt context.
//!
//! One retrieval is one `search` call; chunk texts are joined with a
//! blank line in the store's rank order. Script generation pulls two
//! independent context sets that stay separate all the way into the
//! prompt — how the page is built and what else is known about the
//! feature are distinct evidence channels.

use crate::error::PipelineError;
use crate::models::TestCase;
use crate::store::KnowledgeStore;

/// Fixed query for the interface/markup channel of script generation;
/// biases retrieval toward form controls and page structure.
pub const INTERFACE_CONTEXT_QUERY: &str =
    "HTML structure form inputs buttons page layout element ids and selectors";

/// Chunks retrieved to ground a test-case generation call.
pub const TEST_CASE_CONTEXT_K: usize = 5;
/// Chunks retrieved per channel for script generation.
pub const SCRIPT_CONTEXT_K: usize = 3;

/// Retrieve up to `k` chunks for `query` and join their texts.
pub async fn retrieve(
    store: &KnowledgeStore,
    query: &str,
    k: usize,
) -> Result<String, PipelineError> {
    let results = store.search(query, k).await?;
    Ok(results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

/// The two context channels for script generation.
pub struct ScriptContext {
    pub html_context: String,
    pub doc_context: String,
}

/// Run the two independent retrievals for a script-generation call: a
/// fixed structural query, and a query keyed on the serialized test
/// case itself.
pub async fn retrieve_script_context(
    store: &KnowledgeStore,
    test_case: &TestCase,
) -> Result<ScriptContext, PipelineError> {
    let html_context = retrieve(store, INTERFACE_CONTEXT_QUERY, SCRIPT_CONTEXT_K).await?;
    let serialized = serde_json::to_string(test_case).unwrap_or_default();
    let doc_context = retrieve(store, &serialized, SCRIPT_CONTEXT_K).await?;
    Ok(ScriptContext {
        html_context,
        doc_context,
    })
}
