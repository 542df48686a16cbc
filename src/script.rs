//! Script generation stage.
//!
//! Turns one selected test case into an executable automation script.
//! Two independent retrievals feed the prompt — page structure and
//! feature documentation — and the model's answer is recovered from a
//! `python`-labeled fence, an unlabeled fence, or the raw text. The
//! script is an opaque artifact: nothing here validates its structure.

use tracing::info;

use crate::error::PipelineError;
use crate::llm::Completer;
use crate::models::TestCase;
use crate::prompts;
use crate::recover;
use crate::retrieve::retrieve_script_context;
use crate::store::KnowledgeStore;

/// Generate an automation script for one test case.
pub async fn generate_script(
    store: &KnowledgeStore,
    llm: &dyn Completer,
    test_case: &TestCase,
) -> Result<String, PipelineError> {
    info!(test_id = %test_case.test_id, "generating script");

    let context = retrieve_script_context(store, test_case).await?;
    let test_case_json = serde_json::to_string_pretty(test_case).unwrap_or_default();
    let prompt = prompts::script_prompt(&test_case_json, &context.html_context, &context.doc_context);

    let raw = llm.complete(&prompt).await?;
    Ok(recover::recover_text(&raw, "python"))
}

#[cfg(test)]
mod tests {
    use crate::recover::recover_text;

    #[test]
    fn python_fence_is_preferred() {
        let raw = "Sure:\n```python\nfrom selenium import webdriver\n```\nDone.";
        assert_eq!(recover_text(raw, "python"), "from selenium import webdriver");
    }

    #[test]
    fn unfenced_script_is_trimmed() {
        let raw = "\nfrom selenium import webdriver\ndriver = webdriver.Chrome()\n";
        assert_eq!(
            recover_text(raw, "python"),
            "from selenium import webdriver\ndriver = webdriver.Chrome()"
        );
    }
}
