//! Fixed instruction templates for the two generation stages.
//!
//! Templates are plain `format!` parameterization. The test-case
//! template demands a strict JSON array; the script template demands a
//! single runnable Python Selenium script. Output recovery in
//! [`crate::recover`] handles the fences models add anyway.

/// Template for the test-case generation stage, parameterized by the
/// retrieved context and the operator's feature query.
pub fn test_case_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a senior QA engineer. Derive test cases for the requested feature using ONLY the project documentation below as ground truth. Do not invent behavior the documentation does not describe.

Project documentation:
{context}

Request: {question}

Return a JSON array of test cases. Each element must contain exactly these fields:
- "test_id": short unique identifier such as "TC_DIS_001"
- "feature": the feature under test
- "test_scenario": one sentence describing the scenario
- "test_type": "positive", "negative", or "edge"
- "expected_result": the observable outcome
- "grounded_in": the source document the case is based on

Respond with the JSON array only, no commentary."#
    )
}

/// Template for the script generation stage, parameterized by the
/// serialized test case and the two retrieved context channels.
pub fn script_prompt(test_case_json: &str, html_context: &str, doc_context: &str) -> String {
    format!(
        r#"You are a QA automation engineer. Write a Python Selenium script that executes the test case below against the described page.

Test case:
{test_case_json}

Page structure (how the page is built):
{html_context}

Related documentation (what else is known about this feature):
{doc_context}

Requirements:
- Use selenium webdriver with explicit waits, no bare sleeps.
- Locate elements by the ids, names, and selectors shown in the page structure.
- Assert the expected result at the end of the script.
- Output one complete runnable Python script and nothing else."#
    )
}
