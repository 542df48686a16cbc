//! End-to-end pipeline tests over the in-memory vector index with
//! scripted embedding and completion fakes.
//!
//! Search-result ordering is asserted by score only; placement among
//! equal scores is backend-native and deliberately left untested.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use testwright::config::Config;
use testwright::embedding::Embedder;
use testwright::error::PipelineError;
use testwright::ingest::{process_batch, process_file};
use testwright::llm::Completer;
use testwright::models::TestCase;
use testwright::retrieve::{retrieve, INTERFACE_CONTEXT_QUERY};
use testwright::script::generate_script;
use testwright::store::memory::MemoryIndex;
use testwright::store::{IndexedRecord, KnowledgeStore, VectorIndex};
use testwright::testcase::generate_test_cases;

const COLLECTION: &str = "kb_test";

fn test_config() -> Config {
    // The store URI is never contacted; tests run on the in-memory index.
    toml::from_str(
        r#"
[store]
uri = "http://localhost:9"
collection = "kb_test"

[embedding]
provider = "openai"
model = "fake"
dims = 8

[llm]
base_url = "http://localhost:9"
model = "fake"
"#,
    )
    .unwrap()
}

/// Deterministic fake embedder: a byte histogram folded into 8 dims, so
/// overlapping texts land near each other. Records every embedded text.
#[derive(Clone, Default)]
struct FakeEmbedder {
    seen: Arc<Mutex<Vec<String>>>,
}

fn embed_one(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    for b in text.bytes() {
        v[(b as usize) % 8] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| embed_one(t)).collect())
    }

    fn dims(&self) -> usize {
        8
    }
}

/// An embedder that always fails, for the all-or-nothing ingest path.
struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Err(PipelineError::EmbeddingFailure("scripted failure".to_string()))
    }

    fn dims(&self) -> usize {
        8
    }
}

/// Scripted completer: pops canned responses and records every prompt.
#[derive(Clone, Default)]
struct FakeCompleter {
    responses: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeCompleter {
    fn with_response(response: &str) -> Self {
        let fake = Self::default();
        fake.responses
            .lock()
            .unwrap()
            .push_back(response.to_string());
        fake
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Completer for FakeCompleter {
    async fn complete(&self, prompt: &str) -> Result<String, PipelineError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            PipelineError::UpstreamGenerationError("no scripted response".to_string())
        })
    }
}

/// Delegating handle so tests keep a view into the index after the
/// store takes ownership.
struct SharedIndex(Arc<MemoryIndex>);

#[async_trait]
impl VectorIndex for SharedIndex {
    async fn add(
        &self,
        collection: &str,
        records: Vec<IndexedRecord>,
    ) -> Result<usize, PipelineError> {
        self.0.add(collection, records).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<testwright::models::ScoredChunk>, PipelineError> {
        self.0.search(collection, vector, k).await
    }
}

fn make_store(embedder: impl Embedder + 'static) -> (KnowledgeStore, Arc<MemoryIndex>) {
    let index = Arc::new(MemoryIndex::new());
    let store = KnowledgeStore::new(
        Box::new(embedder),
        Box::new(SharedIndex(index.clone())),
        COLLECTION,
        64,
    );
    (store, index)
}

/// Minimal valid PDF containing the text "spec test phrase". Body first,
/// then an xref table with correct byte offsets so the parser accepts it.
fn minimal_pdf_with_phrase() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Length 44 >> stream\nBT /F1 12 Tf 100 700 Td (spec test phrase) Tj ET\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[tokio::test]
async fn ingest_and_retrieve_round_trip() {
    let cfg = test_config();
    let embedder = FakeEmbedder::default();
    let (store, index) = make_store(embedder.clone());

    let body = b"The checkout page applies discount codes at purchase time.";
    let count = process_file(&store, &cfg, "notes.txt", body).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(index.record_count(COLLECTION), 1);

    let context = retrieve(&store, "discount codes", 5).await.unwrap();
    assert!(context.contains("discount codes"));
}

#[tokio::test]
async fn empty_document_returns_zero_without_store_calls() {
    let cfg = test_config();
    let embedder = FakeEmbedder::default();
    let (store, index) = make_store(embedder.clone());

    let count = process_file(&store, &cfg, "empty.txt", b"").await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(index.add_calls.load(Ordering::SeqCst), 0);
    assert!(embedder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_extension_never_reaches_the_store() {
    let cfg = test_config();
    let embedder = FakeEmbedder::default();
    let (store, index) = make_store(embedder.clone());

    let err = process_file(&store, &cfg, "diagram.xyz", b"data")
        .await
        .unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::UnsupportedFormat(ext)) => assert_eq!(ext, "xyz"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
    assert_eq!(index.add_calls.load(Ordering::SeqCst), 0);
    assert_eq!(index.search_calls.load(Ordering::SeqCst), 0);
    assert!(embedder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn embedding_failure_fails_the_whole_file() {
    let cfg = test_config();
    let (store, index) = make_store(FailingEmbedder);

    let body = "paragraph one\n\nparagraph two\n\nparagraph three".repeat(40);
    let err = process_file(&store, &cfg, "doc.txt", body.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::EmbeddingFailure(_))
    ));
    assert_eq!(index.record_count(COLLECTION), 0);
}

#[tokio::test]
async fn batch_reports_per_file_outcomes_in_order() {
    let cfg = Arc::new(test_config());
    let (store, _index) = make_store(FakeEmbedder::default());
    let store = Arc::new(store);

    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.txt");
    let bad = dir.path().join("bad.xyz");
    let empty = dir.path().join("empty.txt");
    std::fs::write(&good, "the login form has a username field").unwrap();
    std::fs::write(&bad, "unknown format").unwrap();
    std::fs::write(&empty, "").unwrap();

    let batch: Vec<(String, Vec<u8>)> = [&good, &bad, &empty]
        .iter()
        .map(|p| {
            (
                p.file_name().unwrap().to_string_lossy().into_owned(),
                std::fs::read(p).unwrap(),
            )
        })
        .collect();

    let outcomes = process_batch(store, cfg, batch).await;
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].filename, "good.txt");
    assert_eq!(outcomes[0].status, "success");
    assert!(outcomes[0].chunks > 0);
    assert_eq!(outcomes[1].status, "error");
    assert!(outcomes[1].message.contains("bad.xyz"));
    assert_eq!(outcomes[2].status, "success");
    assert_eq!(outcomes[2].chunks, 0);
}

#[tokio::test]
async fn test_case_generation_returns_each_record() {
    let cfg = test_config();
    let (store, _index) = make_store(FakeEmbedder::default());
    let doc = b"Discount codes are validated at checkout and expire after 30 days.";
    process_file(&store, &cfg, "spec.txt", doc).await.unwrap();

    let llm = FakeCompleter::with_response(
        r#"```json
[
  {"test_id": "TC_DIS_001", "feature": "discounts", "test_scenario": "apply a valid code",
   "test_type": "positive", "expected_result": "total is reduced", "grounded_in": "spec.txt"},
  {"test_id": "TC_DIS_002", "feature": "discounts", "test_scenario": "apply an expired code",
   "test_type": "negative", "expected_result": "error is shown", "grounded_in": "spec.txt"}
]
```"#,
    );

    let cases = generate_test_cases(&store, &llm, "discount code checkout")
        .await
        .unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].test_id, "TC_DIS_001");

    let prompt = llm.last_prompt();
    assert!(prompt.contains("Discount codes are validated at checkout"));
    assert!(prompt.contains("discount code checkout"));
}

#[tokio::test]
async fn single_object_response_is_wrapped_into_a_list() {
    let cfg = test_config();
    let (store, _index) = make_store(FakeEmbedder::default());
    process_file(&store, &cfg, "spec.txt", b"login requires a password")
        .await
        .unwrap();

    let llm = FakeCompleter::with_response(
        r#"{"test_id": "TC_LOG_001", "feature": "login", "test_type": "positive"}"#,
    );
    let cases = generate_test_cases(&store, &llm, "login").await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].test_id, "TC_LOG_001");
}

#[tokio::test]
async fn malformed_response_surfaces_raw_text_never_an_empty_list() {
    let cfg = test_config();
    let (store, _index) = make_store(FakeEmbedder::default());
    process_file(&store, &cfg, "spec.txt", b"some documentation")
        .await
        .unwrap();

    let raw = "The documentation does not mention that feature.";
    let llm = FakeCompleter::with_response(raw);
    match generate_test_cases(&store, &llm, "teleportation").await {
        Err(PipelineError::GenerationFormatError { raw: kept, .. }) => assert_eq!(kept, raw),
        Ok(cases) => panic!("expected an error, got {} cases", cases.len()),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn script_generation_issues_two_distinct_searches() {
    let cfg = test_config();
    let embedder = FakeEmbedder::default();
    let (store, index) = make_store(embedder.clone());
    let page = b"<html><body><form><input id=\"discount\"><button id=\"apply\">Apply</button></form></body></html>";
    process_file(&store, &cfg, "checkout.html", page)
        .await
        .unwrap();

    let llm = FakeCompleter::with_response(
        "```python\nfrom selenium import webdriver\n\ndriver = webdriver.Chrome()\n```",
    );
    let test_case = TestCase {
        test_id: "TC_DIS_001".to_string(),
        feature: "discounts".to_string(),
        test_scenario: "apply a valid code".to_string(),
        test_type: "positive".to_string(),
        expected_result: "total is reduced".to_string(),
        grounded_in: "checkout.html".to_string(),
    };

    let script = generate_script(&store, &llm, &test_case).await.unwrap();
    assert!(script.starts_with("from selenium import webdriver"));

    assert_eq!(index.search_calls.load(Ordering::SeqCst), 2);
    let seen = embedder.seen.lock().unwrap();
    let queries = &seen[seen.len() - 2..];
    assert_eq!(queries[0], INTERFACE_CONTEXT_QUERY);
    assert!(queries[1].contains("TC_DIS_001"));
    assert_ne!(queries[0], queries[1]);

    // Both context channels reach the prompt, in separate sections.
    let prompt = llm.last_prompt();
    assert!(prompt.contains("Page structure"));
    assert!(prompt.contains("Related documentation"));
    assert!(prompt.contains("TC_DIS_001"));
}

#[tokio::test]
async fn pdf_upload_ingests_page_text() {
    let cfg = test_config();
    let embedder = FakeEmbedder::default();
    let (store, index) = make_store(embedder.clone());

    let pdf = minimal_pdf_with_phrase();
    let count = process_file(&store, &cfg, "spec.pdf", &pdf).await.unwrap();
    assert!(count >= 1);
    assert_eq!(index.record_count(COLLECTION), count);
    assert!(embedder
        .seen
        .lock()
        .unwrap()
        .iter()
        .any(|text| text.contains("spec test phrase")));
}
