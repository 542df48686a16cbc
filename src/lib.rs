//! # testwright
//!
//! A retrieval-augmented pipeline that turns project documentation into
//! QA test cases and executable browser-automation scripts.
//!
//! Uploaded artifacts (specs, markup, docs) are normalized, chunked,
//! embedded, and indexed in a vector store. A natural-language feature
//! query then retrieves grounding context and drives two generation
//! stages: structured test-case synthesis, and per-case Selenium script
//! synthesis.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │  Upload  │──▶│   Pipeline     │──▶│ Vector store │
//! │ pdf/md/… │   │ Normalize+Chunk│   │ (collection) │
//! └──────────┘   │   +Embed       │   └──────┬──────┘
//!                └───────────────┘          │ search
//!                                           ▼
//!                  feature query ──▶ ┌──────────────┐   ┌────────────┐
//!                                    │  Test cases  │──▶│   Script   │
//!                                    │  (LLM, k=5)  │   │ (LLM, 2×k=3)│
//!                                    └──────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! twx ingest docs/spec.md pages/checkout.html   # build the knowledge base
//! twx cases "discount code checkout"            # generate test cases
//! twx script tc_dis_001.json                    # generate a script
//! twx serve                                     # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`normalize`] | Format-dispatched text extraction |
//! | [`chunk`] | Hierarchical chunking with overlap |
//! | [`embedding`] | Embedding capability providers |
//! | [`store`] | Knowledge store adapter and vector index backends |
//! | [`ingest`] | Per-file and batch ingestion orchestration |
//! | [`retrieve`] | Similarity search composed into prompt context |
//! | [`llm`] | Generative-model capability |
//! | [`prompts`] | Fixed instruction templates |
//! | [`recover`] | Fence-stripping output recovery |
//! | [`testcase`] | Test-case generation stage |
//! | [`script`] | Script generation stage |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod recover;
pub mod retrieve;
pub mod script;
pub mod server;
pub mod store;
pub mod testcase;
