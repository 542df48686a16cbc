//! Pipeline error taxonomy.
//!
//! Failure classes surfaced by ingestion and generation. Component-local
//! errors are never swallowed into defaults; the one defined non-error
//! outcome is the zero-chunk result for an empty document, which the
//! orchestrator handles before the store is ever touched.

/// Errors produced by the testwright pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The declared file extension is outside the supported set. Raised
    /// before any store I/O; carries the rejected extension.
    UnsupportedFormat(String),
    /// The vector store connection could not be established or the store
    /// refused the request.
    StoreUnavailable(String),
    /// Vectorization failed for one or more texts.
    EmbeddingFailure(String),
    /// Model output could not be recovered into the expected structure.
    /// Carries the full raw output so the caller can render or log it.
    GenerationFormatError { detail: String, raw: String },
    /// The generative-model call itself failed or was rejected.
    UpstreamGenerationError(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::UnsupportedFormat(ext) => {
                write!(f, "unsupported file type: .{}", ext)
            }
            PipelineError::StoreUnavailable(e) => write!(f, "vector store unavailable: {}", e),
            PipelineError::EmbeddingFailure(e) => write!(f, "embedding failed: {}", e),
            PipelineError::GenerationFormatError { detail, raw } => {
                write!(f, "model output failed format recovery ({}): {}", detail, raw)
            }
            PipelineError::UpstreamGenerationError(e) => {
                write!(f, "generation call failed: {}", e)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    /// Short machine-readable code for the HTTP error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat(_) => "unsupported_format",
            PipelineError::StoreUnavailable(_) => "store_unavailable",
            PipelineError::EmbeddingFailure(_) => "embedding_failure",
            PipelineError::GenerationFormatError { .. } => "generation_format_error",
            PipelineError::UpstreamGenerationError(_) => "upstream_generation_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_display_includes_raw_text() {
        let err = PipelineError::GenerationFormatError {
            detail: "expected JSON".to_string(),
            raw: "I could not produce test cases".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("I could not produce test cases"));
    }

    #[test]
    fn unsupported_format_carries_extension() {
        let err = PipelineError::UnsupportedFormat("xyz".to_string());
        assert!(err.to_string().contains(".xyz"));
        assert_eq!(err.code(), "unsupported_format");
    }
}
