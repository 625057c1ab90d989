use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file kind: {0}")]
    UnsupportedKind(String),

    #[error("OCR produced no text for any page of {0}")]
    OcrExtractionFailed(String),

    #[error("no text extracted from {0}")]
    EmptyExtraction(String),

    #[error("{tool} failed: {details}")]
    ExternalTool { tool: String, details: String },

    #[error("vector store write failed: {0}")]
    StoreWrite(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl IngestError {
    pub fn external(tool: impl Into<String>, details: impl Into<String>) -> Self {
        IngestError::ExternalTool {
            tool: tool.into(),
            details: details.into(),
        }
    }

    /// Unsupported inputs are skipped rather than reported as failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, IngestError::UnsupportedKind(_))
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("query is empty")]
    EmptyQuery,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_converts_to_regex_variant() {
        let error: IngestError = regex::Regex::new("(unclosed")
            .expect_err("pattern is invalid")
            .into();
        assert!(matches!(error, IngestError::Regex(_)));
        assert!(!error.is_skip());
    }
}
