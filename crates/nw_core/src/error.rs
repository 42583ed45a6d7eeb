use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{url} answered with status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{url} returned no usable HTML")]
    UnparseableBody { url: String },

    #[error("{url} unavailable after {attempts} attempts")]
    FetchUnavailable { url: String, attempts: u32 },

    #[error("Skipped candidate: {0}")]
    ExtractionSkip(String),

    #[error("Extractor {name} failed: {message}")]
    Extractor { name: String, message: String },

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Errors scoped to a single candidate or row. Callers skip the item and keep going.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Error::ExtractionSkip(_) | Error::InvalidRecord(_) | Error::InvalidUrl(_)
        )
    }

    pub fn extractor(name: impl Into<String>, message: impl ToString) -> Self {
        Error::Extractor {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_level_classification() {
        assert!(Error::ExtractionSkip("no href".into()).is_record_level());
        assert!(Error::InvalidRecord("empty title".into()).is_record_level());
        assert!(!Error::Storage("disk gone".into()).is_record_level());
        assert!(!Error::Cancelled.is_record_level());
    }

    #[test]
    fn test_extractor_message() {
        let err = Error::extractor("Variety", "boom");
        assert_eq!(err.to_string(), "Extractor Variety failed: boom");
    }
}
