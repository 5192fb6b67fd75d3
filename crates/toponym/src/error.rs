use std::path::PathBuf;

use thiserror::Error;

use crate::index::IndexError;
use crate::search::SearchError;

#[derive(Error, Debug)]
pub enum ToponymError {
    /// The on-disk index is missing, corrupt or was never built.
    #[error("Index unavailable at {}: {reason}", path.display())]
    IndexUnavailable { path: PathBuf, reason: String },
    /// A build was pointed at a directory that holds something other than an index.
    #[error("Refusing to build over {}: it is neither empty nor a gazetteer index", path.display())]
    IndexDirectoryConflict { path: PathBuf },
    /// A query expression the text engine could not parse.
    #[error("Invalid query expression '{query}': {reason}")]
    InvalidQueryExpression { query: String, reason: String },
    /// Any other failure while querying a healthy index.
    #[error("Search execution failure: {0}")]
    SearchExecutionFailure(String),
    /// Reference tables, place dump or override file could not be loaded.
    #[error("Reference data load failure: {0}")]
    ReferenceDataLoadFailure(#[from] toponym_data_processing::DataError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<IndexError> for ToponymError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Unavailable { path, reason } => Self::IndexUnavailable { path, reason },
            IndexError::InvalidQuery { query, source } => Self::InvalidQueryExpression {
                query,
                reason: source.to_string(),
            },
            IndexError::Tantivy(e) => Self::SearchExecutionFailure(e.to_string()),
            IndexError::ForeignDirectory { path } => Self::IndexDirectoryConflict { path },
            IndexError::Io(e) => Self::Io(e),
        }
    }
}

impl From<SearchError> for ToponymError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::IndexError(e) => e.into(),
            SearchError::Overrides(e) => Self::ReferenceDataLoadFailure(e),
            SearchError::Other(e) => Self::Other(e),
        }
    }
}

impl ToponymError {
    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidQueryExpression { .. })
    }
}

pub type Result<T> = std::result::Result<T, ToponymError>;
