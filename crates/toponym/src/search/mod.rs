//! Query resolution and ranked execution.
//!
//! [`QueryResolver`] turns a raw location string into an ordered list of
//! query expressions; [`RankedSearch`] runs them against the index and
//! orders candidates by population.

pub use error::SearchError;
mod overrides;
mod ranked;
mod resolver;

use error::Result;
pub use overrides::OverrideMap;
pub use ranked::{RankedSearch, SearchOutcome, UNKNOWN_TOTAL};
pub use resolver::{QueryPolicy, QueryResolver, SENTINEL_EXPRESSION};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Index error: {0}")]
        IndexError(#[from] crate::index::IndexError),
        #[error("Override file error: {0}")]
        Overrides(#[from] toponym_data_processing::DataError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, SearchError>;
}
