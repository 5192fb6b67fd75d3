//! Toponym - gazetteer resolution for free-text place references
//!
//! Toponym turns strings such as `"Springfield, Illinois, USA"` into the best
//! matching `GeoNames` entry. Places are flattened together with their
//! ancestor chain (county, state, country, continent) into documents of a
//! Tantivy index; queries are decomposed into field-qualified expressions
//! and candidates are ranked by population.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use toponym::{Gazetteer, OverrideMap, SearchConfig};
//! use toponym::data_processing::{PlaceSource, get_raw_data};
//!
//! // Build the index once ("create" mode)
//! let raw = get_raw_data(PlaceSource::Cities15000)?;
//! let index_dir = toponym::default_index_dir();
//! let report = Gazetteer::create_from_raw(&raw, &index_dir)?;
//! println!("Indexed {} of {} places", report.indexed, report.attempted);
//!
//! // Then query it ("serve" mode)
//! let gazetteer = Gazetteer::open(&index_dir, OverrideMap::default(), SearchConfig::default())?;
//! let outcome = gazetteer.search_location("Springfield, Illinois, USA")?;
//! if let Some(best) = outcome.records.first() {
//!     println!("Best match: {}", best["Name"]);
//! }
//! # Ok::<(), toponym::error::ToponymError>(())
//! ```
//!
//! Comma-separated parts are read smallest to largest: the first part is the
//! place name, every later part must occur among its ancestors.
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod document;
pub mod error;
mod gazetteer;
mod index;
mod search;
pub mod server;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{DocumentBatch, DocumentBuilder, IndexedDocument};
pub use gazetteer::{BUILD_INFO_FILE, BuildReport, Gazetteer};
pub use index::{
    FieldMap, GazetteerIndex, IndexError, IndexStore, IndexWriteHandle, QueryHits, ReadSnapshot,
    SortBy, fields,
};
pub use search::{
    OverrideMap, QueryPolicy, QueryResolver, RankedSearch, SENTINEL_EXPRESSION, SearchError,
    SearchOutcome, UNKNOWN_TOTAL,
};
pub use toponym_data_processing as data_processing;
pub use toponym_data_processing::{
    AdminDivision, Continent, Country, FeatureType, PlaceRecord, ReferenceTables,
};

/// Where the index lives unless told otherwise: `<DATA_DIR>/tantivy_indexes/gazetteer`.
pub fn default_index_dir() -> PathBuf {
    data_processing::get_data_dir()
        .join("tantivy_indexes")
        .join("gazetteer")
}

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for Toponym.
///
/// Installs a `tracing` fmt subscriber filtered by `RUST_LOG` when set, or by
/// `level` otherwise. Only the first call has any effect.
///
/// # Examples
///
/// ```rust
/// use toponym::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), toponym::error::ToponymError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::ToponymError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?)
            .add_directive("hyper_util=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
