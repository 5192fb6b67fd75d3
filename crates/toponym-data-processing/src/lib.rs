//! Reference-data side of the Toponym gazetteer.
//!
//! Reads the GeoNames tab-separated dumps (country table, first- and
//! second-level admin division tables, place dump) into typed lookup
//! structures and assembles [`PlaceRecord`]s with their ancestor chain
//! resolved against those lookups.
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod model;
pub mod processed;
pub mod raw;
pub mod test_data;

pub const DATA_DIR_DEFAULT: &str = "./toponym_data";

/// Global data directory.
///
/// `DATA_DIR` wins when set. Otherwise the platform data directory is used
/// with the `system-dirs` feature, falling back to [`DATA_DIR_DEFAULT`].
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var("DATA_DIR") {
        return PathBuf::from(dir);
    }
    #[cfg(feature = "system-dirs")]
    {
        if let Some(dirs) = directories::ProjectDirs::from("com", "SamBroomy", "toponym") {
            let dir = dirs.data_dir().to_path_buf();
            debug!(dir = ?dir, "Using platform data directory");
            return dir;
        }
    }
    debug!(dir = DATA_DIR_DEFAULT, "Using default data directory");
    PathBuf::from(DATA_DIR_DEFAULT)
});

pub fn get_data_dir() -> &'static Path {
    DATA_DIR.as_path()
}

mod error {
    use polars::prelude::PolarsError;
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[cfg(feature = "download_data")]
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[cfg(feature = "download_data")]
        #[error("Join error: {0}")]
        JoinError(#[from] tokio::task::JoinError),
        #[cfg(feature = "download_data")]
        #[error("Zip error: {0}")]
        ZipError(#[from] zip::result::ZipError),
        #[error("Required data file not found: {}", .0.display())]
        RequiredFileNotFound(PathBuf),
        #[error("Missing value for column '{column}' in {file}")]
        MissingValue {
            file: &'static str,
            column: &'static str,
        },
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};

pub use model::{AdminDivision, Continent, Country, FeatureType, PlaceRecord, RecordError};
pub use processed::{PlaceLoad, ReferenceTables, load_place_records};
pub use raw::{PlaceSource, RawDataPaths, get_raw_data};
pub use test_data::{TestData, create_test_data};
